//! # vxsym-core
//!
//! Symbol and kernel object recovery for VxWorks firmware images.
//!
//! Firmware blobs carry no section headers or debug information. What they
//! do carry is a linked symbol table and a handful of kernel structures at
//! offsets that depend on the VxWorks major version. This crate finds and
//! walks those and annotates an [`AddressSpace`] with what it learns:
//! functions, labels, typed records and plate comments.
//!
//! ## Layout
//!
//! - [`layout`]: per-version record layouts
//! - [`space`]: the [`AddressSpace`] trait the walkers work against
//! - [`image`]: an in-memory [`AddressSpace`] over a raw firmware file
//! - [`symbols`]: symbol table validation, walking, naming and demangling
//! - [`kernel`]: net pool, cluster pool and task control block walkers
//! - [`config`]: per-run settings
//!
//! ## Example
//!
//! ```rust
//! use vxsym_core::{AnalysisConfig, FirmwareImage, VxVersion, fix_tcb};
//! use vxsym_core::types::{Address, Endian};
//!
//! let image_bytes = vec![0u8; 0x100];
//! let mut image = FirmwareImage::from_bytes("ram", Address::new(0x1000), &image_bytes, Endian::Big)?;
//! let info = fix_tcb(&mut image, Address::new(0x1000), &AnalysisConfig::new(VxVersion::V5))?;
//! assert_eq!(info.task_name, None);
//! # Ok::<(), vxsym_core::VxError>(())
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod kernel;
pub mod layout;
pub mod space;
pub mod symbols;
pub mod types;

pub use config::AnalysisConfig;
// Re-export commonly used types
pub use error::{Result, SymbolError, VxError};
pub use image::FirmwareImage;
pub use kernel::{fix_netpool, fix_tcb};
pub use layout::VxVersion;
pub use space::AddressSpace;
pub use symbols::{Demangler, ItaniumDemangler, WalkReport, define_symbol_table, is_symbol_table, walk};
