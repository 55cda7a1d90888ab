//! # Symbol Recovery
//!
//! Recovering names from a VxWorks symbol table, bottom-up:
//!
//! - [`validator`]: is this byte range a symbol table at all?
//! - [`table`]: map and type the table in the listing
//! - [`walker`]: follow the record links and drive everything below
//! - [`materialize`]: apply one symbol as a function or a label
//! - [`resolve`]: read the name string and demangle it
//! - [`demangle`]: the demangler seam and its three-pass retry
//! - [`signature`]: split a demangled signature into its parts
//!
//! ## Example
//!
//! ```rust
//! use vxsym_core::config::AnalysisConfig;
//! use vxsym_core::image::FirmwareImage;
//! use vxsym_core::symbols::{ItaniumDemangler, walk};
//! use vxsym_core::types::{Address, Endian};
//!
//! // One VxWorks 5 record: no link, no name pointer, global data at 0x1010.
//! let mut bytes = vec![0u8; 0x20];
//! bytes[0x08..0x0c].copy_from_slice(&0x1010u32.to_be_bytes());
//! bytes[0x0e] = 0x07;
//! let mut image = FirmwareImage::from_bytes("ram", Address::new(0x1000), &bytes, Endian::Big)?;
//!
//! let report = walk(
//!     &mut image,
//!     &ItaniumDemangler::new(),
//!     Address::new(0x1000),
//!     Address::new(0x1000),
//!     &AnalysisConfig::default(),
//! );
//! assert_eq!(report.symbols[0].name, "0x00001010");
//! # Ok::<(), vxsym_core::error::VxError>(())
//! ```

pub mod demangle;
pub mod materialize;
pub mod resolve;
pub mod signature;
pub mod table;
pub mod validator;
pub mod walker;

pub use demangle::{Demangler, ItaniumDemangler, demangled_symbol};
pub use materialize::materialize;
pub use resolve::{Resolution, resolve};
pub use signature::{check_is_func_name, parse};
pub use table::define_symbol_table;
pub use validator::is_symbol_table;
pub use walker::{WalkReport, WalkStop, read_record, walk};
