//! # Types
//!
//! Value types shared by the symbol walker, the kernel object walkers and
//! address space implementations.
//!
//! None of these own anything in the program database: they are records read
//! out of (or reported about) the image and live no longer than one call.

pub mod address;
pub mod endian;
pub mod kernel;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use endian::Endian;
pub use kernel::{ClPoolInfo, PoolFunction, PoolInfo, TcbInfo};
pub use symbols::{DemangledSignature, ResolvedSymbol, SymbolKind, SymbolRecord, SymbolType};
