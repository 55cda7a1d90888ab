//! # Error Types
//!
//! Error handling for symbol and kernel object recovery.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Two levels exist on purpose. [`VxError`] is what an address space or a
//! kernel walker returns. [`SymbolError`] wraps a `VxError` with the context of
//! the one symbol being materialized, so the walker can log it and move on to
//! the next record instead of aborting.

use thiserror::Error;

use crate::types::{Address, SymbolType};

/// Main error type for address space and walker operations
///
/// ## Error Categories
///
/// 1. **Memory errors**: OutOfBounds
/// 2. **Listing errors**: DataConflict, NotFound
/// 3. **Layout errors**: UnsupportedVersion
/// 4. **Input errors**: InvalidArgument, Io
#[derive(Error, Debug)]
pub enum VxError
{
    /// The address (or part of the span starting there) is not backed by any
    /// memory block
    #[error("Address {address} (+{len:#x}) is outside the address space")]
    OutOfBounds
    {
        /// First address of the access
        address: Address,
        /// Number of bytes requested
        len: u64,
    },

    /// Typed data, a string or a function could not be placed because
    /// something else already occupies the span
    ///
    /// Callers usually recover by removing the conflicting item first.
    #[error("Data conflict at {address}: {reason}")]
    DataConflict
    {
        /// Address where placement was attempted
        address: Address,
        /// What is in the way
        reason: String,
    },

    /// No layout is known for this VxWorks major version
    ///
    /// Only VxWorks 5 kernel object layouts are catalogued. Walkers return
    /// this rather than guessing offsets.
    #[error("Unsupported VxWorks version {0} for this operation")]
    UnsupportedVersion(u8),

    /// The requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid argument passed to an operation
    ///
    /// Examples:
    /// - A version selector other than 5, 6 or 7
    /// - A symbol table whose end lies before its start
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (reading firmware files, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to materialize one symbol
///
/// Carries everything needed to log the failure with full context. The
/// symbol walker never propagates this; it records it in the walk report.
#[derive(Error, Debug)]
#[error(
    "Create symbol failed: symbol_name: {name}, symbol_name_address: {name_address:?}, symbol_address: {address}, \
     symbol_type: {symbol_type}, reason: {source}"
)]
pub struct SymbolError
{
    /// Best name known when the failure happened
    pub name: String,
    /// Name pointer read from the record, if any
    pub name_address: Option<Address>,
    /// Destination address of the symbol
    pub address: Address,
    /// Raw type tag
    pub symbol_type: SymbolType,
    /// Underlying cause
    #[source]
    pub source: VxError,
}

/// Failure reported by a demangler backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Demangling {symbol} failed: {reason}")]
pub struct DemangleError
{
    /// Input that could not be demangled
    pub symbol: String,
    /// Backend specific description
    pub reason: String,
}

/// Convenience type alias for `Result<T, VxError>`
///
/// ```rust
/// use vxsym_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, VxError>;
