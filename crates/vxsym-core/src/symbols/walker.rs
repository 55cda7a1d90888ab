//! # Symbol Table Walker
//!
//! VxWorks links symbol records backwards: each record starts with the
//! address of the one before it. The walk starts at the head (normally the
//! last record of the table), follows those links and materializes every
//! record on the way.
//!
//! ## Termination
//!
//! The image is untrusted, so besides the two natural exits (a zero link,
//! reaching the tail) the walk stops on a record it has already visited, on
//! a record it cannot read, and after [`AnalysisConfig::max_symbols`]
//! records.
//!
//! ## Failures
//!
//! A symbol that cannot be materialized is logged, kept in
//! [`WalkReport::failures`] and skipped. It never ends the walk.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, error, info, warn};

use super::demangle::Demangler;
use super::materialize::materialize;
use crate::config::AnalysisConfig;
use crate::error::{Result, SymbolError, VxError};
use crate::layout::{SymbolLayout, VxVersion};
use crate::space::{AddressSpace, create_struct, read_nullable_pointer, read_pointer};
use crate::types::{Address, ResolvedSymbol, SymbolKind, SymbolRecord, SymbolType};

/// Why a walk ended.
#[derive(Debug)]
pub enum WalkStop
{
    /// The previous-record link of the last record was zero.
    ZeroLink,
    /// The tail record was processed.
    ReachedTail,
    /// A link pointed back at a record already processed.
    Revisited(Address),
    /// The record cap was hit.
    Limit(usize),
    /// A record could not be read.
    Unreadable
    {
        address: Address,
        error: VxError,
    },
}

impl WalkStop
{
    /// Whether the walk ended the way a well-formed table ends.
    pub fn is_clean(&self) -> bool
    {
        matches!(self, WalkStop::ZeroLink | WalkStop::ReachedTail)
    }
}

impl fmt::Display for WalkStop
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            WalkStop::ZeroLink => write!(f, "reached a zero link"),
            WalkStop::ReachedTail => write!(f, "reached the tail record"),
            WalkStop::Revisited(address) => write!(f, "record at {address} visited twice"),
            WalkStop::Limit(limit) => write!(f, "stopped after {limit} records"),
            WalkStop::Unreadable { address, error } => write!(f, "record at {address} unreadable: {error}"),
        }
    }
}

/// Outcome of one walk.
#[derive(Debug)]
pub struct WalkReport
{
    pub version: VxVersion,
    /// Symbols applied, in walk order.
    pub symbols: Vec<ResolvedSymbol>,
    /// Symbols that failed to apply.
    pub failures: Vec<SymbolError>,
    /// Records visited, including failed and unreadable ones.
    pub records: usize,
    pub stop: WalkStop,
}

impl WalkReport
{
    pub fn function_count(&self) -> usize
    {
        self.symbols.iter().filter(|s| s.kind == SymbolKind::Function).count()
    }

    pub fn label_count(&self) -> usize
    {
        self.symbols.iter().filter(|s| s.kind == SymbolKind::Data).count()
    }
}

/// Read the raw fields of the record at `ea`.
///
/// Zero pointers stay zero instead of going through
/// [`AddressSpace::to_address`].
pub fn read_record<S>(space: &S, ea: Address, layout: &SymbolLayout) -> Result<SymbolRecord>
where
    S: AddressSpace + ?Sized,
{
    Ok(SymbolRecord {
        prev_address: read_nullable_pointer(space, ea + layout.prev_offset)?,
        name_address: read_nullable_pointer(space, ea + layout.name_offset)?,
        dest_address: read_pointer(space, ea + layout.value_offset)?,
        symbol_type: SymbolType(space.read_u8(ea + layout.type_offset())?),
    })
}

/// Walk the symbol table from `head` back to `tail`, materializing every
/// record.
pub fn walk<S, D>(space: &mut S, demangler: &D, head: Address, tail: Address, config: &AnalysisConfig) -> WalkReport
where
    S: AddressSpace + ?Sized,
    D: Demangler + ?Sized,
{
    let layout = config.version.symbol_layout();
    info!(version = %config.version, %head, %tail, stride = layout.stride, "walking symbol table");

    let mut symbols = Vec::new();
    let mut failures = Vec::new();
    let mut visited = HashSet::new();
    let mut ea = head;

    let stop = loop {
        if visited.len() >= config.max_symbols {
            warn!(limit = config.max_symbols, %ea, "symbol limit reached");
            break WalkStop::Limit(config.max_symbols);
        }
        if !visited.insert(ea) {
            warn!(%ea, "symbol table links back to a visited record");
            break WalkStop::Revisited(ea);
        }

        let record = match read_record(space, ea, layout) {
            Ok(record) => record,
            Err(err) => {
                error!(%ea, error = %err, "can't read symbol record");
                break WalkStop::Unreadable { address: ea, error: err };
            }
        };

        if let Err(err) = create_struct(space, ea, layout.record) {
            debug!(%ea, error = %err, "symbol record left untyped");
        }

        let default_name = record.default_name();
        match materialize(
            space,
            demangler,
            &default_name,
            record.name_pointer(),
            record.dest_address,
            record.symbol_type,
        ) {
            Ok(symbol) => symbols.push(symbol),
            Err(err) => {
                error!("{err}");
                failures.push(err);
            }
        }

        if record.prev_address.is_null() {
            break WalkStop::ZeroLink;
        }
        if ea == tail {
            break WalkStop::ReachedTail;
        }
        ea = record.prev_address;
    };

    info!(
        records = visited.len(),
        symbols = symbols.len(),
        failures = failures.len(),
        stop = %stop,
        "symbol table walk finished"
    );

    WalkReport {
        version: config.version,
        records: visited.len(),
        symbols,
        failures,
        stop,
    }
}
