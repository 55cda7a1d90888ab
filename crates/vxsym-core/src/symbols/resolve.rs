//! Name resolution: turn a name pointer into a string in the listing and try
//! to demangle it.

use tracing::debug;

use super::demangle::{Demangler, demangled_symbol};
use crate::error::Result;
use crate::space::AddressSpace;
use crate::types::{Address, SymbolType};

/// Name recovered for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution
{
    /// The string stored in the image, or the caller's fallback name.
    pub name: String,
    /// Full demangled signature, if any.
    pub demangled: Option<String>,
}

/// Materialize the symbol name and look for a demangled form.
///
/// When `name_address` is set, whatever data occupies it is removed and an
/// ASCII string is created there; its value replaces `raw_name` unless it is
/// empty. Any instruction at `dest` is removed so a function can be created
/// there afterwards.
///
/// ## Errors
///
/// Fails when the string cannot be created (unmapped pointer, conflicting
/// data that could not be removed). Demangling failures are not errors.
pub fn resolve<S, D>(
    space: &mut S,
    demangler: &D,
    raw_name: &str,
    name_address: Option<Address>,
    dest: Address,
    symbol_type: SymbolType,
) -> Result<Resolution>
where
    S: AddressSpace + ?Sized,
    D: Demangler + ?Sized,
{
    let mut name = raw_name.to_string();

    if let Some(name_address) = name_address {
        if space.data_exists_at(name_address) {
            debug!(%name_address, "removing data at symbol name address");
            space.remove_data_at(name_address)?;
        }
        let value = space.create_ascii_string(name_address)?;
        if value.is_empty() {
            debug!(%name_address, %dest, fallback = %name, "symbol name is empty");
        } else {
            name = value;
        }
    }

    if space.instruction_exists_at(dest) {
        debug!(%dest, %symbol_type, "removing instruction at symbol address");
        space.remove_instruction_at(dest)?;
    }

    let demangled = demangled_symbol(demangler, &name);
    Ok(Resolution { name, demangled })
}
