//! Apply one recovered symbol to the address space.
//!
//! Text symbols become functions; everything else becomes a label. A
//! demangled signature is attached as a plate comment, and for functions the
//! identifier parsed out of it replaces the mangled name. The name as stored
//! in the image always stays reachable as a label.

use tracing::debug;

use super::demangle::Demangler;
use super::resolve::{Resolution, resolve};
use super::signature;
use crate::error::{Result, SymbolError, VxError};
use crate::space::AddressSpace;
use crate::types::{Address, ResolvedSymbol, SymbolKind, SymbolType};

/// Resolve and apply one symbol.
///
/// `raw_name` is the fallback name used when the record has no usable name
/// pointer (normally `0x%08X` of `dest`).
///
/// ## Errors
///
/// Any address space failure is returned as a [`SymbolError`] carrying the
/// symbol's context. Changes made before the failure are not rolled back.
pub fn materialize<S, D>(
    space: &mut S,
    demangler: &D,
    raw_name: &str,
    name_address: Option<Address>,
    dest: Address,
    symbol_type: SymbolType,
) -> std::result::Result<ResolvedSymbol, SymbolError>
where
    S: AddressSpace + ?Sized,
    D: Demangler + ?Sized,
{
    apply(space, demangler, raw_name, name_address, dest, symbol_type).map_err(|source| SymbolError {
        name: raw_name.to_string(),
        name_address,
        address: dest,
        symbol_type,
        source,
    })
}

fn apply<S, D>(
    space: &mut S,
    demangler: &D,
    raw_name: &str,
    name_address: Option<Address>,
    dest: Address,
    symbol_type: SymbolType,
) -> Result<ResolvedSymbol>
where
    S: AddressSpace + ?Sized,
    D: Demangler + ?Sized,
{
    let Resolution { name, demangled } = resolve(space, demangler, raw_name, name_address, dest, symbol_type)?;

    if symbol_type.is_function() {
        let final_name = define_symbol_function(space, dest, &name, demangled.as_deref())?;
        return Ok(ResolvedSymbol {
            name: final_name,
            raw_name: name,
            address: dest,
            kind: SymbolKind::Function,
            demangled,
        });
    }

    space.create_label(dest, &name, true)?;
    if let Some(sig) = &demangled {
        space.set_plate_comment(dest, sig)?;
    }
    Ok(ResolvedSymbol {
        name: name.clone(),
        raw_name: name,
        address: dest,
        kind: SymbolKind::Data,
        demangled,
    })
}

/// Create the function for a text symbol and return the name it ended up
/// with.
fn define_symbol_function<S>(space: &mut S, dest: Address, name: &str, demangled: Option<&str>) -> Result<String>
where
    S: AddressSpace + ?Sized,
{
    let created = match space.disassemble(dest).and_then(|()| space.create_function(dest, name)) {
        Ok(created) => created,
        Err(VxError::OutOfBounds { .. }) => {
            debug!(%dest, name, "function address is not mapped; labelling only");
            None
        }
        Err(err) => return Err(err),
    };

    let Some(function) = created else {
        debug!(%dest, name, "no new function; labelling only");
        space.create_label(dest, name, true)?;
        // An existing function keeps its name; report that one.
        return Ok(space.function_at(dest).map_or_else(|| name.to_string(), |f| f.name));
    };

    let mut final_name = name.to_string();
    if let Some(sig) = demangled {
        space.set_plate_comment(dest, sig)?;
        let parsed = signature::parse(sig);
        if let Some(parsed_name) = parsed.name {
            space.rename_function(&function, &parsed_name)?;
            final_name = parsed_name;
        } else {
            debug!(%dest, sig, "no function name in demangled signature");
        }
    }
    space.create_label(dest, name, true)?;

    Ok(final_name)
}
