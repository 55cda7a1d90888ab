//! Symbol demangling.
//!
//! The demangler itself is a collaborator behind the [`Demangler`] trait so a
//! host can plug in its own engine. [`ItaniumDemangler`] is the bundled
//! implementation, backed by the `cpp_demangle` crate.
//!
//! ## Retry order
//!
//! VxWorks images mix toolchains, so [`demangled_symbol`] tries three times
//! before giving up:
//!
//! 1. The name as is, only if it carries the `_Z` mangling prefix
//! 2. The name as is, without requiring the prefix
//! 3. The name minus its first character, without requiring the prefix
//!    (targets whose C compiler prepends `_` produce `__Z...`)
//!
//! Every failure is logged at debug level and turned into `None`.

use cpp_demangle::{DemangleOptions, Symbol};
use tracing::debug;

use crate::error::DemangleError;

/// Itanium C++ ABI mangling prefix.
pub const MANGLED_PREFIX: &str = "_Z";

/// A C++ name demangler.
pub trait Demangler
{
    /// Demangle `mangled` into a full signature.
    ///
    /// With `require_prefix` set, names that do not start with a known
    /// mangling prefix return `Ok(None)` without being parsed.
    ///
    /// ## Errors
    ///
    /// `DemangleError` when the input is malformed.
    fn demangle(&self, mangled: &str, require_prefix: bool) -> Result<Option<String>, DemangleError>;
}

/// Whether `name` starts with `_Z` after any number of extra leading
/// underscores.
fn has_mangled_prefix(name: &str) -> bool
{
    name.starts_with('_') && name.trim_start_matches('_').starts_with('Z')
}

/// Itanium ABI demangler (`_Z...` names).
#[derive(Debug, Clone, Copy, Default)]
pub struct ItaniumDemangler;

impl ItaniumDemangler
{
    pub fn new() -> Self
    {
        Self
    }
}

impl Demangler for ItaniumDemangler
{
    fn demangle(&self, mangled: &str, require_prefix: bool) -> Result<Option<String>, DemangleError>
    {
        if require_prefix && !mangled.starts_with(MANGLED_PREFIX) {
            return Ok(None);
        }

        let symbol = Symbol::new(mangled.as_bytes()).map_err(|err| DemangleError {
            symbol: mangled.to_string(),
            reason: err.to_string(),
        })?;
        let demangled = symbol.demangle(&DemangleOptions::default()).map_err(|err| DemangleError {
            symbol: mangled.to_string(),
            reason: err.to_string(),
        })?;

        // Without a prefix the parser can still read the input as a bare
        // type ("i" -> "int"); that is not a symbol.
        if !has_mangled_prefix(mangled) || demangled.is_empty() {
            return Ok(None);
        }
        Ok(Some(demangled))
    }
}

/// Run the three-pass demangling strategy and return the signature, if any.
pub fn demangled_symbol<D>(demangler: &D, symbol_string: &str) -> Option<String>
where
    D: Demangler + ?Sized,
{
    let first = demangler
        .demangle(symbol_string, true)
        .and_then(|found| match found {
            Some(sig) => Ok(Some(sig)),
            // Some mangled names don't start with the mangling prefix.
            None => demangler.demangle(symbol_string, false),
        })
        .unwrap_or_else(|err| {
            debug!(symbol_string, reason = %err, "first pass demangling failed");
            None
        });

    let sym_demangled = first.or_else(|| {
        let mut chars = symbol_string.chars();
        chars.next()?;
        let stripped = chars.as_str();
        if stripped.is_empty() {
            return None;
        }
        demangler.demangle(stripped, false).unwrap_or_else(|err| {
            debug!(symbol_string, reason = %err, "second pass demangling failed");
            None
        })
    });

    match &sym_demangled {
        Some(name) => debug!(symbol_string, sym_demangled_name = %name, "demangled symbol"),
        None => debug!(symbol_string, "no demangled form"),
    }
    sym_demangled
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_itanium_requires_prefix_when_asked()
    {
        let demangler = ItaniumDemangler::new();
        assert_eq!(demangler.demangle("usrInit", true), Ok(None));
        assert!(!matches!(demangler.demangle("usrInit", false), Ok(Some(_))));
        assert!(!matches!(demangler.demangle("i", false), Ok(Some(_))));
    }

    #[test]
    fn test_itanium_demangles_function()
    {
        let demangler = ItaniumDemangler::new();
        let sig = demangler.demangle("_ZN3Foo3BarEiPc", true).unwrap().unwrap();
        assert_eq!(sig, "Foo::Bar(int, char*)");
    }

    #[test]
    fn test_leading_underscore_is_stripped_on_retry()
    {
        let demangler = ItaniumDemangler::new();
        assert_eq!(demangled_symbol(&demangler, "__Z3fooi").as_deref(), Some("foo(int)"));
    }

    #[test]
    fn test_plain_c_name_has_no_demangled_form()
    {
        let demangler = ItaniumDemangler::new();
        assert_eq!(demangled_symbol(&demangler, "bzero"), None);
        assert_eq!(demangled_symbol(&demangler, ""), None);
    }
}
