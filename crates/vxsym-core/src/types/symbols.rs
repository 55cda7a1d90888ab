//! Symbol record and signature types.

use std::fmt;

use super::Address;

/// Raw VxWorks symbol type byte (`SYM_TYPE`).
///
/// The low bit is the "external" flag; the remaining bits classify the
/// section the symbol lives in. Only text symbols become functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolType(pub u8);

impl SymbolType
{
    /// `N_UNDF`
    pub const UNDEFINED: Self = SymbolType(0x00);
    /// `N_ABS`
    pub const ABS: Self = SymbolType(0x02);
    /// `N_TEXT`
    pub const TEXT: Self = SymbolType(0x04);
    /// `N_EXT | N_TEXT`
    pub const GLOBAL_TEXT: Self = SymbolType(0x05);
    /// `N_DATA`
    pub const DATA: Self = SymbolType(0x06);
    /// `N_EXT | N_DATA`
    pub const GLOBAL_DATA: Self = SymbolType(0x07);
    /// `N_BSS`
    pub const BSS: Self = SymbolType(0x08);
    /// `N_EXT | N_BSS`
    pub const GLOBAL_BSS: Self = SymbolType(0x09);
    /// `N_COMM`
    pub const COMMON: Self = SymbolType(0x12);

    /// Raw byte value.
    pub const fn raw(self) -> u8
    {
        self.0
    }

    /// Whether a symbol of this type names code and should become a function.
    pub const fn is_function(self) -> bool
    {
        matches!(self.0, 0x04 | 0x05)
    }

    /// Whether the external (global) bit is set.
    pub const fn is_global(self) -> bool
    {
        self.0 & 0x01 != 0
    }
}

impl From<u8> for SymbolType
{
    fn from(value: u8) -> Self
    {
        SymbolType(value)
    }
}

impl fmt::Display for SymbolType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let section = match self.0 & !0x01 {
            0x00 => "undef",
            0x02 => "abs",
            0x04 => "text",
            0x06 => "data",
            0x08 => "bss",
            0x12 => "comm",
            _ => return write!(f, "type({:#04x})", self.0),
        };
        if self.is_global() {
            write!(f, "global {section}")
        } else {
            write!(f, "local {section}")
        }
    }
}

/// Raw fields read from one stride of the symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolRecord
{
    /// Address of the record this one links back to (zero terminates).
    pub prev_address: Address,
    /// Pointer to the NUL terminated symbol name.
    pub name_address: Address,
    /// Address the symbol names.
    pub dest_address: Address,
    /// Type tag byte at `stride - 2`.
    pub symbol_type: SymbolType,
}

impl SymbolRecord
{
    /// Name pointer, with a null pointer mapped to `None`.
    pub fn name_pointer(&self) -> Option<Address>
    {
        (!self.name_address.is_null()).then_some(self.name_address)
    }

    /// Placeholder name used when nothing better is recovered.
    pub fn default_name(&self) -> String
    {
        format!("0x{:08X}", self.dest_address.value())
    }
}

/// Whether a recovered symbol became code or data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind
{
    /// A function was requested for the symbol.
    Function,
    /// Labelled data (or any non-text symbol).
    Data,
}

impl fmt::Display for SymbolKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SymbolKind::Function => f.pad("function"),
            SymbolKind::Data => f.pad("data"),
        }
    }
}

/// A symbol after name resolution and materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol
{
    /// Final name: the demangled identifier when one was recovered, otherwise
    /// the raw string.
    pub name: String,
    /// Raw name as stored in the image (possibly mangled).
    pub raw_name: String,
    /// Address the symbol was applied to.
    pub address: Address,
    /// Function or data.
    pub kind: SymbolKind,
    /// Full demangled signature, if the demangler produced one.
    pub demangled: Option<String>,
}

/// A demangled C++ signature split into its three parts.
///
/// `parameters` keeps its surrounding parentheses, e.g. `"(int, char*)"`, and
/// is empty when the signature has no call syntax.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DemangledSignature
{
    /// Everything before the name, without the separating space.
    pub return_type: Option<String>,
    /// Function name, possibly qualified (`Foo::Bar`).
    pub name: Option<String>,
    /// Parameter list.
    pub parameters: String,
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_function_types()
    {
        assert!(SymbolType::TEXT.is_function());
        assert!(SymbolType::GLOBAL_TEXT.is_function());
        assert!(!SymbolType::GLOBAL_DATA.is_function());
        assert!(!SymbolType::COMMON.is_function());
    }

    #[test]
    fn test_symbol_type_display()
    {
        assert_eq!(SymbolType::GLOBAL_TEXT.to_string(), "global text");
        assert_eq!(SymbolType::BSS.to_string(), "local bss");
        assert_eq!(SymbolType(0x40).to_string(), "type(0x40)");
    }

    #[test]
    fn test_default_name_and_null_pointer()
    {
        let record = SymbolRecord {
            prev_address: Address::ZERO,
            name_address: Address::ZERO,
            dest_address: Address::new(0x1000_0abc),
            symbol_type: SymbolType::DATA,
        };
        assert_eq!(record.default_name(), "0x10000ABC");
        assert_eq!(record.name_pointer(), None);
    }
}
