//! Demangled signature splitting.
//!
//! Demanglers hand back one flat string such as
//! `"void Foo::Bar(int, char*)"`. There is no grammar here; [`parse`] scans
//! from the right, first over a balanced parameter list, then over
//! space-separated tokens until one looks like a function name. Callers only
//! depend on [`parse`] and [`check_is_func_name`], so a grammar-driven parser
//! can replace the scan without touching them.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::types::DemangledSignature;

/// Longest string accepted as a function name.
pub const MAX_FUNC_NAME_LEN: usize = 512;

/// Punctuation allowed in names besides ASCII letters and digits.
///
/// Covers qualified names and templates (`_:.<>,*`) and operator spellings
/// such as `operator+(ZafBignumData const &,long)` (`()~+-=/%`).
const FUNC_NAME_PUNCTUATION: &str = "_:.<>,*()~+-=/%";

/// Built-in data type names of the host's type system; these are never
/// function names, however they are spelled.
static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bool",
        "byte",
        "complex16",
        "complex32",
        "complex8",
        "doublecomplex",
        "dwfenc",
        "dword",
        "filetime",
        "float10",
        "float16",
        "float2",
        "float4",
        "float8",
        "floatcomplex",
        "guid",
        "imagebaseoffset32",
        "imagebaseoffset64",
        "int16",
        "int3",
        "int5",
        "int6",
        "int7",
        "long",
        "longdouble",
        "longdoublecomplex",
        "longlong",
        "mactime",
        "prel31",
        "qword",
        "sbyte",
        "schar",
        "sdword",
        "segmentedcodeaddress",
        "shiftedaddress",
        "sqword",
        "sword",
        "uchar",
        "uint",
        "uint16",
        "uint3",
        "uint5",
        "uint6",
        "uint7",
        "ulong",
        "ulonglong",
        "undefined",
        "undefined1",
        "undefined2",
        "undefined3",
        "undefined4",
        "undefined5",
        "undefined6",
        "undefined7",
        "undefined8",
        "ushort",
        "wchar_t",
        "wchar16",
        "wchar32",
        "word",
    ]
    .into_iter()
    .collect()
});

fn is_func_name_char(c: char) -> bool
{
    c.is_ascii_alphanumeric() || FUNC_NAME_PUNCTUATION.contains(c)
}

/// Whether `name` is a reserved built-in type spelling (case-insensitive).
pub fn is_builtin_type(name: &str) -> bool
{
    BUILTIN_TYPES.contains(name.to_ascii_lowercase().as_str())
}

/// Check that `function_name` can be used as a function name.
///
/// Rejects strings longer than [`MAX_FUNC_NAME_LEN`], strings containing a
/// character outside `[A-Za-z0-9_:.<>,*()~+-=/%]`, and built-in type names
/// compared case-insensitively. Accepts everything else.
pub fn check_is_func_name(function_name: &str) -> bool
{
    if function_name.len() > MAX_FUNC_NAME_LEN {
        return false;
    }

    if !function_name.chars().all(is_func_name_char) {
        return false;
    }

    !is_builtin_type(function_name)
}

/// A name token must also be non-empty; an empty token between two spaces
/// is not a name.
fn accept_name(token: &str) -> bool
{
    !token.is_empty() && check_is_func_name(token)
}

/// Index of the `(` matching the `)` that ends `signature`.
///
/// `None` when the parentheses never balance.
fn call_start(signature: &str) -> Option<usize>
{
    let mut depth = 0usize;
    for (index, byte) in signature.bytes().enumerate().rev() {
        match byte {
            b')' => depth += 1,
            b'(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a demangled signature into return type, name and parameters.
///
/// ```rust
/// use vxsym_core::symbols::signature::parse;
///
/// let sig = parse("void Foo::Bar(int, char*)");
/// assert_eq!(sig.return_type.as_deref(), Some("void"));
/// assert_eq!(sig.name.as_deref(), Some("Foo::Bar"));
/// assert_eq!(sig.parameters, "(int, char*)");
/// ```
///
/// Tokens are tried right to left; the first one [`check_is_func_name`]
/// accepts is the name. A bare `*` token is part of a pointer return type
/// and never the name. With unbalanced parentheses the whole input is the
/// parameter list and no name is found.
pub fn parse(signature: &str) -> DemangledSignature
{
    if signature.is_empty() {
        return DemangledSignature::default();
    }

    // Everything before `head_end` holds the name and return type.
    let (head_end, has_call) = if signature.ends_with(')') {
        match call_start(signature) {
            Some(open) => (open, true),
            None => {
                return DemangledSignature {
                    parameters: signature.to_string(),
                    ..DemangledSignature::default()
                };
            }
        }
    } else {
        (signature.len(), false)
    };

    // Token boundaries are ASCII spaces, so every slice is on a char boundary.
    let mut token_end = head_end;
    let mut found = None;
    loop {
        let token_start = signature[..token_end].rfind(' ').map_or(0, |space| space + 1);
        let token = &signature[token_start..token_end];
        if token != "*" && accept_name(token) {
            found = Some((token_start, token_end));
            break;
        }
        if token_start == 0 {
            break;
        }
        token_end = token_start - 1;
    }

    let Some((name_start, name_end)) = found else {
        return DemangledSignature {
            parameters: signature[head_end..].to_string(),
            ..DemangledSignature::default()
        };
    };

    let return_type = name_start
        .checked_sub(1)
        .map(|space| &signature[..space])
        .filter(|ret| !ret.is_empty())
        .map(str::to_string);
    let parameters = if has_call {
        &signature[head_end..]
    } else {
        signature[name_end..].trim_start()
    };

    DemangledSignature {
        return_type,
        name: Some(signature[name_start..name_end].to_string()),
        parameters: parameters.to_string(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn parts(sig: &str) -> (Option<String>, Option<String>, String)
    {
        let parsed = parse(sig);
        (parsed.return_type, parsed.name, parsed.parameters)
    }

    #[test]
    fn test_no_parameters()
    {
        assert_eq!(parts("int main"), (Some("int".into()), Some("main".into()), String::new()));
    }

    #[test]
    fn test_qualified_name_with_parameters()
    {
        assert_eq!(
            parts("void Foo::Bar(int, char*)"),
            (Some("void".into()), Some("Foo::Bar".into()), "(int, char*)".into())
        );
    }

    #[test]
    fn test_pointer_return_is_not_the_name()
    {
        assert_eq!(
            parts("char* getData()"),
            (Some("char*".into()), Some("getData".into()), "()".into())
        );
        assert_eq!(
            parts("char * getData()"),
            (Some("char *".into()), Some("getData".into()), "()".into())
        );
    }

    #[test]
    fn test_bare_name()
    {
        assert_eq!(parts("usrInit"), (None, Some("usrInit".into()), String::new()));
        assert_eq!(parts("foo(int)"), (None, Some("foo".into()), "(int)".into()));
    }

    #[test]
    fn test_nested_parameters()
    {
        let parsed = parse("void qsort(void*, unsigned int, int (*)(void const*, void const*))");
        assert_eq!(parsed.name.as_deref(), Some("qsort"));
        assert_eq!(parsed.return_type.as_deref(), Some("void"));
        assert_eq!(parsed.parameters, "(void*, unsigned int, int (*)(void const*, void const*))");
    }

    #[test]
    fn test_operator_spelling()
    {
        let parsed = parse("Zaf::operator+=(int)");
        assert_eq!(parsed.name.as_deref(), Some("Zaf::operator+="));
        assert_eq!(parsed.parameters, "(int)");
    }

    #[test]
    fn test_empty_and_unbalanced_input()
    {
        assert_eq!(parse(""), DemangledSignature::default());

        let parsed = parse("foo(int))");
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.return_type, None);
        assert_eq!(parsed.parameters, "foo(int))");

        assert_eq!(parts(")"), (None, None, ")".into()));
        assert_eq!(parts("(int)"), (None, None, "(int)".into()));
    }

    #[test]
    fn test_space_before_parameters()
    {
        let parsed = parse("void foo (int)");
        assert_eq!(parsed.name.as_deref(), Some("foo"));
        assert_eq!(parsed.return_type.as_deref(), Some("void"));
        assert_eq!(parsed.parameters, "(int)");
    }

    #[test]
    fn test_builtin_type_is_not_a_name()
    {
        let parsed = parse("dword");
        assert_eq!(parsed.name, None);

        // Scanning continues past a rejected token.
        let parsed = parse("int foo dword");
        assert_eq!(parsed.name.as_deref(), Some("foo"));
        assert_eq!(parsed.return_type.as_deref(), Some("int"));
        assert_eq!(parsed.parameters, "dword");

        assert_eq!(
            parts("int foo word(int)"),
            (Some("int".into()), Some("foo".into()), "(int)".into())
        );
        assert_eq!(
            parts("unsigned int Foo::get DWORD(void)"),
            (Some("unsigned int".into()), Some("Foo::get".into()), "(void)".into())
        );
    }

    #[test]
    fn test_trailing_space()
    {
        assert_eq!(parts("int main "), (Some("int".into()), Some("main".into()), String::new()));
        assert_eq!(parts("main "), (None, Some("main".into()), String::new()));
    }

    #[test]
    fn test_no_acceptable_token()
    {
        assert_eq!(parts("dword word"), (None, None, String::new()));
        assert_eq!(parts("dword (int)"), (None, None, "(int)".into()));
    }

    #[test]
    fn test_check_is_func_name()
    {
        assert!(check_is_func_name("Foo::Bar<int>"));
        assert!(check_is_func_name("operator()"));
        assert!(check_is_func_name(&"a".repeat(MAX_FUNC_NAME_LEN)));
        assert!(!check_is_func_name(&"a".repeat(MAX_FUNC_NAME_LEN + 1)));
        assert!(!check_is_func_name("has space"));
        assert!(!check_is_func_name("semi;colon"));
        assert!(!check_is_func_name("DWORD"));
        assert!(!check_is_func_name("Undefined4"));
        assert!(!check_is_func_name("wchar_t"));
    }
}
