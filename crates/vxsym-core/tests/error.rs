//! Tests for error handling

use vxsym_core::error::{DemangleError, Result, SymbolError, VxError};
use vxsym_core::types::{Address, SymbolType};

#[test]
fn test_out_of_bounds_display()
{
    let error = VxError::OutOfBounds {
        address: Address::new(0x9000),
        len: 4,
    };
    let message = error.to_string();
    assert!(message.contains("0x00009000"));
    assert!(message.contains("outside the address space"));
}

#[test]
fn test_unsupported_version_display()
{
    let error = VxError::UnsupportedVersion(6);
    assert_eq!(error.to_string(), "Unsupported VxWorks version 6 for this operation");
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "firmware.bin");
    let error: VxError = io.into();
    assert!(matches!(error, VxError::Io(_)));
    assert!(error.to_string().contains("firmware.bin"));
}

#[test]
fn test_symbol_error_carries_context()
{
    let error = SymbolError {
        name: "usrRoot".to_string(),
        name_address: Some(Address::new(0x2000)),
        address: Address::new(0x3000),
        symbol_type: SymbolType::GLOBAL_TEXT,
        source: VxError::DataConflict {
            address: Address::new(0x2000),
            reason: "struct in the way".to_string(),
        },
    };
    let message = error.to_string();
    assert!(message.contains("usrRoot"));
    assert!(message.contains("0x00003000"));
    assert!(message.contains("global text"));
    assert!(message.contains("struct in the way"));

    let source = std::error::Error::source(&error).unwrap();
    assert!(source.to_string().contains("Data conflict"));
}

#[test]
fn test_demangle_error_display()
{
    let error = DemangleError {
        symbol: "_Zbad".to_string(),
        reason: "unexpected end of input".to_string(),
    };
    assert_eq!(error.to_string(), "Demangling _Zbad failed: unexpected end of input");
}

#[test]
fn test_result_question_mark()
{
    fn fails() -> Result<u32>
    {
        Err(VxError::NotFound("vxSymTbl".to_string()))
    }

    fn propagates() -> Result<u32>
    {
        let value = fails()?;
        Ok(value + 1)
    }

    assert!(matches!(propagates(), Err(VxError::NotFound(name)) if name == "vxSymTbl"));
}
