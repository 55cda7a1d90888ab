//! Byte order of the firmware image.

use std::fmt;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order used to decode multi-byte fields.
///
/// Most VxWorks targets seen in the wild (PowerPC, MIPS, 68k) are big endian,
/// so that is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian
{
    /// Most significant byte first.
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

impl Endian
{
    /// Decode a `u16` from the first two bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than two bytes; callers slice exactly.
    pub fn read_u16(self, buf: &[u8]) -> u16
    {
        match self {
            Endian::Big => BigEndian::read_u16(buf),
            Endian::Little => LittleEndian::read_u16(buf),
        }
    }

    /// Decode a `u32` from the first four bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than four bytes; callers slice exactly.
    pub fn read_u32(self, buf: &[u8]) -> u32
    {
        match self {
            Endian::Big => BigEndian::read_u32(buf),
            Endian::Little => LittleEndian::read_u32(buf),
        }
    }

    /// Encode a `u32` into the first four bytes of `buf`.
    pub fn write_u32(self, buf: &mut [u8], value: u32)
    {
        match self {
            Endian::Big => BigEndian::write_u32(buf, value),
            Endian::Little => LittleEndian::write_u32(buf, value),
        }
    }

    /// Whether this is big endian.
    pub fn is_big(self) -> bool
    {
        self == Endian::Big
    }
}

impl FromStr for Endian
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "big" | "be" | "msb" => Ok(Endian::Big),
            "little" | "le" | "lsb" => Ok(Endian::Little),
            _ => Err(format!("Unknown byte order: {s}. Use 'big' or 'little'")),
        }
    }
}

impl fmt::Display for Endian
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Endian::Big => "big",
            Endian::Little => "little",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_read_u32_both_orders()
    {
        let bytes = [0x00, 0x00, 0x01, 0x02];
        assert_eq!(Endian::Big.read_u32(&bytes), 0x0102);
        assert_eq!(Endian::Little.read_u32(&bytes), 0x0201_0000);
    }

    #[test]
    fn test_endian_from_str()
    {
        assert_eq!("BE".parse::<Endian>().unwrap(), Endian::Big);
        assert_eq!("little".parse::<Endian>().unwrap(), Endian::Little);
        assert!("middle".parse::<Endian>().is_err());
    }
}
