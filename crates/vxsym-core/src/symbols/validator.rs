//! Symbol table fingerprinting.

use crate::types::Endian;

/// Kernel routine names present in every VxWorks image's symbol strings.
pub const FINGERPRINTS: &[&[u8]] = &[b"bzero", b"usrInit", b"bfill"];

fn contains(haystack: &[u8], needle: &[u8]) -> bool
{
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Whether `bytes` looks like an exported VxWorks symbol table.
///
/// Every fingerprint must occur somewhere in the buffer, and the first word
/// (decoded with `endian`) must equal the buffer length: the table stores
/// its own size up front.
///
/// ```rust
/// use vxsym_core::symbols::validator::is_symbol_table;
/// use vxsym_core::types::Endian;
///
/// let mut table = vec![0u8; 4];
/// table.extend_from_slice(b"bzero\0usrInit\0bfill\0");
/// let len = table.len() as u32;
/// table[..4].copy_from_slice(&len.to_be_bytes());
///
/// assert!(is_symbol_table(&table, Endian::Big));
/// assert!(!is_symbol_table(&table, Endian::Little));
/// ```
pub fn is_symbol_table(bytes: &[u8], endian: Endian) -> bool
{
    if bytes.len() < 4 {
        return false;
    }

    if !FINGERPRINTS.iter().all(|fingerprint| contains(bytes, fingerprint)) {
        return false;
    }

    u64::from(endian.read_u32(&bytes[..4])) == bytes.len() as u64
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn table(len_word: u32, endian: Endian, body: &[u8]) -> Vec<u8>
    {
        let mut bytes = vec![0u8; 4];
        endian.write_u32(&mut bytes, len_word);
        bytes.extend_from_slice(body);
        bytes
    }

    const BODY: &[u8] = b"\0\0usrInit\0bfill\0bzero\0sysClkRateGet\0";

    #[test]
    fn test_length_word_must_match()
    {
        let len = (4 + BODY.len()) as u32;
        assert!(is_symbol_table(&table(len, Endian::Big, BODY), Endian::Big));
        assert!(is_symbol_table(&table(len, Endian::Little, BODY), Endian::Little));
        assert!(!is_symbol_table(&table(len + 1, Endian::Big, BODY), Endian::Big));
    }

    #[test]
    fn test_wrong_endianness_fails()
    {
        let len = (4 + BODY.len()) as u32;
        assert!(!is_symbol_table(&table(len, Endian::Big, BODY), Endian::Little));
    }

    #[test]
    fn test_missing_fingerprint_fails_regardless_of_length()
    {
        for missing in FINGERPRINTS {
            let body: Vec<u8> = FINGERPRINTS
                .iter()
                .filter(|f| *f != missing)
                .flat_map(|f| f.iter().copied().chain([0]))
                .collect();
            let len = (4 + body.len()) as u32;
            assert!(!is_symbol_table(&table(len, Endian::Big, &body), Endian::Big));
        }
    }

    #[test]
    fn test_short_buffers()
    {
        assert!(!is_symbol_table(&[], Endian::Big));
        assert!(!is_symbol_table(&[0, 0, 0], Endian::Big));
    }
}
