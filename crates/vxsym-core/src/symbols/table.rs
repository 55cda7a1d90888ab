//! Define an exported symbol table in the listing.

use tracing::{debug, info};

use crate::error::{Result, VxError};
use crate::layout::VxVersion;
use crate::space::{AddressSpace, DataUnit};
use crate::types::Address;

/// Label placed at the start of the table.
pub const SYMBOL_TABLE_LABEL: &str = "vxSymTbl";

/// Name of the memory block created when the table is not mapped yet.
pub const SYMBOL_TABLE_BLOCK: &str = "vxSymbolTable";

/// Type `[start, end)` as an array of the version's symbol records.
///
/// The start is labelled, the range is cleared, and if no memory block
/// covers `start` yet one is created from `data`. Returns the array.
///
/// ## Errors
///
/// - `InvalidArgument` if `end` lies before `start` or the range holds no
///   whole record
/// - Whatever the address space reports while clearing, mapping or typing
pub fn define_symbol_table<S>(space: &mut S, start: Address, end: Address, data: &[u8], version: VxVersion) -> Result<DataUnit>
where
    S: AddressSpace + ?Sized,
{
    let span = end
        .offset_from(start)
        .ok_or_else(|| VxError::InvalidArgument(format!("symbol table end {end} is before its start {start}")))?;
    let layout = version.symbol_layout();
    let count = span / layout.stride;
    if count == 0 {
        return Err(VxError::InvalidArgument(format!(
            "symbol table {start}..{end} is shorter than one {} byte record",
            layout.stride
        )));
    }

    space.create_label(start, SYMBOL_TABLE_LABEL, true)?;
    space.clear_listing(start, end)?;

    if space.memory_block(start).is_none() {
        debug!(%start, len = data.len(), "mapping symbol table");
        space.create_memory_block(SYMBOL_TABLE_BLOCK, start, data, true)?;
    }

    let unit = space.create_typed_array(start, layout.record, count)?;
    info!(%start, %end, count, record = layout.record.name, "defined symbol table");
    Ok(unit)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::image::{DataKind, FirmwareImage};
    use crate::types::Endian;

    #[test]
    fn test_maps_and_types_table()
    {
        let mut img = FirmwareImage::new(Endian::Big);
        let data = vec![0u8; 0x48];
        let unit = define_symbol_table(
            &mut img,
            Address::new(0x8000),
            Address::new(0x8048),
            &data,
            VxVersion::V6,
        )
        .unwrap();

        assert_eq!(unit.len, 0x3c);
        assert_eq!(img.memory_block(Address::new(0x8000)).unwrap().name, SYMBOL_TABLE_BLOCK);
        assert_eq!(img.primary_label(Address::new(0x8000)), Some(SYMBOL_TABLE_LABEL));
        assert!(matches!(
            img.data_at(Address::new(0x8000)).unwrap().kind,
            DataKind::Array { count: 3, .. }
        ));
    }

    #[test]
    fn test_existing_block_is_reused()
    {
        let mut img = FirmwareImage::from_bytes("rom", Address::new(0x8000), &[0u8; 0x40], Endian::Big).unwrap();
        img.create_ascii_string(Address::new(0x8010)).unwrap();
        define_symbol_table(&mut img, Address::new(0x8000), Address::new(0x8040), &[], VxVersion::V5).unwrap();

        assert_eq!(img.memory_block(Address::new(0x8000)).unwrap().name, "rom");
        assert!(img.string_at(Address::new(0x8010)).is_none());
    }

    #[test]
    fn test_rejects_bad_ranges()
    {
        let mut img = FirmwareImage::new(Endian::Big);
        assert!(define_symbol_table(&mut img, Address::new(0x10), Address::new(0x8), &[0; 8], VxVersion::V5).is_err());
        assert!(define_symbol_table(&mut img, Address::new(0x10), Address::new(0x18), &[0; 8], VxVersion::V5).is_err());
    }
}
