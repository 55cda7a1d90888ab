//! # Address Space Adapter
//!
//! The interface the recovery logic needs from whatever owns the program
//! database (a disassembler, a decompiler project, or the in-memory
//! [`FirmwareImage`](crate::image::FirmwareImage)).
//!
//! ## Why use a trait?
//!
//! Every walker takes `&mut S where S: AddressSpace` explicitly. Nothing in
//! this crate reaches for a global "current program", so the same code runs
//! against a host tool and against a fake image in tests.
//!
//! Mutations are immediate and not transactional. A failure halfway through
//! one symbol can leave that symbol partly applied; nothing rolls it back.

use tracing::{debug, error};

use crate::error::Result;
use crate::layout::RecordLayout;
use crate::types::Address;

/// A typed data item created in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit
{
    pub address: Address,
    /// Structure (or array element) name.
    pub type_name: String,
    /// Bytes covered.
    pub len: u64,
}

/// A function defined in the program database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function
{
    pub entry: Address,
    pub name: String,
}

/// A contiguous range of memory known to the address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock
{
    pub name: String,
    pub start: Address,
    /// Length in bytes.
    pub len: u64,
    /// Whether the block has backing bytes.
    pub initialized: bool,
}

impl MemoryBlock
{
    /// One past the last address of the block.
    pub fn end(&self) -> Address
    {
        self.start + self.len
    }

    /// Whether `address` falls inside the block.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end()
    }
}

/// Memory and annotation primitives consumed by the walkers.
///
/// Reads fail with [`VxError::OutOfBounds`](crate::error::VxError::OutOfBounds) outside mapped memory. Creating
/// typed data, strings or arrays fails with
/// [`VxError::DataConflict`](crate::error::VxError::DataConflict) when
/// the span is already occupied; callers remove the conflicting item first.
pub trait AddressSpace
{
    fn read_u8(&self, address: Address) -> Result<u8>;

    /// Read a 16-bit value in the image's byte order.
    fn read_u16(&self, address: Address) -> Result<u16>;

    /// Read a 32-bit value in the image's byte order.
    fn read_u32(&self, address: Address) -> Result<u32>;

    /// Convert a raw pointer value read from the image into an address.
    ///
    /// The default is the identity mapping; hosts with segmented or
    /// overlay address spaces override it.
    fn to_address(&self, raw: u64) -> Address
    {
        Address::new(raw)
    }

    /// Whether `address` is backed by a memory block.
    fn in_address_space(&self, address: Address) -> bool;

    fn data_exists_at(&self, address: Address) -> bool;

    /// Remove the data item containing `address`, if any.
    fn remove_data_at(&mut self, address: Address) -> Result<()>;

    fn instruction_exists_at(&self, address: Address) -> bool;

    fn remove_instruction_at(&mut self, address: Address) -> Result<()>;

    /// Type `layout.size` bytes at `address` as the given structure.
    fn create_typed_data(&mut self, address: Address, layout: &'static RecordLayout) -> Result<DataUnit>;

    /// Type `count` consecutive structures starting at `address`.
    fn create_typed_array(&mut self, address: Address, layout: &'static RecordLayout, count: u64) -> Result<DataUnit>;

    /// Define a NUL terminated ASCII string at `address` and return its value.
    fn create_ascii_string(&mut self, address: Address) -> Result<String>;

    /// Value of the string data item defined at `address`, if there is one.
    fn string_at(&self, address: Address) -> Option<String>;

    /// Remove every data item and instruction in `[start, end)`.
    fn clear_listing(&mut self, start: Address, end: Address) -> Result<()>;

    /// Mark `address` as the start of code.
    fn disassemble(&mut self, address: Address) -> Result<()>;

    /// Create a function at `address`.
    ///
    /// Returns `Ok(None)` when the function overlaps an existing one; that
    /// is a conflict the caller recovers from, not an error.
    fn create_function(&mut self, address: Address, name: &str) -> Result<Option<Function>>;

    fn rename_function(&mut self, function: &Function, name: &str) -> Result<()>;

    /// Add a label; `primary` makes it the name shown for the address.
    fn create_label(&mut self, address: Address, name: &str, primary: bool) -> Result<()>;

    fn set_plate_comment(&mut self, address: Address, text: &str) -> Result<()>;

    fn function_at(&self, address: Address) -> Option<Function>;

    /// Look a function up by name.
    fn function_named(&self, name: &str) -> Option<Function>;

    /// Address of a label with the given name.
    fn symbol(&self, name: &str) -> Option<Address>;

    fn create_memory_block(&mut self, name: &str, address: Address, bytes: &[u8], initialized: bool) -> Result<()>;

    fn memory_block(&self, address: Address) -> Option<MemoryBlock>;
}

/// Read a 32-bit pointer and convert it into an address.
pub fn read_pointer<S>(space: &S, address: Address) -> Result<Address>
where
    S: AddressSpace + ?Sized,
{
    let raw = space.read_u32(address)?;
    Ok(space.to_address(u64::from(raw)))
}

/// Like [`read_pointer`], but a zero word stays [`Address::ZERO`] whatever
/// [`AddressSpace::to_address`] would make of it.
pub fn read_nullable_pointer<S>(space: &S, address: Address) -> Result<Address>
where
    S: AddressSpace + ?Sized,
{
    match space.read_u32(address)? {
        0 => Ok(Address::ZERO),
        raw => Ok(space.to_address(u64::from(raw))),
    }
}

/// Type `layout` at `address`, clearing whatever data overlaps it first.
///
/// Returns `Ok(None)` without touching anything when `address` is outside
/// the address space. Re-typing an already typed record is destructive but
/// ends in the same state.
pub fn create_struct<S>(space: &mut S, address: Address, layout: &'static RecordLayout) -> Result<Option<DataUnit>>
where
    S: AddressSpace + ?Sized,
{
    if !space.in_address_space(address) {
        debug!(%address, layout = layout.name, "can't create data struct outside the address space");
        return Ok(None);
    }

    for offset in 0..layout.size {
        let at = address + offset;
        if space.data_exists_at(at) {
            space.remove_data_at(at)?;
        }
    }

    match space.create_typed_data(address, layout) {
        Ok(unit) => Ok(Some(unit)),
        Err(err) => {
            error!(%address, layout = layout.name, error = %err, "can't create data struct");
            Err(err)
        }
    }
}

/// Disassemble at `address` and define a function named `name` there,
/// falling back to a primary label when the function cannot be created.
///
/// Returns the function when one was created.
pub fn define_function<S>(space: &mut S, address: Address, name: &str) -> Result<Option<Function>>
where
    S: AddressSpace + ?Sized,
{
    debug!(%address, name, "create function");
    space.disassemble(address)?;
    match space.create_function(address, name)? {
        Some(function) => {
            space.rename_function(&function, name)?;
            Ok(Some(Function {
                entry: function.entry,
                name: name.to_string(),
            }))
        }
        None => {
            debug!(%address, name, "function overlaps an existing one; labelling only");
            space.create_label(address, name, true)?;
            Ok(None)
        }
    }
}

/// Find a label by name, retrying with `prefix` prepended.
///
/// VxWorks toolchains for some targets prepend an underscore to every C
/// symbol, so `usrInit` may only exist as `_usrInit`.
pub fn find_symbol<S>(space: &S, name: &str, prefix: Option<&str>) -> Option<Address>
where
    S: AddressSpace + ?Sized,
{
    space
        .symbol(name)
        .or_else(|| prefix.and_then(|p| space.symbol(&format!("{p}{name}"))))
}

/// Find a function by name, retrying with `prefix` prepended.
pub fn find_function<S>(space: &S, name: &str, prefix: Option<&str>) -> Option<Function>
where
    S: AddressSpace + ?Sized,
{
    space
        .function_named(name)
        .or_else(|| prefix.and_then(|p| space.function_named(&format!("{p}{name}"))))
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::image::FirmwareImage;
    use crate::layout::{VX5_CL_BUFF, VX5_CL_POOL};
    use crate::types::Endian;

    fn image() -> FirmwareImage
    {
        let mut bytes = vec![0u8; 0x100];
        bytes[0x10..0x14].copy_from_slice(&0x1080u32.to_be_bytes());
        FirmwareImage::from_bytes("ram", Address::new(0x1000), &bytes, Endian::Big).unwrap()
    }

    #[test]
    fn test_read_pointers()
    {
        let img = image();
        assert_eq!(read_pointer(&img, Address::new(0x1010)).unwrap(), Address::new(0x1080));
        assert_eq!(read_nullable_pointer(&img, Address::new(0x1020)).unwrap(), Address::ZERO);
        assert!(read_pointer(&img, Address::new(0x10fe)).is_err());
    }

    #[test]
    fn test_create_struct_replaces_overlapping_data()
    {
        let mut img = image();
        img.create_typed_data(Address::new(0x1004), &VX5_CL_BUFF).unwrap();
        img.create_ascii_string(Address::new(0x1018)).unwrap();

        let unit = create_struct(&mut img, Address::new(0x1000), &VX5_CL_POOL).unwrap().unwrap();
        assert_eq!(unit.len, 0x1c);
        assert!(img.data_at(Address::new(0x1004)).is_none());
        assert!(img.data_at(Address::new(0x1018)).is_none());

        // Typing the same record again ends in the same state.
        create_struct(&mut img, Address::new(0x1000), &VX5_CL_POOL).unwrap();
        assert_eq!(img.data_items().count(), 1);
    }

    #[test]
    fn test_create_struct_outside_space()
    {
        let mut img = image();
        assert!(create_struct(&mut img, Address::new(0x9000), &VX5_CL_POOL).unwrap().is_none());
    }

    #[test]
    fn test_define_function_falls_back_to_label()
    {
        let mut img = image();
        let created = define_function(&mut img, Address::new(0x1080), "netJobAdd").unwrap();
        assert_eq!(created.unwrap().name, "netJobAdd");

        assert!(define_function(&mut img, Address::new(0x1080), "pInitRtn").unwrap().is_none());
        assert_eq!(img.function_at(Address::new(0x1080)).unwrap().name, "netJobAdd");
        assert_eq!(img.primary_label(Address::new(0x1080)), Some("pInitRtn"));
    }

    #[test]
    fn test_find_with_prefix()
    {
        let mut img = image();
        img.create_label(Address::new(0x1040), "_usrInit", true).unwrap();
        img.create_function(Address::new(0x1080), "_usrRoot").unwrap();

        assert_eq!(find_symbol(&img, "usrInit", None), None);
        assert_eq!(find_symbol(&img, "usrInit", Some("_")), Some(Address::new(0x1040)));
        assert_eq!(find_function(&img, "usrRoot", Some("_")).unwrap().entry, Address::new(0x1080));
        assert!(find_function(&img, "usrClock", Some("_")).is_none());
    }
}
