//! # Firmware Image
//!
//! An in-memory program database implementing [`AddressSpace`].
//!
//! It is what the `vxsym` command line tool annotates, and what the tests use
//! in place of a disassembler. The model is deliberately small:
//!
//! - **Memory blocks** hold the raw bytes at a load address.
//! - **Data items** are typed structures, arrays and strings. They never
//!   overlap; placing one over another fails with `DataConflict`.
//! - **Instructions** only mark where code starts. No decoding happens.
//! - **Functions**, **labels** and **plate comments** are keyed by address.
//!
//! ## Example
//!
//! ```rust
//! use vxsym_core::image::FirmwareImage;
//! use vxsym_core::space::AddressSpace;
//! use vxsym_core::types::{Address, Endian};
//!
//! let mut image = FirmwareImage::new(Endian::Big);
//! image.create_memory_block("ram", Address::new(0x1000), &[0, 0, 0, 42], true)?;
//! assert_eq!(image.read_u32(Address::new(0x1000))?, 42);
//! # Ok::<(), vxsym_core::error::VxError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, VxError};
use crate::layout::RecordLayout;
use crate::space::{AddressSpace, DataUnit, Function, MemoryBlock};
use crate::types::{Address, Endian};

/// What a data item holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKind
{
    /// One structure of the named layout.
    Struct(&'static str),
    /// `count` consecutive structures of the named layout.
    Array
    {
        element: &'static str,
        count: u64,
    },
    /// NUL terminated ASCII string (value without the terminator).
    Ascii(String),
}

/// A data item in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem
{
    pub kind: DataKind,
    pub len: u64,
}

/// A label attached to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label
{
    pub name: String,
    pub primary: bool,
}

#[derive(Debug)]
struct Block
{
    name: String,
    start: Address,
    bytes: Vec<u8>,
    initialized: bool,
}

impl Block
{
    fn end(&self) -> Address
    {
        self.start + self.bytes.len() as u64
    }

    fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end()
    }
}

/// In-memory firmware image and annotation database.
#[derive(Debug, Default)]
pub struct FirmwareImage
{
    endian: Endian,
    blocks: Vec<Block>,
    data: BTreeMap<Address, DataItem>,
    instructions: BTreeSet<Address>,
    functions: BTreeMap<Address, String>,
    labels: BTreeMap<Address, Vec<Label>>,
    comments: BTreeMap<Address, String>,
}

impl FirmwareImage
{
    /// Create an empty image with no memory mapped.
    pub fn new(endian: Endian) -> Self
    {
        Self {
            endian,
            ..Self::default()
        }
    }

    /// Create an image with `bytes` mapped at `base` as block `name`.
    pub fn from_bytes(name: &str, base: Address, bytes: &[u8], endian: Endian) -> Result<Self>
    {
        let mut image = Self::new(endian);
        image.create_memory_block(name, base, bytes, true)?;
        Ok(image)
    }

    /// Read a raw firmware file and map it at `base`.
    ///
    /// ## Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `InvalidArgument` if the file is empty
    pub fn load(path: &Path, base: Address, endian: Endian) -> Result<Self>
    {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Err(VxError::InvalidArgument(format!("{} is empty", path.display())));
        }
        info!(path = %path.display(), %base, len = bytes.len(), %endian, "loaded firmware image");
        let name = path.file_name().map_or_else(|| "firmware".to_string(), |n| n.to_string_lossy().into_owned());
        Self::from_bytes(&name, base, &bytes, endian)
    }

    /// Byte order of the image.
    pub fn endian(&self) -> Endian
    {
        self.endian
    }

    /// Data item starting exactly at `address`.
    pub fn data_at(&self, address: Address) -> Option<&DataItem>
    {
        self.data.get(&address)
    }

    /// Every data item, in address order.
    pub fn data_items(&self) -> impl Iterator<Item = (Address, &DataItem)>
    {
        self.data.iter().map(|(a, d)| (*a, d))
    }

    /// Labels at `address` (empty if none).
    pub fn labels_at(&self, address: Address) -> &[Label]
    {
        self.labels.get(&address).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every labelled address with its labels, in address order.
    pub fn labels(&self) -> impl Iterator<Item = (Address, &[Label])>
    {
        self.labels.iter().map(|(a, l)| (*a, l.as_slice()))
    }

    /// The primary label at `address`.
    pub fn primary_label(&self, address: Address) -> Option<&str>
    {
        self.labels_at(address).iter().find(|l| l.primary).map(|l| l.name.as_str())
    }

    /// Every function, in address order.
    pub fn functions(&self) -> impl Iterator<Item = Function> + '_
    {
        self.functions.iter().map(|(entry, name)| Function {
            entry: *entry,
            name: name.clone(),
        })
    }

    pub fn function_count(&self) -> usize
    {
        self.functions.len()
    }

    pub fn plate_comment(&self, address: Address) -> Option<&str>
    {
        self.comments.get(&address).map(String::as_str)
    }

    fn block(&self, address: Address) -> Option<&Block>
    {
        self.blocks.iter().find(|b| b.contains(address))
    }

    /// Borrow `len` bytes at `address`; the span must sit inside one block.
    fn bytes(&self, address: Address, len: u64) -> Result<&[u8]>
    {
        let out_of_bounds = || VxError::OutOfBounds { address, len };
        let block = self.block(address).ok_or_else(out_of_bounds)?;
        let start = usize::try_from(address.value() - block.start.value()).map_err(|_| out_of_bounds())?;
        let end = start
            .checked_add(usize::try_from(len).map_err(|_| out_of_bounds())?)
            .ok_or_else(out_of_bounds)?;
        block.bytes.get(start..end).ok_or_else(out_of_bounds)
    }

    /// Data item whose span contains `address`.
    fn data_containing(&self, address: Address) -> Option<(Address, &DataItem)>
    {
        self.data
            .range(..=address)
            .next_back()
            .filter(|(start, item)| address.value() < start.value() + item.len)
            .map(|(start, item)| (*start, item))
    }

    /// First data item overlapping `[start, start + len)`.
    ///
    /// Items never overlap each other, so only the last item starting
    /// before the span end can reach into it.
    fn data_overlapping(&self, start: Address, len: u64) -> Option<(Address, &DataItem)>
    {
        let end = start + len;
        self.data
            .range(..end)
            .next_back()
            .filter(|(at, item)| at.value() + item.len > start.value())
            .map(|(at, item)| (*at, item))
    }

    fn place(&mut self, address: Address, item: DataItem) -> Result<()>
    {
        self.bytes(address, item.len)?;
        if let Some((at, existing)) = self.data_overlapping(address, item.len) {
            return Err(VxError::DataConflict {
                address,
                reason: format!("{:?} already defined at {at}", existing.kind),
            });
        }
        self.data.insert(address, item);
        Ok(())
    }
}

impl AddressSpace for FirmwareImage
{
    fn read_u8(&self, address: Address) -> Result<u8>
    {
        Ok(self.bytes(address, 1)?[0])
    }

    fn read_u16(&self, address: Address) -> Result<u16>
    {
        Ok(self.endian.read_u16(self.bytes(address, 2)?))
    }

    fn read_u32(&self, address: Address) -> Result<u32>
    {
        Ok(self.endian.read_u32(self.bytes(address, 4)?))
    }

    fn in_address_space(&self, address: Address) -> bool
    {
        self.block(address).is_some()
    }

    fn data_exists_at(&self, address: Address) -> bool
    {
        self.data_containing(address).is_some()
    }

    fn remove_data_at(&mut self, address: Address) -> Result<()>
    {
        if let Some((start, _)) = self.data_containing(address) {
            self.data.remove(&start);
        }
        Ok(())
    }

    fn instruction_exists_at(&self, address: Address) -> bool
    {
        self.instructions.contains(&address)
    }

    fn remove_instruction_at(&mut self, address: Address) -> Result<()>
    {
        self.instructions.remove(&address);
        Ok(())
    }

    fn create_typed_data(&mut self, address: Address, layout: &'static RecordLayout) -> Result<DataUnit>
    {
        self.place(
            address,
            DataItem {
                kind: DataKind::Struct(layout.name),
                len: layout.size,
            },
        )?;
        Ok(DataUnit {
            address,
            type_name: layout.name.to_string(),
            len: layout.size,
        })
    }

    fn create_typed_array(&mut self, address: Address, layout: &'static RecordLayout, count: u64) -> Result<DataUnit>
    {
        let len = layout
            .size
            .checked_mul(count)
            .ok_or_else(|| VxError::InvalidArgument(format!("array of {count} {} overflows", layout.name)))?;
        self.place(
            address,
            DataItem {
                kind: DataKind::Array {
                    element: layout.name,
                    count,
                },
                len,
            },
        )?;
        Ok(DataUnit {
            address,
            type_name: format!("{}[{count}]", layout.name),
            len,
        })
    }

    fn create_ascii_string(&mut self, address: Address) -> Result<String>
    {
        let block = self.block(address).ok_or(VxError::OutOfBounds { address, len: 1 })?;
        let tail = self.bytes(address, block.end().value() - address.value())?;
        let text_len = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
        let value = String::from_utf8_lossy(&tail[..text_len]).into_owned();
        // Include the terminator when there is one.
        let len = (text_len + usize::from(text_len < tail.len())) as u64;
        self.place(
            address,
            DataItem {
                kind: DataKind::Ascii(value.clone()),
                len,
            },
        )?;
        Ok(value)
    }

    fn string_at(&self, address: Address) -> Option<String>
    {
        match &self.data.get(&address)?.kind {
            DataKind::Ascii(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn clear_listing(&mut self, start: Address, end: Address) -> Result<()>
    {
        if end < start {
            return Err(VxError::InvalidArgument(format!("clear range {start}..{end} is reversed")));
        }
        let doomed: Vec<Address> = self
            .data
            .range(..end)
            .filter(|(at, item)| at.value() + item.len > start.value())
            .map(|(at, _)| *at)
            .collect();
        for at in doomed {
            self.data.remove(&at);
        }
        let code: Vec<Address> = self.instructions.range(start..end).copied().collect();
        for at in code {
            self.instructions.remove(&at);
        }
        debug!(%start, %end, "cleared listing");
        Ok(())
    }

    fn disassemble(&mut self, address: Address) -> Result<()>
    {
        let block = self.block(address).ok_or(VxError::OutOfBounds { address, len: 1 })?;
        if !block.initialized {
            debug!(%address, "not disassembling uninitialized memory");
            return Ok(());
        }
        if self.data_exists_at(address) {
            debug!(%address, "not disassembling over defined data");
            return Ok(());
        }
        self.instructions.insert(address);
        Ok(())
    }

    fn create_function(&mut self, address: Address, name: &str) -> Result<Option<Function>>
    {
        if !self.in_address_space(address) {
            return Err(VxError::OutOfBounds { address, len: 1 });
        }
        if self.functions.contains_key(&address) || self.data_exists_at(address) {
            return Ok(None);
        }
        self.instructions.insert(address);
        self.functions.insert(address, name.to_string());
        Ok(Some(Function {
            entry: address,
            name: name.to_string(),
        }))
    }

    fn rename_function(&mut self, function: &Function, name: &str) -> Result<()>
    {
        let slot = self
            .functions
            .get_mut(&function.entry)
            .ok_or_else(|| VxError::NotFound(format!("function at {}", function.entry)))?;
        *slot = name.to_string();
        Ok(())
    }

    fn create_label(&mut self, address: Address, name: &str, primary: bool) -> Result<()>
    {
        if name.is_empty() {
            return Err(VxError::InvalidArgument(format!("empty label at {address}")));
        }
        let labels = self.labels.entry(address).or_default();
        if primary {
            for label in labels.iter_mut() {
                label.primary = false;
            }
        }
        match labels.iter().position(|l| l.name == name) {
            Some(index) => labels[index].primary |= primary,
            None => {
                let first = labels.is_empty();
                labels.push(Label {
                    name: name.to_string(),
                    primary: primary || first,
                });
            }
        }
        Ok(())
    }

    fn set_plate_comment(&mut self, address: Address, text: &str) -> Result<()>
    {
        if !self.in_address_space(address) {
            return Err(VxError::OutOfBounds { address, len: 1 });
        }
        self.comments.insert(address, text.to_string());
        Ok(())
    }

    fn function_at(&self, address: Address) -> Option<Function>
    {
        self.functions.get(&address).map(|name| Function {
            entry: address,
            name: name.clone(),
        })
    }

    fn function_named(&self, name: &str) -> Option<Function>
    {
        self.functions.iter().find(|(_, n)| n.as_str() == name).map(|(entry, n)| Function {
            entry: *entry,
            name: n.clone(),
        })
    }

    fn symbol(&self, name: &str) -> Option<Address>
    {
        self.labels
            .iter()
            .find(|(_, labels)| labels.iter().any(|l| l.name == name))
            .map(|(address, _)| *address)
            .or_else(|| self.function_named(name).map(|f| f.entry))
    }

    fn create_memory_block(&mut self, name: &str, address: Address, bytes: &[u8], initialized: bool) -> Result<()>
    {
        if bytes.is_empty() {
            return Err(VxError::InvalidArgument(format!("memory block {name} is empty")));
        }
        let end = address
            .checked_add(bytes.len() as u64)
            .ok_or(VxError::OutOfBounds {
                address,
                len: bytes.len() as u64,
            })?;
        if let Some(existing) = self.blocks.iter().find(|b| b.start < end && address < b.end()) {
            return Err(VxError::DataConflict {
                address,
                reason: format!("overlaps memory block {}", existing.name),
            });
        }
        let contents = if initialized { bytes.to_vec() } else { vec![0; bytes.len()] };
        debug!(name, %address, len = bytes.len(), initialized, "created memory block");
        self.blocks.push(Block {
            name: name.to_string(),
            start: address,
            bytes: contents,
            initialized,
        });
        self.blocks.sort_by_key(|b| b.start);
        Ok(())
    }

    fn memory_block(&self, address: Address) -> Option<MemoryBlock>
    {
        self.block(address).map(|b| MemoryBlock {
            name: b.name.clone(),
            start: b.start,
            len: b.bytes.len() as u64,
            initialized: b.initialized,
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::layout::VX5_CL_POOL;

    fn image() -> FirmwareImage
    {
        let mut bytes = vec![0u8; 0x100];
        bytes[0x10..0x16].copy_from_slice(b"hello\0");
        bytes[0x20..0x24].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        FirmwareImage::from_bytes("ram", Address::new(0x1000), &bytes, Endian::Big).unwrap()
    }

    #[test]
    fn test_reads_respect_endianness_and_bounds()
    {
        let img = image();
        assert_eq!(img.read_u32(Address::new(0x1020)).unwrap(), 0x1234_5678);
        assert_eq!(img.read_u16(Address::new(0x1022)).unwrap(), 0x5678);
        assert!(matches!(img.read_u32(Address::new(0x10fe)), Err(VxError::OutOfBounds { .. })));
        assert!(img.read_u8(Address::new(0x0fff)).is_err());
    }

    #[test]
    fn test_ascii_string_includes_terminator()
    {
        let mut img = image();
        let value = img.create_ascii_string(Address::new(0x1010)).unwrap();
        assert_eq!(value, "hello");
        assert_eq!(img.data_at(Address::new(0x1010)).unwrap().len, 6);
        assert!(img.data_exists_at(Address::new(0x1015)));
        assert!(!img.data_exists_at(Address::new(0x1016)));
        assert_eq!(img.string_at(Address::new(0x1010)).as_deref(), Some("hello"));
    }

    #[test]
    fn test_overlapping_data_conflicts()
    {
        let mut img = image();
        img.create_typed_data(Address::new(0x1040), &VX5_CL_POOL).unwrap();
        let err = img.create_typed_data(Address::new(0x1050), &VX5_CL_POOL).unwrap_err();
        assert!(matches!(err, VxError::DataConflict { .. }));

        img.remove_data_at(Address::new(0x1050)).unwrap();
        assert!(img.create_typed_data(Address::new(0x1050), &VX5_CL_POOL).is_ok());
    }

    #[test]
    fn test_function_conflict_returns_none()
    {
        let mut img = image();
        assert!(img.create_function(Address::new(0x1080), "a").unwrap().is_some());
        assert!(img.create_function(Address::new(0x1080), "b").unwrap().is_none());
        assert_eq!(img.function_at(Address::new(0x1080)).unwrap().name, "a");
    }

    #[test]
    fn test_primary_label_moves()
    {
        let mut img = image();
        let at = Address::new(0x1000);
        img.create_label(at, "first", true).unwrap();
        img.create_label(at, "second", true).unwrap();
        img.create_label(at, "first", false).unwrap();
        assert_eq!(img.labels_at(at).len(), 2);
        assert_eq!(img.primary_label(at), Some("second"));
        assert_eq!(img.symbol("first"), Some(at));
    }

    #[test]
    fn test_clear_listing_removes_overlapping_items()
    {
        let mut img = image();
        img.create_typed_data(Address::new(0x1040), &VX5_CL_POOL).unwrap();
        img.disassemble(Address::new(0x1090)).unwrap();
        img.clear_listing(Address::new(0x1050), Address::new(0x10a0)).unwrap();
        assert!(!img.data_exists_at(Address::new(0x1040)));
        assert!(!img.instruction_exists_at(Address::new(0x1090)));
    }

    #[test]
    fn test_memory_blocks_do_not_overlap()
    {
        let mut img = image();
        assert!(img.create_memory_block("dup", Address::new(0x10f0), &[0; 0x20], true).is_err());
        img.create_memory_block("high", Address::new(0x2000), &[1; 4], false).unwrap();
        let block = img.memory_block(Address::new(0x2002)).unwrap();
        assert_eq!(block.name, "high");
        assert!(!block.initialized);
        assert_eq!(img.read_u8(Address::new(0x2000)).unwrap(), 0);
    }
}
