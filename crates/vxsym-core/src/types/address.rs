//! Firmware address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address inside a firmware image
///
/// VxWorks targets covered here are 32-bit, so every pointer read out of a
/// record is a `u32`. The wrapper still stores a `u64` so that host address
/// spaces with wider offsets (and arithmetic that crosses the 4 GiB line
/// while probing) do not silently truncate.
///
/// ## Example
///
/// ```rust
/// use vxsym_core::types::Address;
///
/// let addr = Address::from(0x1000u32);
/// let next_addr = addr + 0x10; // Add offset
/// assert_eq!(next_addr.value(), 0x1010);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// VxWorks uses a zero pointer to terminate symbol chains and to mark
    /// unused cluster pool slots.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// ```rust
    /// use vxsym_core::types::Address;
    ///
    /// const LOAD_BASE: Address = Address::new(0x1000_0000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null pointer.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use vxsym_core::types::Address;
    ///
    /// let addr = Address::from(0x1000u32);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100u32)));
    /// assert_eq!(addr.checked_add(u64::MAX), None); // Overflow
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Distance in bytes from `base` to this address, if `base` is not above it.
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<u32> for Address
{
    fn from(value: u32) -> Self
    {
        Address(u64::from(value))
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
