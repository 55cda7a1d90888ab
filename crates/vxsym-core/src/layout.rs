//! # Layout Catalog
//!
//! Static record layouts for the VxWorks structures this crate understands.
//!
//! A [`VxVersion`] is chosen once per invocation and every offset used by the
//! walkers comes from the tables it selects, so a symbol-table stride of one
//! version can never be combined with field offsets of another.
//!
//! ## Symbol table entries
//!
//! | Version | Stride | Type byte |
//! |---------|--------|-----------|
//! | 5       | 0x10   | 0x0e      |
//! | 6       | 0x14   | 0x12      |
//! | 7       | 0x28   | 0x26      |
//!
//! All three start with the same three words: hash-chain link, name pointer,
//! value.
//!
//! ## Kernel objects
//!
//! Only the VxWorks 5 network buffer library (`netBufLib`) and `WIND_TCB`
//! layouts are known. [`VxVersion::kernel_layout`] returns
//! [`VxError::UnsupportedVersion`] for 6 and 7.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, VxError};

/// Primitive type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind
{
    U8,
    U16,
    U32,
    /// 32-bit pointer to data.
    Pointer,
    /// 32-bit pointer to a NUL terminated string.
    CharPointer,
    /// 32-bit pointer to code.
    FuncPointer,
    /// Opaque bytes (nested structures, padding, inline arrays).
    Bytes(u64),
}

impl FieldKind
{
    /// Size of the field in bytes.
    pub const fn size(self) -> u64
    {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 | FieldKind::Pointer | FieldKind::CharPointer | FieldKind::FuncPointer => 4,
            FieldKind::Bytes(len) => len,
        }
    }
}

/// A named field at a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field
{
    pub name: &'static str,
    pub offset: u64,
    pub kind: FieldKind,
}

const fn field(name: &'static str, offset: u64, kind: FieldKind) -> Field
{
    Field { name, offset, kind }
}

/// Description of a fixed-size structure, handed to
/// [`AddressSpace::create_typed_data`](crate::space::AddressSpace::create_typed_data).
#[derive(Debug, PartialEq, Eq)]
pub struct RecordLayout
{
    /// Structure name as it appears in the listing.
    pub name: &'static str,
    /// Total size in bytes.
    pub size: u64,
    pub fields: &'static [Field],
}

impl RecordLayout
{
    /// Look a field up by name.
    pub fn field(&self, name: &str) -> Option<&Field>
    {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Symbol table entries
// ---------------------------------------------------------------------------

pub static VX5_SYMBOL: RecordLayout = RecordLayout {
    name: "VX_5_SYMBOL_IN_TBL",
    size: 0x10,
    fields: &[
        field("symHashNode", 0x00, FieldKind::Pointer),
        field("symNamePtr", 0x04, FieldKind::CharPointer),
        field("symPrt", 0x08, FieldKind::Pointer),
        field("symGroup", 0x0c, FieldKind::U16),
        field("symType", 0x0e, FieldKind::U8),
        field("End", 0x0f, FieldKind::U8),
    ],
};

pub static VX6_SYMBOL: RecordLayout = RecordLayout {
    name: "VX_6_SYMBOL_IN_TBL",
    size: 0x14,
    fields: &[
        field("symHashNode", 0x00, FieldKind::Pointer),
        field("symNamePtr", 0x04, FieldKind::CharPointer),
        field("symPrt", 0x08, FieldKind::Pointer),
        field("symRef", 0x0c, FieldKind::U32),
        field("symGroup", 0x10, FieldKind::U16),
        field("symType", 0x12, FieldKind::U8),
        field("End", 0x13, FieldKind::U8),
    ],
};

pub static VX7_SYMBOL: RecordLayout = RecordLayout {
    name: "VX_7_SYMBOL_IN_TBL",
    size: 0x28,
    fields: &[
        field("symHashNode", 0x00, FieldKind::Pointer),
        field("symNamePtr", 0x04, FieldKind::CharPointer),
        field("symPrt", 0x08, FieldKind::Pointer),
        field("symSize", 0x0c, FieldKind::U32),
        field("symRef", 0x10, FieldKind::U32),
        field("symGroup", 0x14, FieldKind::U16),
        field("symPad", 0x16, FieldKind::Bytes(0x10)),
        field("symFlags", 0x26, FieldKind::U8),
        field("End", 0x27, FieldKind::U8),
    ],
};

/// Symbol table geometry for one version.
#[derive(Debug)]
pub struct SymbolLayout
{
    /// Interval between consecutive records.
    pub stride: u64,
    pub record: &'static RecordLayout,
    pub prev_offset: u64,
    pub name_offset: u64,
    pub value_offset: u64,
}

impl SymbolLayout
{
    /// Offset of the one-byte type tag, always two bytes before the stride end.
    pub const fn type_offset(&self) -> u64
    {
        self.stride - 2
    }
}

static VX5_SYMBOL_LAYOUT: SymbolLayout = SymbolLayout {
    stride: 0x10,
    record: &VX5_SYMBOL,
    prev_offset: 0x00,
    name_offset: 0x04,
    value_offset: 0x08,
};

static VX6_SYMBOL_LAYOUT: SymbolLayout = SymbolLayout {
    stride: 0x14,
    record: &VX6_SYMBOL,
    prev_offset: 0x00,
    name_offset: 0x04,
    value_offset: 0x08,
};

static VX7_SYMBOL_LAYOUT: SymbolLayout = SymbolLayout {
    stride: 0x28,
    record: &VX7_SYMBOL,
    prev_offset: 0x00,
    name_offset: 0x04,
    value_offset: 0x08,
};

// ---------------------------------------------------------------------------
// VxWorks 5 netBufLib / WIND_TCB
// ---------------------------------------------------------------------------

/// `CL_TBL_SIZE`: one pool per power of two from 64 bytes to 64 KiB.
pub const VX5_CL_TBL_SIZE: u64 = 11;

pub static VX5_NET_POOL: RecordLayout = RecordLayout {
    name: "VX_5_NET_POOL",
    size: 0x58,
    fields: &[
        field("pmBlkHead", 0x00, FieldKind::Pointer),
        field("pClBlkHead", 0x04, FieldKind::Pointer),
        field("mBlkCnt", 0x08, FieldKind::U32),
        field("mBlkFree", 0x0c, FieldKind::U32),
        field("clMask", 0x10, FieldKind::U32),
        field("clLg2Max", 0x14, FieldKind::U32),
        field("clSizeMax", 0x18, FieldKind::U32),
        field("clLg2Min", 0x1c, FieldKind::U32),
        field("clSizeMin", 0x20, FieldKind::U32),
        field("clTbl", 0x24, FieldKind::Bytes(VX5_CL_TBL_SIZE * 4)),
        field("pPoolStat", 0x50, FieldKind::Pointer),
        field("pFuncTbl", 0x54, FieldKind::Pointer),
    ],
};

pub static VX5_CL_POOL: RecordLayout = RecordLayout {
    name: "VX_5_CL_POOL",
    size: 0x1c,
    fields: &[
        field("clSize", 0x00, FieldKind::U32),
        field("clLg2", 0x04, FieldKind::U32),
        field("clNum", 0x08, FieldKind::U32),
        field("clNumFree", 0x0c, FieldKind::U32),
        field("clUsage", 0x10, FieldKind::U32),
        field("pClHead", 0x14, FieldKind::Pointer),
        field("pNetPool", 0x18, FieldKind::Pointer),
    ],
};

pub static VX5_CL_BUFF: RecordLayout = RecordLayout {
    name: "VX_5_CL_BUFF",
    size: 0x04,
    fields: &[field("pClNext", 0x00, FieldKind::Pointer)],
};

/// Slots of `POOL_FUNC`, in table order.
pub const VX5_POOL_FUNC_SLOTS: &[&str] = &[
    "pInitRtn",
    "pMblkFreeRtn",
    "pClBlkFreeRtn",
    "pClFreeRtn",
    "pMblkClFreeRtn",
    "pMblkGetRtn",
    "pClBlkGetRtn",
    "pClGetRtn",
    "pMblkClGetRtn",
    "pClPoolIdGetRtn",
];

pub static VX5_POOL_FUNC_TBL: RecordLayout = RecordLayout {
    name: "VX_5_POOL_FUNC_TBL",
    size: 0x28,
    fields: &[
        field("pInitRtn", 0x00, FieldKind::FuncPointer),
        field("pMblkFreeRtn", 0x04, FieldKind::FuncPointer),
        field("pClBlkFreeRtn", 0x08, FieldKind::FuncPointer),
        field("pClFreeRtn", 0x0c, FieldKind::FuncPointer),
        field("pMblkClFreeRtn", 0x10, FieldKind::FuncPointer),
        field("pMblkGetRtn", 0x14, FieldKind::FuncPointer),
        field("pClBlkGetRtn", 0x18, FieldKind::FuncPointer),
        field("pClGetRtn", 0x1c, FieldKind::FuncPointer),
        field("pMblkClGetRtn", 0x20, FieldKind::FuncPointer),
        field("pClPoolIdGetRtn", 0x24, FieldKind::FuncPointer),
    ],
};

pub static VX5_POOL_STAT: RecordLayout = RecordLayout {
    name: "VX_5_POOL_STAT",
    size: 0x410,
    fields: &[
        field("mNum", 0x00, FieldKind::U32),
        field("mDrops", 0x04, FieldKind::U32),
        field("mWait", 0x08, FieldKind::U32),
        field("mDrain", 0x0c, FieldKind::U32),
        field("mTypes", 0x10, FieldKind::Bytes(0x400)),
    ],
};

/// Leading part of `WIND_TCB` up to the exit code; register save areas that
/// follow are architecture specific and left untyped.
pub static VX5_WIND_TCB: RecordLayout = RecordLayout {
    name: "VX_5_WIND_TCB",
    size: 0x8c,
    fields: &[
        field("qNode", 0x00, FieldKind::Bytes(0x10)),
        field("tickNode", 0x10, FieldKind::Bytes(0x10)),
        field("activeNode", 0x20, FieldKind::Bytes(0x10)),
        field("objCore", 0x30, FieldKind::Pointer),
        field("name", 0x34, FieldKind::CharPointer),
        field("options", 0x38, FieldKind::U32),
        field("status", 0x3c, FieldKind::U32),
        field("priority", 0x40, FieldKind::U32),
        field("priNormal", 0x44, FieldKind::U32),
        field("priMutexCnt", 0x48, FieldKind::U32),
        field("pPriMutex", 0x4c, FieldKind::Pointer),
        field("lockCnt", 0x50, FieldKind::U32),
        field("tslice", 0x54, FieldKind::U32),
        field("swapInMask", 0x58, FieldKind::U16),
        field("swapOutMask", 0x5a, FieldKind::U16),
        field("pPendQ", 0x5c, FieldKind::Pointer),
        field("safeCnt", 0x60, FieldKind::U32),
        field("safetyQHead", 0x64, FieldKind::Bytes(0x10)),
        field("entry", 0x74, FieldKind::FuncPointer),
        field("pStackBase", 0x78, FieldKind::Pointer),
        field("pStackLimit", 0x7c, FieldKind::Pointer),
        field("pStackEnd", 0x80, FieldKind::Pointer),
        field("errorStatus", 0x84, FieldKind::U32),
        field("exitCode", 0x88, FieldKind::U32),
    ],
};

/// `NET_POOL` offsets.
#[derive(Debug)]
pub struct NetPoolLayout
{
    pub record: &'static RecordLayout,
    pub cl_table_offset: u64,
    pub cl_table_len: u64,
    pub pool_stat_offset: u64,
    pub func_tbl_offset: u64,
}

/// `CL_POOL` offsets.
#[derive(Debug)]
pub struct ClPoolLayout
{
    pub record: &'static RecordLayout,
    pub size_offset: u64,
    pub num_offset: u64,
    pub num_free_offset: u64,
    pub usage_offset: u64,
    pub head_offset: u64,
}

/// `CL_BUF` offsets.
#[derive(Debug)]
pub struct ClBuffLayout
{
    pub record: &'static RecordLayout,
    pub next_offset: u64,
}

/// `POOL_FUNC` geometry.
#[derive(Debug)]
pub struct PoolFuncLayout
{
    pub record: &'static RecordLayout,
    /// Canonical slot names; slot `i` is the pointer at `i * 4`.
    pub slots: &'static [&'static str],
}

/// `WIND_TCB` offsets.
#[derive(Debug)]
pub struct TcbLayout
{
    pub record: &'static RecordLayout,
    pub name_offset: u64,
    pub entry_offset: u64,
    pub stack_base_offset: u64,
    pub stack_limit_offset: u64,
    pub stack_end_offset: u64,
}

/// Every kernel object layout for one version.
#[derive(Debug)]
pub struct KernelLayout
{
    pub net_pool: NetPoolLayout,
    pub cl_pool: ClPoolLayout,
    pub cl_buff: ClBuffLayout,
    pub pool_func: PoolFuncLayout,
    pub pool_stat: &'static RecordLayout,
    pub tcb: TcbLayout,
}

static VX5_KERNEL_LAYOUT: KernelLayout = KernelLayout {
    net_pool: NetPoolLayout {
        record: &VX5_NET_POOL,
        cl_table_offset: 0x24,
        cl_table_len: VX5_CL_TBL_SIZE,
        pool_stat_offset: 0x50,
        func_tbl_offset: 0x54,
    },
    cl_pool: ClPoolLayout {
        record: &VX5_CL_POOL,
        size_offset: 0x00,
        num_offset: 0x08,
        num_free_offset: 0x0c,
        usage_offset: 0x10,
        head_offset: 0x14,
    },
    cl_buff: ClBuffLayout {
        record: &VX5_CL_BUFF,
        next_offset: 0x00,
    },
    pool_func: PoolFuncLayout {
        record: &VX5_POOL_FUNC_TBL,
        slots: VX5_POOL_FUNC_SLOTS,
    },
    pool_stat: &VX5_POOL_STAT,
    tcb: TcbLayout {
        record: &VX5_WIND_TCB,
        name_offset: 0x34,
        entry_offset: 0x74,
        stack_base_offset: 0x78,
        stack_limit_offset: 0x7c,
        stack_end_offset: 0x80,
    },
};

/// VxWorks major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VxVersion
{
    #[default]
    V5,
    V6,
    V7,
}

impl VxVersion
{
    /// Major version number.
    pub const fn major(self) -> u8
    {
        match self {
            VxVersion::V5 => 5,
            VxVersion::V6 => 6,
            VxVersion::V7 => 7,
        }
    }

    /// Symbol table geometry.
    pub fn symbol_layout(self) -> &'static SymbolLayout
    {
        match self {
            VxVersion::V5 => &VX5_SYMBOL_LAYOUT,
            VxVersion::V6 => &VX6_SYMBOL_LAYOUT,
            VxVersion::V7 => &VX7_SYMBOL_LAYOUT,
        }
    }

    /// Kernel object layouts.
    ///
    /// ## Errors
    ///
    /// `UnsupportedVersion` for VxWorks 6 and 7, whose layouts are not
    /// catalogued.
    pub fn kernel_layout(self) -> Result<&'static KernelLayout>
    {
        match self {
            VxVersion::V5 => Ok(&VX5_KERNEL_LAYOUT),
            VxVersion::V6 | VxVersion::V7 => Err(VxError::UnsupportedVersion(self.major())),
        }
    }
}

impl TryFrom<u8> for VxVersion
{
    type Error = VxError;

    fn try_from(value: u8) -> Result<Self>
    {
        match value {
            5 => Ok(VxVersion::V5),
            6 => Ok(VxVersion::V6),
            7 => Ok(VxVersion::V7),
            other => Err(VxError::InvalidArgument(format!(
                "VxWorks version must be 5, 6 or 7, got {other}"
            ))),
        }
    }
}

impl FromStr for VxVersion
{
    type Err = VxError;

    fn from_str(s: &str) -> Result<Self>
    {
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let major = trimmed
            .parse::<u8>()
            .map_err(|_| VxError::InvalidArgument(format!("not a VxWorks version: {s}")))?;
        VxVersion::try_from(major)
    }
}

impl fmt::Display for VxVersion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "VxWorks {}", self.major())
    }
}
