//! Kernel object recovery against an in-memory VxWorks 5 image.

use vxsym_core::config::AnalysisConfig;
use vxsym_core::error::VxError;
use vxsym_core::image::{DataKind, FirmwareImage};
use vxsym_core::kernel::{fix_netpool, fix_tcb};
use vxsym_core::layout::VxVersion;
use vxsym_core::space::AddressSpace;
use vxsym_core::symbols::{ItaniumDemangler, walk};
use vxsym_core::types::{Address, Endian};

const BASE: u64 = 0x2_0000;

fn addr(offset: u64) -> Address
{
    Address::new(BASE + offset)
}

fn image(words: &[(usize, u32)], strings: &[(usize, &str)]) -> FirmwareImage
{
    let mut bytes = vec![0u8; 0x1000];
    for (offset, value) in words {
        bytes[*offset..*offset + 4].copy_from_slice(&value.to_be_bytes());
    }
    for (offset, s) in strings {
        bytes[*offset..*offset + s.len()].copy_from_slice(s.as_bytes());
    }
    FirmwareImage::from_bytes("ram", Address::new(BASE), &bytes, Endian::Big).unwrap()
}

fn struct_name(img: &FirmwareImage, address: Address) -> Option<&'static str>
{
    match img.data_at(address)?.kind {
        DataKind::Struct(name) => Some(name),
        _ => None,
    }
}

/// NET_POOL at 0x000 with two live cluster pools, one null slot and one
/// pointing outside the image.
fn net_pool_image(pool_stat: u32) -> FirmwareImage
{
    image(
        &[
            // clTbl
            (0x24, 0x2_0100),
            (0x28, 0),
            (0x2c, 0x2_0120),
            (0x30, 0x9_0000),
            (0x50, pool_stat),
            (0x54, 0x2_0200),
            // CL_POOL 0x100
            (0x100, 64),
            (0x108, 4),
            (0x10c, 3),
            (0x110, 1),
            (0x114, 0x2_0300),
            // CL_POOL 0x120, empty free list
            (0x120, 128),
            (0x128, 2),
            (0x12c, 0),
            // POOL_FUNC
            (0x200, 0x2_0900),
            (0x20c, 0x2_0910),
            (0x21c, 0x2_0920),
            // Free chain 0x300 -> 0x310 -> 0x320 -> 0x300
            (0x300, 0x2_0310),
            (0x310, 0x2_0320),
            (0x320, 0x2_0300),
        ],
        &[],
    )
}

#[test]
fn test_fix_netpool()
{
    let mut img = net_pool_image(0x2_0400);
    img.create_function(addr(0x920), "netClusterGet").unwrap();

    let pool = fix_netpool(&mut img, addr(0), &AnalysisConfig::default()).unwrap();

    assert_eq!(pool.pool_addr, addr(0));
    assert_eq!(pool.pool_table_addr, addr(0x24));
    assert_eq!(pool.pool_status_addr, addr(0x400));
    assert_eq!(pool.pool_func_tbl_addr, addr(0x200));
    assert_eq!(struct_name(&img, addr(0)), Some("VX_5_NET_POOL"));

    assert_eq!(pool.cl_pool_info.len(), 2);
    let small = &pool.cl_pool_info[0];
    assert_eq!(small.cl_pool_addr, addr(0x100));
    assert_eq!(small.cl_pool_size, 64);
    assert_eq!(small.cl_pool_num, 4);
    assert_eq!(small.cl_pool_num_free, 3);
    assert_eq!(small.cl_pool_usage, 1);
    assert_eq!(small.buffers, vec![addr(0x300), addr(0x310), addr(0x320)]);
    for buffer in &small.buffers {
        assert_eq!(struct_name(&img, *buffer), Some("VX_5_CL_BUFF"));
    }

    let large = &pool.cl_pool_info[1];
    assert_eq!(large.cl_pool_size, 128);
    assert!(large.buffers.is_empty());
    assert_eq!(struct_name(&img, addr(0x120)), Some("VX_5_CL_POOL"));

    // The statistics block is typed where pPoolStat points.
    assert_eq!(struct_name(&img, addr(0x400)), Some("VX_5_POOL_STAT"));
    assert_eq!(struct_name(&img, addr(0x200)), Some("VX_5_POOL_FUNC_TBL"));
}

#[test]
fn test_netpool_functions()
{
    let mut img = net_pool_image(0x2_0400);
    img.create_function(addr(0x920), "netClusterGet").unwrap();

    let pool = fix_netpool(&mut img, addr(0), &AnalysisConfig::default()).unwrap();

    let names: Vec<_> = pool.pool_functions.iter().map(|f| (f.name, f.created)).collect();
    assert_eq!(
        names,
        vec![("pInitRtn", true), ("pClFreeRtn", true), ("pClGetRtn", false)]
    );
    assert_eq!(img.function_at(addr(0x900)).unwrap().name, "pInitRtn");
    assert_eq!(img.function_at(addr(0x910)).unwrap().name, "pClFreeRtn");
    // An existing function keeps its name and gains the slot name as a label.
    assert_eq!(img.function_at(addr(0x920)).unwrap().name, "netClusterGet");
    assert_eq!(img.primary_label(addr(0x920)), Some("pClGetRtn"));
}

#[test]
fn test_netpool_without_stats()
{
    let mut img = net_pool_image(0);
    let pool = fix_netpool(&mut img, addr(0), &AnalysisConfig::default()).unwrap();
    assert!(pool.pool_status_addr.is_null());
    assert!(img.data_at(addr(0x400)).is_none());
}

#[test]
fn test_netpool_chain_cap()
{
    let mut img = net_pool_image(0);
    let config = AnalysisConfig::default().with_max_chain_len(2);
    let pool = fix_netpool(&mut img, addr(0), &config).unwrap();
    assert_eq!(pool.cl_pool_info[0].buffers, vec![addr(0x300), addr(0x310)]);
    assert!(img.data_at(addr(0x320)).is_none());
}

#[test]
fn test_netpool_outside_image()
{
    let mut img = net_pool_image(0);
    let result = fix_netpool(&mut img, Address::new(0x9_0000), &AnalysisConfig::default());
    assert!(matches!(result, Err(VxError::OutOfBounds { .. })));
}

#[test]
fn test_tcb_after_symbol_walk()
{
    // Symbol record at 0x500 names the task entry point.
    let mut img = image(
        &[
            (0x34, 0x2_0100),
            (0x74, 0x2_0800),
            (0x78, 0x2_0c00),
            (0x7c, 0x2_0a00),
            (0x80, 0x2_0a00),
            (0x504, 0x2_0110),
            (0x508, 0x2_0800),
            // Global text tag at 0x50e.
            (0x50c, 0x0000_0500),
        ],
        &[(0x100, "tNetTask"), (0x110, "netTask")],
    );

    let report = walk(&mut img, &ItaniumDemangler::new(), addr(0x500), addr(0x500), &AnalysisConfig::default());
    assert_eq!(report.function_count(), 1);

    let tcb = fix_tcb(&mut img, addr(0), &AnalysisConfig::default()).unwrap();
    assert_eq!(tcb.task_name.as_deref(), Some("tNetTask"));
    assert_eq!(tcb.task_entry_addr, addr(0x800));
    assert_eq!(tcb.task_entry_name.as_deref(), Some("netTask"));
    assert_eq!(tcb.task_stack_base, addr(0xc00));
    assert_eq!(tcb.task_stack_limit, addr(0xa00));
    assert_eq!(tcb.stack_size(), 0x200);
    assert_eq!(struct_name(&img, addr(0)), Some("VX_5_WIND_TCB"));
    assert_eq!(img.string_at(addr(0x100)).as_deref(), Some("tNetTask"));
}

#[test]
fn test_newer_kernels_are_unsupported()
{
    let mut img = net_pool_image(0x2_0400);
    for version in [VxVersion::V6, VxVersion::V7] {
        let config = AnalysisConfig::new(version);
        assert!(matches!(
            fix_netpool(&mut img, addr(0), &config),
            Err(VxError::UnsupportedVersion(v)) if v == version.major()
        ));
        assert!(matches!(
            fix_tcb(&mut img, addr(0), &config),
            Err(VxError::UnsupportedVersion(_))
        ));
    }
    // Nothing was typed.
    assert_eq!(img.data_items().count(), 0);
}
