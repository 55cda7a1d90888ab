//! Network buffer pool walkers (`netBufLib`).
//!
//! A `NET_POOL` embeds a fixed table of `CL_POOL` pointers. Each cluster pool
//! heads a singly linked free chain of `CL_BUF`s. The pool also points at an
//! `M_STAT` statistics block and a `POOL_FUNC` table of routine pointers.

use std::collections::HashSet;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::space::{AddressSpace, create_struct, define_function, read_nullable_pointer};
use crate::types::{Address, ClPoolInfo, PoolFunction, PoolInfo};

/// Type every buffer on the free chain starting at `start`.
///
/// Stops at a null or unmapped link, when the chain comes back to `start`
/// or to any buffer already typed, and after
/// [`AnalysisConfig::max_chain_len`] buffers. Returns the buffers in visit
/// order; each appears once.
///
/// ## Errors
///
/// `UnsupportedVersion` when no kernel layout is known for the version.
pub fn fix_cl_buff_chain<S>(space: &mut S, start: Address, config: &AnalysisConfig) -> Result<Vec<Address>>
where
    S: AddressSpace + ?Sized,
{
    let layout = &config.version.kernel_layout()?.cl_buff;
    let mut chain = Vec::new();
    if start.is_null() {
        return Ok(chain);
    }

    let mut visited = HashSet::new();
    let mut current = start;
    loop {
        if !space.in_address_space(current) {
            debug!(%current, "cluster buffer chain leaves the address space");
            break;
        }
        if chain.len() >= config.max_chain_len {
            warn!(%start, limit = config.max_chain_len, "cluster buffer chain too long");
            break;
        }
        if !visited.insert(current) {
            debug!(%start, %current, "cluster buffer chain loops");
            break;
        }
        if let Err(err) = create_struct(space, current, layout.record) {
            warn!(%current, error = %err, "cluster buffer chain ends at an untypable buffer");
            break;
        }
        chain.push(current);

        let next = match read_nullable_pointer(space, current + layout.next_offset) {
            Ok(next) => next,
            Err(err) => {
                debug!(%current, error = %err, "can't read next cluster buffer");
                break;
            }
        };
        if next.is_null() || next == start {
            break;
        }
        current = next;
    }

    Ok(chain)
}

/// Type the `CL_POOL` at `address` and walk its free chain.
///
/// Returns `None` for a null or unmapped pool pointer.
pub fn fix_clpool<S>(space: &mut S, address: Address, config: &AnalysisConfig) -> Result<Option<ClPoolInfo>>
where
    S: AddressSpace + ?Sized,
{
    let layout = &config.version.kernel_layout()?.cl_pool;
    if address.is_null() || !space.in_address_space(address) {
        return Ok(None);
    }

    create_struct(space, address, layout.record)?;
    let cl_head_addr = read_nullable_pointer(space, address + layout.head_offset)?;
    let mut info = ClPoolInfo {
        cl_pool_addr: address,
        cl_pool_size: space.read_u32(address + layout.size_offset)?,
        cl_pool_num: space.read_u32(address + layout.num_offset)?,
        cl_pool_num_free: space.read_u32(address + layout.num_free_offset)?,
        cl_pool_usage: space.read_u32(address + layout.usage_offset)?,
        cl_head_addr,
        buffers: Vec::new(),
    };
    info.buffers = fix_cl_buff_chain(space, cl_head_addr, config)?;

    debug!(
        pool = %address,
        size = info.cl_pool_size,
        num = info.cl_pool_num,
        free = info.cl_pool_num_free,
        buffers = info.buffers.len(),
        "fixed cluster pool"
    );
    Ok(Some(info))
}

/// Type the `POOL_FUNC` table at `address` and define a function for every
/// slot pointing into the address space, named after the slot.
pub fn fix_pool_func_tbl<S>(space: &mut S, address: Address, config: &AnalysisConfig) -> Result<Vec<PoolFunction>>
where
    S: AddressSpace + ?Sized,
{
    let layout = &config.version.kernel_layout()?.pool_func;
    let mut functions = Vec::new();
    if address.is_null() || !space.in_address_space(address) {
        debug!(%address, "no pool function table");
        return Ok(functions);
    }

    create_struct(space, address, layout.record)?;
    for (slot, name) in (0u64..).zip(layout.slots.iter().copied()) {
        let func_addr = read_nullable_pointer(space, address + slot * 4)?;
        if func_addr.is_null() || !space.in_address_space(func_addr) {
            continue;
        }
        let created = define_function(space, func_addr, name)?.is_some();
        functions.push(PoolFunction {
            name,
            address: func_addr,
            created,
        });
    }

    Ok(functions)
}

/// Recover a `NET_POOL` and everything reachable from it.
///
/// ## Errors
///
/// - `UnsupportedVersion` for VxWorks 6 and 7
/// - `OutOfBounds` when the pool descriptor itself is not readable
pub fn fix_netpool<S>(space: &mut S, address: Address, config: &AnalysisConfig) -> Result<PoolInfo>
where
    S: AddressSpace + ?Sized,
{
    let kernel = config.version.kernel_layout()?;
    let layout = &kernel.net_pool;

    create_struct(space, address, layout.record)?;

    let pool_table_addr = address + layout.cl_table_offset;
    info!(%pool_table_addr, "found ClPool table");
    let pool_status_addr = read_nullable_pointer(space, address + layout.pool_stat_offset)?;
    info!(%pool_status_addr, "found PoolStat");
    let pool_func_tbl_addr = read_nullable_pointer(space, address + layout.func_tbl_offset)?;
    info!(%pool_func_tbl_addr, "found pFuncTbl");

    let mut cl_pool_info = SmallVec::new();
    for index in 0..layout.cl_table_len {
        let cl_pool_addr = read_nullable_pointer(space, pool_table_addr + index * 4)?;
        if let Some(pool) = fix_clpool(space, cl_pool_addr, config)? {
            cl_pool_info.push(pool);
        }
    }

    if !pool_status_addr.is_null() {
        create_struct(space, pool_status_addr, kernel.pool_stat)?;
    }
    let pool_functions = fix_pool_func_tbl(space, pool_func_tbl_addr, config)?;

    info!(
        pool = %address,
        cl_pools = cl_pool_info.len(),
        functions = pool_functions.len(),
        "fixed net pool"
    );
    Ok(PoolInfo {
        pool_addr: address,
        pool_table_addr,
        pool_status_addr,
        pool_func_tbl_addr,
        cl_pool_info,
        pool_functions,
    })
}
