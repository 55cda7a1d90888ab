//! Task control block (`WIND_TCB`) recovery.

use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::space::{AddressSpace, create_struct, read_nullable_pointer};
use crate::types::{Address, TcbInfo};

/// Task name at `address`: an existing string item, or a new one when the
/// pointer lands on untyped memory.
fn read_task_name<S>(space: &mut S, address: Address) -> Option<String>
where
    S: AddressSpace + ?Sized,
{
    if address.is_null() || !space.in_address_space(address) {
        return None;
    }
    if let Some(name) = space.string_at(address) {
        return Some(name);
    }
    if space.data_exists_at(address) {
        return None;
    }
    match space.create_ascii_string(address) {
        Ok(name) if !name.is_empty() => Some(name),
        Ok(_) => None,
        Err(err) => {
            debug!(%address, error = %err, "can't create task name string");
            None
        }
    }
}

/// Type the TCB at `address` and read its identity and stack bounds.
///
/// The entry point is reported by name when a function is already defined
/// there (run the symbol walk first for useful names).
///
/// ## Errors
///
/// - `UnsupportedVersion` for VxWorks 6 and 7
/// - `OutOfBounds` when the TCB is not readable
pub fn fix_tcb<S>(space: &mut S, address: Address, config: &AnalysisConfig) -> Result<TcbInfo>
where
    S: AddressSpace + ?Sized,
{
    let layout = &config.version.kernel_layout()?.tcb;

    create_struct(space, address, layout.record)?;

    let task_name_addr = read_nullable_pointer(space, address + layout.name_offset)?;
    let task_entry_addr = read_nullable_pointer(space, address + layout.entry_offset)?;
    let task_stack_base = read_nullable_pointer(space, address + layout.stack_base_offset)?;
    let task_stack_limit = read_nullable_pointer(space, address + layout.stack_limit_offset)?;
    let task_stack_limit_end = read_nullable_pointer(space, address + layout.stack_end_offset)?;

    let task_name = read_task_name(space, task_name_addr);
    info!(tcb = %address, task_name = ?task_name, "task name");
    let task_entry_name = space.function_at(task_entry_addr).map(|f| f.name);
    info!(%task_entry_addr, task_entry_name = ?task_entry_name, "task entry");
    info!(%task_stack_base, %task_stack_limit, %task_stack_limit_end, "task stack");

    Ok(TcbInfo {
        tcb_addr: address,
        task_name,
        task_name_addr,
        task_entry_addr,
        task_entry_name,
        task_stack_base,
        task_stack_limit,
        task_stack_limit_end,
    })
}
