//! Records describing recovered kernel objects.

use smallvec::SmallVec;

use super::Address;

/// One cluster pool (`CL_POOL`) and the buffers chained off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClPoolInfo
{
    pub cl_pool_addr: Address,
    /// Cluster size in bytes (`clSize`).
    pub cl_pool_size: u32,
    /// Number of clusters (`clNum`).
    pub cl_pool_num: u32,
    /// Free clusters (`clNumFree`).
    pub cl_pool_num_free: u32,
    /// Allocation counter (`clUsage`).
    pub cl_pool_usage: u32,
    /// First free cluster (`pClHead`).
    pub cl_head_addr: Address,
    /// Every buffer typed while walking the free chain, in visit order.
    pub buffers: Vec<Address>,
}

/// A pool function table slot bound to a code address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolFunction
{
    /// Canonical slot name, used as the function name.
    pub name: &'static str,
    pub address: Address,
    /// Whether a function was created (otherwise only a label was placed).
    pub created: bool,
}

/// A network pool (`NET_POOL`) and everything reachable from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo
{
    pub pool_addr: Address,
    /// Address of the embedded `clTbl` array.
    pub pool_table_addr: Address,
    /// Address of the `M_STAT` record (`pPoolStat`).
    pub pool_status_addr: Address,
    /// Address of the `POOL_FUNC` table (`pFuncTbl`).
    pub pool_func_tbl_addr: Address,
    /// Pools found in `clTbl`; null and unmapped slots are skipped.
    pub cl_pool_info: SmallVec<[ClPoolInfo; 11]>,
    pub pool_functions: Vec<PoolFunction>,
}

/// A task control block (`WIND_TCB`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcbInfo
{
    pub tcb_addr: Address,
    /// Task name, when a string is defined at the name pointer.
    pub task_name: Option<String>,
    pub task_name_addr: Address,
    pub task_entry_addr: Address,
    /// Name of the function at the entry point, if one is defined.
    pub task_entry_name: Option<String>,
    pub task_stack_base: Address,
    pub task_stack_limit: Address,
    pub task_stack_limit_end: Address,
}

impl TcbInfo
{
    /// Stack size implied by the base and end pointers.
    ///
    /// VxWorks stacks usually grow down, so whichever bound is higher is the
    /// base; the absolute difference is reported.
    pub fn stack_size(&self) -> u64
    {
        self.task_stack_base.value().abs_diff(self.task_stack_limit_end.value())
    }
}
