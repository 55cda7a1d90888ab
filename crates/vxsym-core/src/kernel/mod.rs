//! # Kernel Object Walkers
//!
//! Recover VxWorks kernel structures from pointers found elsewhere (a symbol
//! such as `_pNetDpool`, a task list, a hint from the user).
//!
//! Every walker resolves its layouts through
//! [`VxVersion::kernel_layout`](crate::layout::VxVersion::kernel_layout)
//! first, so VxWorks 6 and 7 fail with
//! [`VxError::UnsupportedVersion`](crate::error::VxError::UnsupportedVersion)
//! before anything is read or typed.
//!
//! Walkers only type data and define functions or labels. Running one twice
//! over the same region re-types it and ends in the same state.

pub mod pool;
pub mod tcb;

pub use pool::{fix_cl_buff_chain, fix_clpool, fix_netpool, fix_pool_func_tbl};
pub use tcb::fix_tcb;
