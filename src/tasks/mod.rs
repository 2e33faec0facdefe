//! Tasks: the records moved through the shared queue.
//!
//! Only [`BoxTaskFuture`] and [`TaskState`] are public; tasks themselves are
//! created through a daemon's [`DaemonContext`](crate::DaemonContext).

mod task;

pub use task::{BoxTaskFuture, TaskState};
pub(crate) use task::{SystemAction, Task};
