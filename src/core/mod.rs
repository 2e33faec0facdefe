//! Runtime core: supervisor, worker pool and shutdown protocol.
//!
//! Public API from this module: [`Supervisor`], [`SupervisorBuilder`],
//! [`Config`] and [`Report`].
//!
//! Internal modules:
//! - [`queue`]: shared competing-consumers queue;
//! - [`runtime`]: state shared by workers and daemon contexts (signals, wait-groups, stats);
//! - [`worker`]: worker loop, general/system task protocol, restarts;
//! - [`runner`]: panic isolation for one run;
//! - [`shutdown`]: OS signal handling for `Supervisor::run`.

mod builder;
mod config;
mod queue;
mod report;
mod runner;
mod runtime;
mod shutdown;
mod supervisor;
mod worker;

pub use builder::SupervisorBuilder;
pub use config::{Config, DEFAULT_WORKERS};
pub use report::Report;
pub(crate) use runner::panic_message;
pub(crate) use runtime::Runtime;
pub use supervisor::Supervisor;
