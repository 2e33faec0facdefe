//! Error types used by the daemonvisor runtime, its tasks and its backends.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`] errors raised at the daemon-facing surface of the runtime
//!   (registration, enqueueing, missing collaborators).
//! - [`TaskError`] the outcome of a failed task action, including panics captured by the worker.
//! - [`BackendError`] transport failures reported by message backends.
//!
//! `RuntimeError` and `TaskError` provide `as_label` for logs/metrics.

use thiserror::Error;

/// # Errors produced by the daemonvisor runtime.
///
/// Configuration errors (missing publisher/subscriber, unregistered daemon) are
/// surfaced immediately at the call site and are fatal only to that code path.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The daemon's base state has not been wired by [`Supervisor::register`](crate::Supervisor::register).
    #[error("daemon is not registered with a supervisor")]
    NotRegistered,

    /// The daemon was already registered; base state is wired exactly once.
    #[error("daemon {name:?} is already registered")]
    AlreadyRegistered {
        /// Display name of the daemon.
        name: String,
    },

    /// Another daemon with the same display name is registered.
    #[error("a daemon named {name:?} is already registered")]
    DuplicateDaemon {
        /// Conflicting display name.
        name: String,
    },

    /// The supervisor has been stopped and accepts no new daemons.
    #[error("supervisor is stopped")]
    Stopped,

    /// The shared task queue is closed; the task was not enqueued.
    #[error("task queue is closed")]
    QueueClosed,

    /// `subscribe` was called but no message subscriber is configured.
    #[error("subscriber is not set up")]
    MissingSubscriber,

    /// `publish` was called but no publisher is configured.
    #[error("publisher is not set up")]
    MissingPublisher,

    /// The message backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// OS signal listeners could not be installed.
    #[error("signal handling failed: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::QueueClosed.as_label(), "runtime_queue_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NotRegistered => "runtime_not_registered",
            RuntimeError::AlreadyRegistered { .. } => "runtime_already_registered",
            RuntimeError::DuplicateDaemon { .. } => "runtime_duplicate_daemon",
            RuntimeError::Stopped => "runtime_stopped",
            RuntimeError::QueueClosed => "runtime_queue_closed",
            RuntimeError::MissingSubscriber => "runtime_missing_subscriber",
            RuntimeError::MissingPublisher => "runtime_missing_publisher",
            RuntimeError::Backend(_) => "runtime_backend",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Errors produced by task execution.
///
/// A task action resolves to `Result<(), TaskError>`. Panics raised inside the
/// action are captured by the worker and surface here as [`TaskError::Panicked`],
/// so the worker never relies on unwinding to decide what happens next.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// Task failed but may succeed if run again.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; a system task returning it is not restarted.
    #[error("fatal error (no restart): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The action panicked; `message` is the captured panic payload.
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// Task observed shutdown and stopped early. Treated as a graceful completion.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::TaskError;
    ///
    /// let err = TaskError::Panicked { message: "boom".into() };
    /// assert_eq!(err.as_label(), "task_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether a system task failing with this error is restarted.
    ///
    /// Returns `true` for [`TaskError::Fail`] and [`TaskError::Panicked`].
    ///
    /// # Example
    /// ```
    /// use daemonvisor::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. } | TaskError::Panicked { .. })
    }

    /// Returns the panic message if this error was produced by a panic.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            TaskError::Panicked { message } => Some(message),
            _ => None,
        }
    }
}

impl From<RuntimeError> for TaskError {
    fn from(err: RuntimeError) -> Self {
        TaskError::Fail {
            error: err.to_string(),
        }
    }
}

/// Transport failure reported by a message backend.
#[derive(Error, Debug, Clone)]
#[error("{backend}: {message}")]
pub struct BackendError {
    /// Backend identifier (e.g. `"memory"`).
    pub backend: &'static str,
    /// Human-readable failure description.
    pub message: String,
}

impl BackendError {
    /// Creates a new backend error.
    pub fn new(backend: &'static str, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
        }
    }
}
