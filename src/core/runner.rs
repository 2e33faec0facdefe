//! # Panic isolation for a single task run.
//!
//! [`run_once`] is the only place where unwinding is caught for task code.
//! A panic becomes [`TaskError::Panicked`] carrying the payload text, plus a
//! backtrace for the diagnostic event, so callers only ever match on values.
//!
//! ```text
//! fut ──► catch_unwind ──► Ok(Ok(()))      → Ok(())
//!                      ├─► Ok(Err(e))      → Err(e)
//!                      └─► Err(payload)    → Err(Panicked { message }) + backtrace
//! ```

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::TaskError;
use crate::tasks::BoxTaskFuture;

/// Result of one run, with a backtrace when the run panicked.
pub(crate) struct Outcome {
    pub(crate) result: Result<(), TaskError>,
    pub(crate) backtrace: Option<String>,
}

pub(crate) async fn run_once(fut: BoxTaskFuture) -> Outcome {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => Outcome {
            result,
            backtrace: None,
        },
        Err(payload) => Outcome {
            result: Err(TaskError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
            backtrace: Some(Backtrace::force_capture().to_string()),
        },
    }
}

/// Renders a panic payload (`&str` or `String`, anything else is opaque).
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn boom() -> Result<(), TaskError> {
        panic!("kaboom {}", 7)
    }

    #[tokio::test]
    async fn panic_becomes_a_value() {
        let out = run_once(Box::pin(boom())).await;
        match out.result {
            Err(TaskError::Panicked { message }) => assert_eq!(message, "kaboom 7"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(out.backtrace.is_some());
    }

    #[tokio::test]
    async fn errors_pass_through_without_backtrace() {
        let out = run_once(Box::pin(async { Err::<(), _>(TaskError::fail("nope")) })).await;
        assert!(matches!(out.result, Err(TaskError::Fail { .. })));
        assert!(out.backtrace.is_none());

        let out = run_once(Box::pin(async { Ok::<(), TaskError>(()) })).await;
        assert!(out.result.is_ok());
    }

    #[test]
    fn payload_kinds() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
