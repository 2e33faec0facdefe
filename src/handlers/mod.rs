//! # Payload handlers for subscriptions.
//!
//! A [`Handler`] turns one inbound payload into a task future. Every message
//! of a subscription becomes its own general task, so a failing handler only
//! fails that message.
//!
//! - [`json`] decodes the payload with `serde_json` and calls a typed callback;
//!   a payload that does not decode fails the task.
//! - [`raw`] hands over the bytes as they are.
//!
//! ```rust
//! use serde::Deserialize;
//! use daemonvisor::{TaskError, handlers};
//!
//! #[derive(Deserialize)]
//! struct Price { symbol: String, cents: u64 }
//!
//! let handler = handlers::json(|p: Price| async move {
//!     if p.symbol.is_empty() {
//!         return Err(TaskError::fail("empty symbol"));
//!     }
//!     let _ = p.cents;
//!     Ok::<(), TaskError>(())
//! });
//! # let _ = handler;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::TaskError;
use crate::tasks::BoxTaskFuture;

/// Uniform `bytes → future` dispatcher.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, payload: Vec<u8>) -> BoxTaskFuture;
}

struct Json<T, F> {
    f: F,
    _payload: PhantomData<fn() -> T>,
}

impl<T, F, Fut> Handler for Json<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn call(&self, payload: Vec<u8>) -> BoxTaskFuture {
        match serde_json::from_slice::<T>(&payload) {
            Ok(value) => Box::pin((self.f)(value)),
            Err(e) => Box::pin(std::future::ready(Err(TaskError::fail(format!(
                "decode payload: {e}"
            ))))),
        }
    }
}

struct Raw<F> {
    f: F,
}

impl<F, Fut> Handler for Raw<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn call(&self, payload: Vec<u8>) -> BoxTaskFuture {
        Box::pin((self.f)(payload))
    }
}

/// Handler decoding JSON payloads into `T`.
pub fn json<T, F, Fut>(f: F) -> Arc<dyn Handler>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    Arc::new(Json {
        f,
        _payload: PhantomData,
    })
}

/// Handler receiving raw bytes.
pub fn raw<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    Arc::new(Raw { f })
}
