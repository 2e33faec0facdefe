//! # In-process broker.
//!
//! Every topic is one unbounded channel whose receiver is shared by all
//! streams opened on it: consumers of a topic compete for messages, like
//! workers of one consumer group. Closing a topic ends every open stream once
//! the buffered payloads are consumed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use super::{MessageStream, Publisher, Subscriber};
use crate::error::BackendError;

const BACKEND: &str = "memory";

struct Topic {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl Topic {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Arc::new(AsyncMutex::new(rx)),
        }
    }
}

/// In-memory [`Subscriber`] and per-topic [`Publisher`] factory.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `payload` to `topic`, creating the topic if needed.
    pub fn send(&self, topic: &str, payload: impl Into<Vec<u8>>) -> Result<(), BackendError> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let t = topics.entry(topic.to_string()).or_insert_with(Topic::new);
        let tx = t
            .tx
            .as_ref()
            .ok_or_else(|| BackendError::new(BACKEND, format!("topic {topic:?} is closed")))?;
        tx.send(payload.into())
            .map_err(|_| BackendError::new(BACKEND, format!("topic {topic:?} is closed")))
    }

    /// Returns a publisher bound to `topic`.
    pub fn publisher(&self, topic: impl Into<String>) -> Arc<dyn Publisher> {
        Arc::new(TopicPublisher {
            broker: self.clone(),
            topic: topic.into(),
        })
    }

    /// Stops accepting payloads on `topic`; streams end after draining it.
    pub fn close_topic(&self, topic: &str) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(t) = topics.get_mut(topic) {
            t.tx = None;
        }
    }

    fn receiver(&self, topic: &str) -> Arc<AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&topics.entry(topic.to_string()).or_insert_with(Topic::new).rx)
    }
}

#[async_trait]
impl Subscriber for MemoryBroker {
    async fn subscribe(
        &self,
        _consumer: &str,
        topic: &str,
    ) -> Result<Box<dyn MessageStream>, BackendError> {
        Ok(Box::new(MemoryStream {
            rx: Some(self.receiver(topic)),
        }))
    }
}

struct MemoryStream {
    rx: Option<Arc<AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>>>,
}

#[async_trait]
impl MessageStream for MemoryStream {
    async fn next(&mut self) -> Option<Vec<u8>> {
        let rx = self.rx.as_ref()?;
        rx.lock().await.recv().await
    }

    fn close(&mut self) {
        self.rx = None;
    }
}

struct TopicPublisher {
    broker: MemoryBroker,
    topic: String,
}

#[async_trait]
impl Publisher for TopicPublisher {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BackendError> {
        self.broker.send(&self.topic, payload)
    }

    async fn close(&self) {
        self.broker.close_topic(&self.topic);
    }
}
