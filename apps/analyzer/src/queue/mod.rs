//! Queue transport seams. The worker consumes through `MessageSource` and the
//! publisher emits through `MessageSink`; each worker owns one of each.

use async_trait::async_trait;
use thiserror::Error;

pub mod redis_queue;

pub use redis_queue::RedisQueue;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One inbound message. The payload doubles as the acknowledgement receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next message; `Ok(None)` when the wait window passed empty.
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError>;

    /// Marks a message as consumed so it is not redelivered.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError>;
}

#[async_trait]
pub trait MessageSink: Send {
    /// Queues a payload for `topic`. Nothing is visible downstream before `flush`.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Hands every queued payload to the transport, in publish order. The
    /// batch is consumed whether or not the flush succeeds.
    async fn flush(&mut self) -> Result<(), QueueError>;

    /// Drops everything queued since the last flush.
    fn discard(&mut self);
}
