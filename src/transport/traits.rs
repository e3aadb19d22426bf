use async_trait::async_trait;

use crate::error::Result;

/// Outbound handle bound to one named queue
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Queue this publisher delivers to
    fn queue(&self) -> &str;

    /// Publish one message. Fire-and-forget: `Ok` means the transport accepted it,
    /// not that anyone consumed it.
    async fn publish(&self, payload: Vec<u8>) -> Result<()>;

    /// Release the handle; later publishes fail
    async fn close(&self) -> Result<()>;
}

/// Inbound handle consuming one named queue
#[async_trait]
pub trait Subscription: Send {
    fn queue(&self) -> &str;

    /// Wait for the next message. `None` once the queue is closed and drained.
    async fn next_message(&mut self) -> Option<Vec<u8>>;

    async fn close(&mut self);
}

/// Message transport: "publish M to queue C" and "receive next message from queue Q"
#[async_trait]
pub trait Transport: Send + Sync {
    /// Label of the broker endpoint, for logs
    fn endpoint(&self) -> &str;

    async fn open_publisher(&self, queue: &str) -> Result<Box<dyn Publisher>>;

    async fn subscribe(&self, queue: &str) -> Result<Box<dyn Subscription>>;
}
