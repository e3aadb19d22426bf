//! In-process message bus
//!
//! Named queues are declared lazily by whichever side touches them first, like
//! a broker's default exchange. Each queue has exactly one consumer and is
//! bounded; publishing never waits, a full queue is reported as a send failure.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

use super::traits::{Publisher, Subscription, Transport};
use crate::config::TransportConfig;
use crate::error::{MonitorError, Result};

struct QueueSlot {
    tx: mpsc::Sender<Vec<u8>>,
    rx: Option<mpsc::Receiver<Vec<u8>>>,
}

/// Clonable in-process transport; clones share the same queues
#[derive(Clone)]
pub struct LocalBus {
    endpoint: Arc<str>,
    capacity: usize,
    queues: Arc<DashMap<String, QueueSlot>>,
}

impl LocalBus {
    pub fn new(endpoint: impl Into<String>, capacity: usize) -> Self {
        let endpoint: String = endpoint.into();
        info!(endpoint = %endpoint, capacity, "local message bus created");
        Self {
            endpoint: Arc::from(endpoint),
            capacity: capacity.max(1),
            queues: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.host.clone(), config.queue_capacity)
    }

    /// Number of messages waiting in a queue (0 for undeclared queues)
    pub fn pending(&self, queue: &str) -> usize {
        self.queues
            .get(queue)
            .map(|slot| slot.tx.max_capacity() - slot.tx.capacity())
            .unwrap_or(0)
    }

    /// Names of all declared queues, sorted
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn sender(&self, queue: &str) -> mpsc::Sender<Vec<u8>> {
        self.queues
            .entry(queue.to_string())
            .or_insert_with(|| {
                debug!(queue, "declaring queue");
                let (tx, rx) = mpsc::channel(self.capacity);
                QueueSlot { tx, rx: Some(rx) }
            })
            .tx
            .clone()
    }

    fn take_receiver(&self, queue: &str) -> Result<mpsc::Receiver<Vec<u8>>> {
        self.sender(queue);
        let mut slot = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| MonitorError::Internal(format!("queue {queue} vanished")))?;
        slot.rx.take().ok_or_else(|| {
            MonitorError::Transport(format!("queue {queue} already has a consumer"))
        })
    }
}

#[async_trait]
impl Transport for LocalBus {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_publisher(&self, queue: &str) -> Result<Box<dyn Publisher>> {
        Ok(Box::new(LocalPublisher {
            queue: queue.to_string(),
            tx: self.sender(queue),
            closed: AtomicBool::new(false),
        }))
    }

    async fn subscribe(&self, queue: &str) -> Result<Box<dyn Subscription>> {
        let rx = self.take_receiver(queue)?;
        debug!(queue, "consumer attached");
        Ok(Box::new(LocalSubscription {
            queue: queue.to_string(),
            rx,
        }))
    }
}

struct LocalPublisher {
    queue: String,
    tx: mpsc::Sender<Vec<u8>>,
    closed: AtomicBool,
}

#[async_trait]
impl Publisher for LocalPublisher {
    fn queue(&self) -> &str {
        &self.queue
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MonitorError::QueueClosed(format!(
                "publisher for {} was closed",
                self.queue
            )));
        }
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => {
                MonitorError::Transport(format!("queue {} is full", self.queue))
            }
            TrySendError::Closed(_) => {
                MonitorError::QueueClosed(format!("queue {} has no consumer", self.queue))
            }
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct LocalSubscription {
    queue: String,
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl Subscription for LocalSubscription {
    fn queue(&self) -> &str {
        &self.queue
    }

    async fn next_message(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
