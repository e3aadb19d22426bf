//! Command Dispatcher: pause/resume delivery over per-agent channels
//!
//! One outbound publisher per agent, opened on first use and kept until
//! `close_all`. Delivery is fire-and-forget.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{command_queue_name, Command, CommandMessage};
use crate::error::Result;
use crate::transport::{Publisher, Transport};

pub struct CommandDispatcher {
    transport: Arc<dyn Transport>,
    publishers: HashMap<String, Box<dyn Publisher>>,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            publishers: HashMap::new(),
        }
    }

    /// Publish `{"command": ...}` to `{device_id}_commands`
    pub async fn send(&mut self, device_id: &str, command: Command) -> Result<()> {
        let payload = serde_json::to_vec(&CommandMessage::from(command))?;

        let publisher = match self.publishers.entry(device_id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let queue = command_queue_name(device_id);
                let publisher = self.transport.open_publisher(&queue).await?;
                debug!(device_id, queue = %queue, "opened command channel");
                entry.insert(publisher)
            }
        };
        publisher.publish(payload).await
    }

    /// Number of cached command channels
    pub fn open_channels(&self) -> usize {
        self.publishers.len()
    }

    pub fn has_channel(&self, device_id: &str) -> bool {
        self.publishers.contains_key(device_id)
    }

    /// Close every cached publisher (best-effort)
    pub async fn close_all(&mut self) {
        let count = self.publishers.len();
        for (device_id, publisher) in self.publishers.drain() {
            if let Err(e) = publisher.close().await {
                warn!(device_id = %device_id, error = %e, "failed to close command channel");
            }
        }
        info!(count, "command channels closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::transport::traits::MockPublisher;
    use crate::transport::{LocalBus, Subscription};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_send_publishes_wire_message() {
        let bus = LocalBus::new("local", 8);
        let mut commands = bus.subscribe("robot1_commands").await.unwrap();
        let mut dispatcher = CommandDispatcher::new(Arc::new(bus.clone()));

        dispatcher.send("robot1", Command::Pause).await.unwrap();
        dispatcher.send("robot1", Command::Resume).await.unwrap();

        assert_eq!(commands.next_message().await.unwrap(), br#"{"command":"pause"}"#.to_vec());
        assert_eq!(commands.next_message().await.unwrap(), br#"{"command":"resume"}"#.to_vec());
        assert_eq!(dispatcher.open_channels(), 1);
    }

    /// Hands out prepared mock publishers and counts how many were requested
    struct MockTransport {
        opened: AtomicUsize,
        publishers: Mutex<Vec<MockPublisher>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn endpoint(&self) -> &str {
            "mock"
        }

        async fn open_publisher(&self, _queue: &str) -> Result<Box<dyn Publisher>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let publisher = self
                .publishers
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| MonitorError::Transport("no publisher prepared".into()))?;
            Ok(Box::new(publisher))
        }

        async fn subscribe(&self, queue: &str) -> Result<Box<dyn Subscription>> {
            Err(MonitorError::Transport(format!("cannot subscribe to {queue}")))
        }
    }

    #[tokio::test]
    async fn test_publisher_is_cached_and_failures_surface() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .times(2)
            .returning(|_| Err(MonitorError::Transport("broker unreachable".into())));
        publisher.expect_close().times(1).returning(|| Ok(()));

        let transport = Arc::new(MockTransport {
            opened: AtomicUsize::new(0),
            publishers: Mutex::new(vec![publisher]),
        });
        let mut dispatcher = CommandDispatcher::new(transport.clone());

        assert!(dispatcher.send("robot1", Command::Pause).await.is_err());
        assert!(dispatcher.send("robot1", Command::Resume).await.is_err());
        assert_eq!(transport.opened.load(Ordering::SeqCst), 1);

        dispatcher.close_all().await;
        assert_eq!(dispatcher.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_open_failure_is_not_cached() {
        let transport = Arc::new(MockTransport {
            opened: AtomicUsize::new(0),
            publishers: Mutex::new(Vec::new()),
        });
        let mut dispatcher = CommandDispatcher::new(transport.clone());

        assert!(dispatcher.send("robot1", Command::Pause).await.is_err());
        assert!(dispatcher.send("robot1", Command::Pause).await.is_err());
        assert_eq!(transport.opened.load(Ordering::SeqCst), 2);
        assert!(!dispatcher.has_channel("robot1"));
    }
}
