//! Message transport
//!
//! The coordinator only needs two primitives: publish a message to a named
//! queue and await the next message from a named queue. `LocalBus` provides
//! both in-process; `AmqpTransport` provides them over a RabbitMQ-style broker.

pub mod amqp;
pub mod local;
pub mod traits;

pub use amqp::AmqpTransport;
pub use local::LocalBus;
pub use traits::{Publisher, Subscription, Transport};
