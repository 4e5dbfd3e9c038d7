//! # Messaging Module
//!
//! Broker abstraction for inbound `speech.created` events plus an in-memory
//! broker used by tests and the development worker binary.

pub mod broker;
pub mod errors;
pub mod in_memory;
pub mod message;

pub use broker::{MessageBroker, MessageHandler};
pub use errors::{BrokerError, BrokerResult};
pub use in_memory::InMemoryBroker;
pub use message::BrokerMessage;
