//! # Broker Interface
//!
//! The worker only needs a broker that can connect, push each inbound message to a
//! handler and disconnect. Acknowledgement happens inside the adapter, before the
//! handler is invoked, so internally failed work is never redelivered.

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::BrokerResult;
use super::message::BrokerMessage;

/// Receives every message the broker delivers
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: BrokerMessage);
}

/// Source of inbound events
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn connect(&self) -> BrokerResult<()>;

    /// Deliver messages to `handler` until the broker is disconnected or its
    /// source is exhausted
    async fn consume(&self, handler: Arc<dyn MessageHandler>) -> BrokerResult<()>;

    async fn disconnect(&self) -> BrokerResult<()>;

    fn is_connected(&self) -> bool;
}
