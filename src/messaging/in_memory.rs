//! # In-Memory Broker
//!
//! Channel-backed broker for testing and development.
//!
//! ## Features
//!
//! - **Publish from anywhere**: `publish` can be called before or after `consume` starts
//! - **Ack on receipt**: every delivered message is counted as acknowledged before the
//!   handler runs
//! - **Cooperative stop**: `disconnect` ends an active `consume` call

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info};

use super::broker::{MessageBroker, MessageHandler};
use super::errors::{BrokerError, BrokerResult};
use super::message::BrokerMessage;

/// In-memory broker for tests and local runs
///
/// ```rust
/// use speechflow_core::messaging::{BrokerMessage, InMemoryBroker};
///
/// let broker = InMemoryBroker::new();
/// broker
///     .publish(BrokerMessage::new("speech.created", serde_json::json!({})))
///     .unwrap();
/// assert_eq!(broker.published_count(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryBroker {
    sender: mpsc::UnboundedSender<BrokerMessage>,
    receiver: Mutex<mpsc::UnboundedReceiver<BrokerMessage>>,
    connected: AtomicBool,
    stop: watch::Sender<bool>,
    total_published: AtomicU64,
    total_acked: AtomicU64,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (stop, _) = watch::channel(false);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            connected: AtomicBool::new(false),
            stop,
            total_published: AtomicU64::new(0),
            total_acked: AtomicU64::new(0),
        }
    }

    /// Queue a message for delivery
    pub fn publish(&self, message: BrokerMessage) -> BrokerResult<()> {
        self.sender
            .send(message)
            .map_err(|e| BrokerError::channel_closed(e.to_string()))?;
        self.total_published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Decode and queue a raw JSON body
    pub fn publish_json(&self, body: &[u8]) -> BrokerResult<()> {
        self.publish(BrokerMessage::from_slice(body)?)
    }

    pub fn published_count(&self) -> u64 {
        self.total_published.load(Ordering::Relaxed)
    }

    pub fn acked_count(&self) -> u64 {
        self.total_acked.load(Ordering::Relaxed)
    }

    /// Messages published but not yet delivered
    pub fn pending_count(&self) -> u64 {
        self.published_count().saturating_sub(self.acked_count())
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn connect(&self) -> BrokerResult<()> {
        self.stop.send_replace(false);
        self.connected.store(true, Ordering::SeqCst);
        info!("🔌 In-memory broker connected");
        Ok(())
    }

    async fn consume(&self, handler: Arc<dyn MessageHandler>) -> BrokerResult<()> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }

        let mut stop = self.stop.subscribe();
        let mut receiver = self.receiver.lock().await;
        info!("📥 In-memory broker consuming");

        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                message = receiver.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    self.total_acked.fetch_add(1, Ordering::Relaxed);
                    debug!(message_id = %message.id, "Acknowledged message on receipt");
                    handler.handle(message).await;
                }
            }
        }

        info!("📭 In-memory broker consumer stopped");
        Ok(())
    }

    async fn disconnect(&self) -> BrokerResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.stop.send_replace(true);
        info!("🔌 In-memory broker disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
