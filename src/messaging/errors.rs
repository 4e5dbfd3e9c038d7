//! # Messaging Error Types
//!
//! Structured errors for broker adapters and inbound message decoding.

use thiserror::Error;

/// Broker and message decoding errors
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Broker is not connected")]
    NotConnected,

    #[error("Broker channel closed: {message}")]
    ChannelClosed { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },
}

impl BrokerError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn channel_closed(message: impl Into<String>) -> Self {
        Self::ChannelClosed {
            message: message.into(),
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(error: serde_json::Error) -> Self {
        Self::MessageDeserialization {
            message: error.to_string(),
        }
    }
}

/// Result type for broker operations
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
