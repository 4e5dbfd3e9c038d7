//! Payload, message and configuration builders shared by the integration tests.

use serde_json::{json, Value};
use speechflow_core::config::{SpeechflowConfig, WorkerConfig};
use speechflow_core::messaging::BrokerMessage;
use speechflow_core::models::Payload;
use std::future::Future;
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub fn speech_data(speech_id: &str, text: &str) -> Value {
    json!({
        "speechId": speech_id,
        "speechDto": {
            "original_text": text,
            "name": format!("speech {speech_id}"),
            "language": "en",
            "user_uuid": "user-1",
        }
    })
}

pub fn speech_message(id: &str, text: &str) -> BrokerMessage {
    BrokerMessage::new("speech.created", speech_data(id, text)).with_id(id)
}

pub fn speech_payload(id: &str, text: &str) -> Payload {
    speech_message(id, text).to_payload()
}

pub fn bare_payload(id: &str) -> Payload {
    json!({"id": id, "type": "speech.created", "data": {}})
        .as_object()
        .cloned()
        .unwrap()
}

/// Worker settings tuned for fast tests
pub fn fast_worker_config(processors: usize) -> WorkerConfig {
    WorkerConfig {
        concurrent_processors: processors,
        idle_poll_interval_ms: 10,
        drain_timeout_seconds: 5,
        drain_poll_interval_ms: 20,
        stats_interval_seconds: 0,
        ..WorkerConfig::default()
    }
}

/// Default configuration with every filesystem location inside `dir`
pub fn local_config(dir: &TempDir) -> SpeechflowConfig {
    let mut config = SpeechflowConfig::default();
    config.synthesis.output_directory = dir.path().join("audio");
    config.storage.metadata_directory = dir.path().join("metadata");
    config.voices.reference_directory = dir.path().join("voices");
    config
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition().await
}
