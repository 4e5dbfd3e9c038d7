//! # Strategy Contract
//!
//! A strategy is one link in the processing chain. The orchestrator asks each
//! strategy, in `order`, whether it can handle the payload, runs it, and reads
//! the returned `StrategyResult` to decide whether to stop, jump or advance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::context::SharedContext;
use super::errors::StrategyError;
use crate::models::Payload;

/// Static identity of a registered strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub name: String,
    pub order: i32,
    pub jump_targets: Vec<String>,
}

/// Outcome of one strategy execution, as reported by the strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub success: bool,
    pub data: Payload,
    /// Name of the strategy to run next instead of the following one
    pub next_strategy: Option<String>,
    /// False ends the chain after this strategy
    pub should_continue: bool,
    pub error: Option<String>,
    /// Filled in by the orchestrator when the strategy leaves it unset
    pub processing_time: Option<Duration>,
}

impl StrategyResult {
    pub fn success() -> Self {
        Self {
            success: true,
            data: Payload::new(),
            next_strategy: None,
            should_continue: true,
            error: None,
            processing_time: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success()
        }
    }

    /// Successful no-op, recorded with `skipped: true` and a reason
    pub fn skipped(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self::success()
            .with_data("skipped", true)
            .with_data("message", reason)
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn jump_to(mut self, strategy: impl Into<String>) -> Self {
        self.next_strategy = Some(strategy.into());
        self
    }

    pub fn stop(mut self) -> Self {
        self.should_continue = false;
        self
    }

    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = Some(elapsed);
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.data
            .get("skipped")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// One link of the processing chain
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Unique name, also the jump target identifier
    fn name(&self) -> &str;

    /// Sort key; lower runs earlier
    fn order(&self) -> i32;

    /// Strategies this one may name in `next_strategy`. Checked when the chain is built.
    fn jump_targets(&self) -> Vec<String> {
        Vec::new()
    }

    async fn can_handle(&self, payload: &Payload) -> bool;

    async fn execute(
        &self,
        payload: &Payload,
        context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError>;

    async fn initialize(&self) -> Result<(), StrategyError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), StrategyError> {
        Ok(())
    }

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            name: self.name().to_string(),
            order: self.order(),
            jump_targets: self.jump_targets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_builders() {
        let ok = StrategyResult::success().with_data("count", 3);
        assert!(ok.success && ok.should_continue);
        assert_eq!(ok.data["count"], 3);

        let failed = StrategyResult::failure("boom").stop();
        assert!(!failed.success);
        assert!(!failed.should_continue);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let jump = StrategyResult::success().jump_to("validation");
        assert_eq!(jump.next_strategy.as_deref(), Some("validation"));
    }

    #[test]
    fn test_skipped_result() {
        let skipped = StrategyResult::skipped("no audio generated");
        assert!(skipped.success);
        assert!(skipped.is_skipped());
        assert!(!StrategyResult::success().is_skipped());
    }
}
