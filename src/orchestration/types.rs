//! Records produced by a chain run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::context::SharedContext;
use crate::models::Payload;

/// One executed strategy within a chain run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyExecution {
    pub strategy: String,
    pub order: i32,
    pub success: bool,
    pub data: Payload,
    pub error: Option<String>,
    pub next_strategy: Option<String>,
    pub processing_time: Duration,
}

/// Aggregated result of running the chain over one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationOutcome {
    pub item_id: String,
    pub completed_at: DateTime<Utc>,
    pub total_time: Duration,
    /// True when at least one executed strategy succeeded
    pub overall_success: bool,
    /// Executed strategies in execution order; skipped strategies are absent
    pub executions: Vec<StrategyExecution>,
    pub context: SharedContext,
    /// Strategy whose result ended the chain early
    pub stopped_by: Option<String>,
    pub execution_limit_reached: bool,
}

impl OrchestrationOutcome {
    pub fn strategies_executed(&self) -> usize {
        self.executions.len()
    }

    /// Error texts of every execution that recorded one, in execution order
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.executions
            .iter()
            .filter_map(|execution| execution.error.as_deref())
    }

    pub fn failed_strategies(&self) -> Vec<&str> {
        self.executions
            .iter()
            .filter(|execution| !execution.success)
            .map(|execution| execution.strategy.as_str())
            .collect()
    }

    pub fn execution(&self, strategy: &str) -> Option<&StrategyExecution> {
        self.executions
            .iter()
            .find(|execution| execution.strategy == strategy)
    }
}
