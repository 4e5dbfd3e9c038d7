//! # Strategy Orchestrator
//!
//! Chain-of-responsibility runner over an ordered, immutable set of strategies.
//!
//! ## Control Flow
//!
//! For each item a cursor walks the sorted strategies:
//!
//! - `can_handle == false`: skip, nothing is recorded
//! - `execute` returns `Err` or panics: record a failed execution, continue
//! - `should_continue == false`: record and stop
//! - `next_strategy` names a registered strategy: jump there (forward or backward)
//! - otherwise advance by one
//!
//! A per-item execution limit ends runaway jump cycles.

use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use chrono::Utc;

use super::context::SharedContext;
use super::errors::OrchestrationError;
use super::strategy::{Strategy, StrategyDescriptor, StrategyResult};
use super::types::{OrchestrationOutcome, StrategyExecution};
use crate::config::OrchestratorConfig;
use crate::constants::defaults;
use crate::logging::log_strategy_operation;
use crate::models::{payload_id, Payload};

pub struct StrategyOrchestrator {
    strategies: Vec<Arc<dyn Strategy>>,
    index: HashMap<String, usize>,
    max_executions: usize,
}

impl std::fmt::Debug for StrategyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyOrchestrator")
            .field("strategies", &self.list_strategies())
            .field("max_executions", &self.max_executions)
            .finish()
    }
}

impl StrategyOrchestrator {
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Result<Self, OrchestrationError> {
        Self::with_max_executions(strategies, defaults::MAX_STRATEGY_EXECUTIONS)
    }

    pub fn from_config(
        strategies: Vec<Arc<dyn Strategy>>,
        config: &OrchestratorConfig,
    ) -> Result<Self, OrchestrationError> {
        Self::with_max_executions(strategies, config.max_strategy_executions)
    }

    /// Sort, index and validate the chain.
    ///
    /// Fails on duplicate names and on declared jump targets that are not registered.
    pub fn with_max_executions(
        mut strategies: Vec<Arc<dyn Strategy>>,
        max_executions: usize,
    ) -> Result<Self, OrchestrationError> {
        // Stable: equal orders keep registration order
        strategies.sort_by_key(|strategy| strategy.order());

        let mut index = HashMap::with_capacity(strategies.len());
        for (position, strategy) in strategies.iter().enumerate() {
            if index.insert(strategy.name().to_string(), position).is_some() {
                return Err(OrchestrationError::DuplicateStrategy {
                    name: strategy.name().to_string(),
                });
            }
        }

        for strategy in &strategies {
            for target in strategy.jump_targets() {
                if !index.contains_key(&target) {
                    return Err(OrchestrationError::UnresolvedJumpTarget {
                        strategy: strategy.name().to_string(),
                        target,
                    });
                }
            }
        }

        let orchestrator = Self {
            strategies,
            index,
            max_executions: max_executions.max(1),
        };

        info!(
            strategies = ?orchestrator
                .strategies
                .iter()
                .map(|s| format!("{}({})", s.name(), s.order()))
                .collect::<Vec<_>>(),
            max_executions = orchestrator.max_executions,
            "🎯 Strategy orchestrator initialized"
        );

        Ok(orchestrator)
    }

    /// Run the chain over one payload. Strategy failures never escape.
    pub async fn process(&self, payload: &Payload) -> OrchestrationOutcome {
        let started = Instant::now();
        let item_id = payload_id(payload).unwrap_or("unknown").to_string();
        let mut context = SharedContext::new(item_id.clone());
        let mut executions: Vec<StrategyExecution> = Vec::new();
        let mut stopped_by = None;
        let mut execution_limit_reached = false;
        let mut cursor = 0;

        debug!(item_id = %item_id, "Starting strategy chain");

        while let Some(strategy) = self.strategies.get(cursor) {
            if executions.len() >= self.max_executions {
                warn!(
                    item_id = %item_id,
                    executions = executions.len(),
                    "⚠️ Strategy execution limit reached, ending chain"
                );
                execution_limit_reached = true;
                break;
            }

            if !strategy.can_handle(payload).await {
                debug!(item_id = %item_id, strategy = strategy.name(), "Strategy skipped");
                cursor += 1;
                continue;
            }

            let result = self.run_strategy(strategy.as_ref(), payload, &mut context).await;

            if !result.success {
                if let Some(error) = &result.error {
                    context.last_error = Some(error.clone());
                }
            }

            log_strategy_operation(
                "execute",
                Some(&item_id),
                strategy.name(),
                if result.success { "success" } else { "failed" },
                result.processing_time.map(|d| d.as_millis() as u64),
                result.error.as_deref(),
            );

            let should_continue = result.should_continue;
            let next_strategy = result.next_strategy.clone();

            executions.push(StrategyExecution {
                strategy: strategy.name().to_string(),
                order: strategy.order(),
                success: result.success,
                data: result.data,
                error: result.error,
                next_strategy: result.next_strategy,
                processing_time: result.processing_time.unwrap_or_default(),
            });

            if !should_continue {
                info!(item_id = %item_id, strategy = strategy.name(), "🛑 Strategy stopped the chain");
                stopped_by = Some(strategy.name().to_string());
                break;
            }

            cursor = match next_strategy {
                Some(target) => match self.index.get(&target) {
                    Some(&position) => {
                        debug!(item_id = %item_id, from = strategy.name(), to = %target, "Jumping");
                        position
                    }
                    None => {
                        warn!(
                            item_id = %item_id,
                            strategy = strategy.name(),
                            target = %target,
                            "⚠️ Unknown next strategy, continuing with the next one"
                        );
                        cursor + 1
                    }
                },
                None => cursor + 1,
            };
        }

        let overall_success = executions.iter().any(|execution| execution.success);
        let total_time = started.elapsed();

        info!(
            item_id = %item_id,
            overall_success = overall_success,
            strategies_executed = executions.len(),
            total_ms = total_time.as_millis() as u64,
            "✅ Strategy chain finished"
        );

        OrchestrationOutcome {
            item_id,
            completed_at: Utc::now(),
            total_time,
            overall_success,
            executions,
            context,
            stopped_by,
            execution_limit_reached,
        }
    }

    async fn run_strategy(
        &self,
        strategy: &dyn Strategy,
        payload: &Payload,
        context: &mut SharedContext,
    ) -> StrategyResult {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(strategy.execute(payload, context))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(mut result)) => {
                result.processing_time.get_or_insert(elapsed);
                result
            }
            Ok(Err(e)) => {
                error!(strategy = strategy.name(), error = %e, "❌ Strategy returned an error");
                StrategyResult::failure(e.to_string()).with_processing_time(elapsed)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(strategy = strategy.name(), panic = %message, "❌ Strategy panicked");
                StrategyResult::failure(format!("strategy panicked: {message}"))
                    .with_processing_time(elapsed)
            }
        }
    }

    /// Run every strategy's `initialize` concurrently; the first failure is returned
    pub async fn initialize_all(&self) -> Result<(), OrchestrationError> {
        let results = join_all(self.strategies.iter().map(|strategy| async move {
            (strategy.name().to_string(), strategy.initialize().await)
        }))
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                error!(strategy = %name, error = %e, "❌ Strategy initialization failed");
                return Err(OrchestrationError::InitializationFailed {
                    strategy: name,
                    message: e.to_string(),
                });
            }
        }

        info!(count = self.strategies.len(), "✅ All strategies initialized");
        Ok(())
    }

    /// Run every strategy's `cleanup` concurrently; failures are logged
    pub async fn cleanup_all(&self) {
        let results = join_all(self.strategies.iter().map(|strategy| async move {
            (strategy.name().to_string(), strategy.cleanup().await)
        }))
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                warn!(strategy = %name, error = %e, "⚠️ Strategy cleanup failed");
            }
        }

        info!(count = self.strategies.len(), "🧹 All strategies cleaned up");
    }

    pub fn get_strategy(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.index
            .get(name)
            .map(|&position| Arc::clone(&self.strategies[position]))
    }

    /// Descriptors in execution order
    pub fn list_strategies(&self) -> Vec<StrategyDescriptor> {
        self.strategies.iter().map(|s| s.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::errors::StrategyError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Named {
        name: &'static str,
        order: i32,
        targets: Vec<String>,
    }

    #[async_trait]
    impl Strategy for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn jump_targets(&self) -> Vec<String> {
            self.targets.clone()
        }

        async fn can_handle(&self, _payload: &Payload) -> bool {
            true
        }

        async fn execute(
            &self,
            _payload: &Payload,
            _context: &mut SharedContext,
        ) -> Result<StrategyResult, StrategyError> {
            Ok(StrategyResult::success())
        }
    }

    fn named(name: &'static str, order: i32) -> Arc<dyn Strategy> {
        Arc::new(Named {
            name,
            order,
            targets: Vec::new(),
        })
    }

    fn payload() -> Payload {
        json!({"id": "item-1"}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_sorted_by_order_with_stable_ties() {
        let orchestrator = StrategyOrchestrator::new(vec![
            named("c", 30),
            named("a1", 10),
            named("b", 20),
            named("a2", 10),
        ])
        .unwrap();

        let names: Vec<String> = orchestrator
            .list_strategies()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["a1", "a2", "b", "c"]);
        assert_eq!(orchestrator.len(), 4);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = StrategyOrchestrator::new(vec![named("a", 1), named("a", 2)]);
        assert_eq!(
            result.err(),
            Some(OrchestrationError::DuplicateStrategy {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_unresolved_jump_target_rejected() {
        let jumper: Arc<dyn Strategy> = Arc::new(Named {
            name: "jumper",
            order: 1,
            targets: vec!["ghost".to_string()],
        });
        let result = StrategyOrchestrator::new(vec![jumper]);
        assert!(matches!(
            result,
            Err(OrchestrationError::UnresolvedJumpTarget { ref target, .. }) if target == "ghost"
        ));
    }

    #[test]
    fn test_get_strategy() {
        let orchestrator = StrategyOrchestrator::new(vec![named("a", 1)]).unwrap();
        assert_eq!(orchestrator.get_strategy("a").unwrap().name(), "a");
        assert!(orchestrator.get_strategy("b").is_none());
    }

    struct Panicking;

    #[async_trait]
    impl Strategy for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn order(&self) -> i32 {
            5
        }

        async fn can_handle(&self, _payload: &Payload) -> bool {
            true
        }

        async fn execute(
            &self,
            _payload: &Payload,
            _context: &mut SharedContext,
        ) -> Result<StrategyResult, StrategyError> {
            panic!("synthesizer exploded");
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_record() {
        let panicking: Arc<dyn Strategy> = Arc::new(Panicking);
        let orchestrator = StrategyOrchestrator::new(vec![panicking, named("after", 10)]).unwrap();
        let outcome = orchestrator.process(&payload()).await;

        assert_eq!(outcome.strategies_executed(), 2);
        let failed = outcome.execution("panicking").unwrap();
        assert!(!failed.success);
        assert!(failed.error.as_deref().unwrap().contains("synthesizer exploded"));
        assert!(outcome.execution("after").unwrap().success);
        assert!(outcome.overall_success);
    }

    struct Looping {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Strategy for Looping {
        fn name(&self) -> &str {
            "looping"
        }

        fn order(&self) -> i32 {
            1
        }

        async fn can_handle(&self, _payload: &Payload) -> bool {
            true
        }

        async fn execute(
            &self,
            _payload: &Payload,
            _context: &mut SharedContext,
        ) -> Result<StrategyResult, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StrategyResult::success().jump_to("looping"))
        }
    }

    #[tokio::test]
    async fn test_execution_limit_ends_self_jump_cycle() {
        let looping = Arc::new(Looping {
            calls: AtomicUsize::new(0),
        });
        let orchestrator =
            StrategyOrchestrator::with_max_executions(vec![looping.clone() as Arc<dyn Strategy>], 5)
                .unwrap();
        let outcome = orchestrator.process(&payload()).await;

        assert!(outcome.execution_limit_reached);
        assert_eq!(outcome.strategies_executed(), 5);
        assert_eq!(looping.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let orchestrator = StrategyOrchestrator::new(Vec::new()).unwrap();
        let outcome = orchestrator.process(&payload()).await;

        assert!(orchestrator.is_empty());
        assert!(!outcome.overall_success);
        assert_eq!(outcome.item_id, "item-1");
    }
}
