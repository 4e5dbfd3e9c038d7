//! Strategies with scripted behavior for orchestrator and worker tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use speechflow_core::models::{payload_id, Payload};
use speechflow_core::orchestration::{SharedContext, Strategy, StrategyError, StrategyResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Ordered record of strategy executions shared by several strategies
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    Fail(String),
    /// Fail the first attempt of each item, succeed afterwards
    FailFirstAttempt(String),
    /// Jump to the target on the first execution per item, succeed afterwards
    JumpOnce(String),
    Error(String),
    Panic,
    Sleep(Duration),
}

pub struct ScriptedStrategy {
    name: String,
    order: i32,
    script: Script,
    handles: bool,
    journal: Option<Journal>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl ScriptedStrategy {
    pub fn new(name: &str, order: i32, script: Script) -> Self {
        Self {
            name: name.to_string(),
            order,
            script,
            handles: true,
            journal: None,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn declining(mut self) -> Self {
        self.handles = false;
        self
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn arc(self) -> Arc<dyn Strategy> {
        Arc::new(self)
    }

    /// Executions per item id
    pub fn attempts(&self) -> HashMap<String, usize> {
        self.attempts.lock().clone()
    }

    pub fn total_executions(&self) -> usize {
        self.attempts.lock().values().sum()
    }
}

#[async_trait]
impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn jump_targets(&self) -> Vec<String> {
        match &self.script {
            Script::JumpOnce(target) => vec![target.clone()],
            _ => Vec::new(),
        }
    }

    async fn can_handle(&self, _payload: &Payload) -> bool {
        self.handles
    }

    async fn execute(
        &self,
        payload: &Payload,
        _context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError> {
        let item_id = payload_id(payload).unwrap_or("unknown").to_string();
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(item_id).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(journal) = &self.journal {
            journal.lock().push(self.name.clone());
        }

        match &self.script {
            Script::Succeed => Ok(StrategyResult::success()),
            Script::Fail(error) => Ok(StrategyResult::failure(error.clone())),
            Script::FailFirstAttempt(error) if attempt == 1 => {
                Ok(StrategyResult::failure(error.clone()))
            }
            Script::FailFirstAttempt(_) => Ok(StrategyResult::success()),
            Script::JumpOnce(target) if attempt == 1 => {
                Ok(StrategyResult::success().jump_to(target.clone()))
            }
            Script::JumpOnce(_) => Ok(StrategyResult::success()),
            Script::Error(message) => Err(StrategyError::internal(message.clone())),
            Script::Panic => panic!("scripted panic in {}", self.name),
            Script::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(StrategyResult::success())
            }
        }
    }
}
