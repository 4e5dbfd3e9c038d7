//! # Failure Classification
//!
//! Decides whether a failed chain run is worth another attempt, based on the
//! error texts the strategies recorded.
//!
//! ## Rules
//!
//! Error texts are matched case-insensitively against two marker lists:
//!
//! ```text
//! terminal  : validation, invalid                          -> permanent
//! transient : timeout, connection, temporary, unavailable  -> retry
//! ```
//!
//! A terminal marker in any recorded error makes the whole run permanent, even
//! when another error carries a transient marker. A run with no marker at all is
//! permanent.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::OrchestrationOutcome;
use crate::constants::retry_markers;

/// Class of a single error text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Carries a transient marker and no terminal one
    Transient,
    /// Carries a terminal marker
    Terminal,
    /// Carries neither
    Unclassified,
}

/// What the worker should do with a failed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDecision {
    Retry,
    Permanent,
}

impl fmt::Display for RetryDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryDecision::Retry => write!(f, "retry"),
            RetryDecision::Permanent => write!(f, "permanent"),
        }
    }
}

/// Decision plus the error that drove it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub decision: RetryDecision,
    pub class: FailureClass,
    pub reason: Option<String>,
}

impl ErrorClassification {
    pub fn is_retryable(&self) -> bool {
        self.decision == RetryDecision::Retry
    }
}

/// Classify one error text
pub fn classify_error_text(error: &str) -> FailureClass {
    let lowered = error.to_lowercase();
    if retry_markers::TERMINAL
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        FailureClass::Terminal
    } else if retry_markers::TRANSIENT
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        FailureClass::Transient
    } else {
        FailureClass::Unclassified
    }
}

/// Pluggable retry policy used by the worker
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, outcome: &OrchestrationOutcome) -> ErrorClassification;
}

/// Marker-based classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardErrorClassifier;

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify(&self, outcome: &OrchestrationOutcome) -> ErrorClassification {
        let mut transient = None;

        for error in outcome.errors() {
            match classify_error_text(error) {
                FailureClass::Terminal => {
                    return ErrorClassification {
                        decision: RetryDecision::Permanent,
                        class: FailureClass::Terminal,
                        reason: Some(error.to_string()),
                    };
                }
                FailureClass::Transient if transient.is_none() => {
                    transient = Some(error.to_string());
                }
                _ => {}
            }
        }

        match transient {
            Some(reason) => ErrorClassification {
                decision: RetryDecision::Retry,
                class: FailureClass::Transient,
                reason: Some(reason),
            },
            None => ErrorClassification {
                decision: RetryDecision::Permanent,
                class: FailureClass::Unclassified,
                reason: outcome.errors().next().map(str::to_string),
            },
        }
    }
}
