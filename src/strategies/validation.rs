//! # Validation Strategy
//!
//! First link of the chain. Rejects malformed or unsafe requests before any
//! synthesis time is spent on them. A failure stops the chain and its error
//! text carries the terminal `validation` marker, so the item is never retried.
//!
//! ## Checks
//!
//! 1. **Structure**: `id`, `data`, `data.speechDto`, `data.speechDto.original_text`.
//!    Structural errors short-circuit the remaining checks.
//! 2. **Text**: non-empty, within the configured length bounds, not only whitespace
//! 3. **Language**: in the supported list (default `en` when absent)
//! 4. **Security**: no forbidden pattern (script tags, `javascript:` and HTML data URLs)
//! 5. **Metadata**: `user_uuid` is a string, `speed` is numeric and in range

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::{ConfigResult, ConfigurationError, ValidationConfig};
use crate::constants::{strategy_names, strategy_orders};
use crate::models::{Payload, TextStats};
use crate::orchestration::{SharedContext, Strategy, StrategyError, StrategyResult};

#[derive(Debug)]
pub struct ValidationStrategy {
    config: ValidationConfig,
    forbidden: Vec<(String, Regex)>,
}

impl ValidationStrategy {
    pub fn new(config: ValidationConfig) -> ConfigResult<Self> {
        let forbidden = config
            .forbidden_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map(|regex| (pattern.clone(), regex))
                    .map_err(|e| {
                        ConfigurationError::invalid_value(
                            "validation.forbidden_patterns",
                            pattern,
                            e.to_string(),
                        )
                    })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self { config, forbidden })
    }

    fn validate_structure(payload: &Payload) -> Vec<String> {
        let mut errors: Vec<String> = ["id", "data"]
            .iter()
            .filter(|field| !payload.contains_key(**field))
            .map(|field| format!("Missing required field: {field}"))
            .collect();
        if !errors.is_empty() {
            return errors;
        }

        let Some(data) = payload.get("data").and_then(Value::as_object) else {
            errors.push("Field 'data' must be an object".to_string());
            return errors;
        };

        match data.get("speechDto") {
            None => errors.push("Missing required field: data.speechDto".to_string()),
            Some(Value::Object(dto)) => {
                if !dto.contains_key("original_text") {
                    errors.push("Missing required field: data.speechDto.original_text".to_string());
                }
            }
            Some(_) => errors.push("Field 'data.speechDto' must be an object".to_string()),
        }
        errors
    }

    fn validate_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec!["Text is empty".to_string()];
        }

        let mut errors = Vec::new();
        let length = text.chars().count();
        if length < self.config.min_text_length {
            errors.push(format!(
                "Text too short: {length} < {}",
                self.config.min_text_length
            ));
        }
        if length > self.config.max_text_length {
            errors.push(format!(
                "Text too long: {length} > {}",
                self.config.max_text_length
            ));
        }
        if text.trim().is_empty() {
            errors.push("Text contains only whitespace".to_string());
        }
        errors
    }

    fn validate_security(&self, text: &str) -> Vec<String> {
        self.forbidden
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(pattern, _)| format!("Text contains forbidden pattern: {pattern}"))
            .collect()
    }

    fn validate_metadata(&self, dto: &Payload) -> Vec<String> {
        let mut errors = Vec::new();

        let user_id = dto.get("user_uuid").or_else(|| dto.get("userId"));
        if let Some(user_id) = user_id {
            let blank = matches!(user_id, Value::Null)
                || matches!(user_id, Value::Bool(false))
                || user_id.as_str().is_some_and(str::is_empty);
            if !blank && !user_id.is_string() {
                errors.push("user_id must be a string".to_string());
            }
        }

        match dto.get("speed") {
            None | Some(Value::Null) => {}
            Some(value) => match speed_value(value) {
                Some(speed) if speed < self.config.min_speed || speed > self.config.max_speed => {
                    errors.push(format!(
                        "Speed out of range: {speed} (must be {}-{})",
                        self.config.min_speed, self.config.max_speed
                    ));
                }
                Some(_) => {}
                None => errors.push("Speed must be a number".to_string()),
            },
        }
        errors
    }

    fn failure(errors: Vec<String>) -> StrategyResult {
        let count = errors.len();
        StrategyResult::failure(format!("Validation failed with {count} errors"))
            .with_data("message", "Validation failed")
            .with_data("errors", errors)
            .with_data("error_count", count)
            .stop()
    }
}

// Numbers and numeric strings are accepted; anything else is not a speed
fn speed_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[async_trait]
impl Strategy for ValidationStrategy {
    fn name(&self) -> &str {
        strategy_names::VALIDATION
    }

    fn order(&self) -> i32 {
        strategy_orders::VALIDATION
    }

    async fn can_handle(&self, _payload: &Payload) -> bool {
        true
    }

    async fn execute(
        &self,
        payload: &Payload,
        context: &mut SharedContext,
    ) -> Result<StrategyResult, StrategyError> {
        let structure_errors = Self::validate_structure(payload);
        if !structure_errors.is_empty() {
            warn!(item_id = %context.item_id, errors = ?structure_errors, "Malformed message");
            return Ok(Self::failure(structure_errors));
        }

        let dto = crate::models::speech_dto(payload)
            .ok_or_else(|| StrategyError::internal("speechDto vanished after structure check"))?;
        let text = dto
            .get("original_text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let language = match dto.get("language") {
            None | Some(Value::Null) => self.config.default_language.clone(),
            Some(Value::String(language)) => language.clone(),
            Some(other) => other.to_string(),
        };

        let mut errors = self.validate_text(text);
        if !self.config.supported_languages.contains(&language) {
            errors.push(format!(
                "Unsupported language: {language}. Supported: {}",
                self.config.supported_languages.join(", ")
            ));
        }
        errors.extend(self.validate_security(text));
        errors.extend(self.validate_metadata(dto));

        if !errors.is_empty() {
            warn!(
                item_id = %context.item_id,
                error_count = errors.len(),
                "Message failed validation"
            );
            return Ok(Self::failure(errors));
        }

        let stats = TextStats::from_text(text, &language);
        context.validation_passed = true;
        info!(
            item_id = %context.item_id,
            length = stats.length,
            language = %language,
            "✅ Message passed validation"
        );

        let result = StrategyResult::success()
            .with_data("message", "Validation passed")
            .with_data("text_length", stats.length)
            .with_data("language", json!(language));
        context.text_stats = Some(stats);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> ValidationStrategy {
        ValidationStrategy::new(ValidationConfig::default()).unwrap()
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn speech(dto: Value) -> Payload {
        payload(json!({"id": "msg-1", "data": {"speechId": 7, "speechDto": dto}}))
    }

    async fn run(payload: &Payload) -> (StrategyResult, SharedContext) {
        let mut context = SharedContext::new("msg-1");
        let result = strategy().execute(payload, &mut context).await.unwrap();
        (result, context)
    }

    fn errors(result: &StrategyResult) -> Vec<String> {
        serde_json::from_value(result.data["errors"].clone()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_message_passes() {
        let (result, context) =
            run(&speech(json!({"original_text": "Hello there", "language": "es"}))).await;

        assert!(result.success);
        assert!(context.validation_passed);
        let stats = context.text_stats.unwrap();
        assert_eq!(stats.word_count, 2);
        assert_eq!(stats.language, "es");
    }

    #[tokio::test]
    async fn test_missing_root_fields() {
        let (result, _) = run(&payload(json!({"type": "speech.created"}))).await;

        assert!(!result.success);
        assert!(!result.should_continue);
        assert_eq!(
            errors(&result),
            vec!["Missing required field: id", "Missing required field: data"]
        );
        assert_eq!(result.error.as_deref(), Some("Validation failed with 2 errors"));
    }

    #[tokio::test]
    async fn test_structure_errors_short_circuit() {
        let (result, _) = run(&payload(json!({"id": "x", "data": "text"}))).await;
        assert_eq!(errors(&result), vec!["Field 'data' must be an object"]);

        let (result, _) = run(&payload(json!({"id": "x", "data": {}}))).await;
        assert_eq!(errors(&result), vec!["Missing required field: data.speechDto"]);

        let (result, _) = run(&speech(json!({"language": "en"}))).await;
        assert_eq!(
            errors(&result),
            vec!["Missing required field: data.speechDto.original_text"]
        );
    }

    #[tokio::test]
    async fn test_collects_every_content_error() {
        let (result, context) = run(&speech(json!({
            "original_text": "<script>alert(1)</script>",
            "language": "xx",
            "user_uuid": 42,
            "speed": 3.5
        })))
        .await;

        let errors = errors(&result);
        assert_eq!(result.data["error_count"], 4);
        assert!(errors[0].starts_with("Unsupported language: xx. Supported: en, es"));
        assert!(errors[1].starts_with("Text contains forbidden pattern"));
        assert_eq!(errors[2], "user_id must be a string");
        assert_eq!(errors[3], "Speed out of range: 3.5 (must be 0.5-2)");
        assert!(!context.validation_passed);
    }

    #[tokio::test]
    async fn test_text_rules() {
        let (result, _) = run(&speech(json!({"original_text": ""}))).await;
        assert_eq!(errors(&result), vec!["Text is empty"]);

        let (result, _) = run(&speech(json!({"original_text": "   "}))).await;
        assert_eq!(errors(&result), vec!["Text contains only whitespace"]);

        let long = "a".repeat(10_001);
        let (result, _) = run(&speech(json!({"original_text": long}))).await;
        assert_eq!(errors(&result), vec!["Text too long: 10001 > 10000"]);
    }

    #[tokio::test]
    async fn test_forbidden_patterns_are_case_insensitive() {
        for text in ["visit JAVASCRIPT:alert(1)", "DATA:TEXT/HTML;base64,xx", "<SCRIPT src=x>\n</Script>"] {
            let (result, _) = run(&speech(json!({"original_text": text}))).await;
            assert!(!result.success, "{text} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_speed_parsing() {
        let (result, _) = run(&speech(json!({"original_text": "hi", "speed": "1.5"}))).await;
        assert!(result.success);

        let (result, _) = run(&speech(json!({"original_text": "hi", "speed": "fast"}))).await;
        assert_eq!(errors(&result), vec!["Speed must be a number"]);
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let config = ValidationConfig {
            forbidden_patterns: vec!["(unclosed".to_string()],
            ..ValidationConfig::default()
        };
        assert!(ValidationStrategy::new(config).is_err());
    }
}
