use std::collections::HashSet;
use thiserror::Error;

use crate::config::{FormatConfig, GenerationSettings, RunnerSettings, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_generation(&settings.generation) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_runner(&settings.runner) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_formats(&settings.formats) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_generation(generation: &GenerationSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if generation.max_attempts == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "generation.max_attempts".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_runner(runner: &RunnerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if runner.max_examples == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "runner.max_examples".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if runner.timeout_seconds == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "runner.timeout_seconds".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if runner.user_agent.trim().is_empty() {
            errors.push(ValidationError::MissingField("runner.user_agent".to_string()));
        }

        if let Some(base_url) = &runner.base_url {
            if let Err(e) = url::Url::parse(base_url) {
                errors.push(ValidationError::InvalidValue {
                    field: "runner.base_url".to_string(),
                    reason: e.to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_formats(formats: &[FormatConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        // Type errors are left to the format registry, which names the argument
        for format in formats {
            if let Some(name) = format.name.as_str() {
                if !names.insert(name) {
                    errors.push(ValidationError::Duplicate(format!("format '{}'", name)));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(ConfigValidator::validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut settings = Settings::default();
        settings.generation.max_attempts = 0;
        settings.runner.max_examples = 0;
        settings.runner.base_url = Some("not a url".to_string());

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("generation.max_attempts")));
        assert!(errors.iter().any(|e| e.to_string().contains("runner.base_url")));
    }

    #[test]
    fn test_duplicate_format_names() {
        let mut settings = Settings::default();
        let format = FormatConfig {
            name: json!("even"),
            generator: json!({"pattern": "^[0-9]{4}$"}),
        };
        settings.formats = vec![format.clone(), format];

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(&errors[0], ValidationError::Duplicate(name) if name.contains("even")));
    }
}
