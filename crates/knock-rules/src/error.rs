//! Error types for rule-set loading.

use knock_core::CoreError;
use std::fmt;
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors raised while loading a rule-set document
#[derive(Error, Debug)]
pub enum RulesError {
    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The rules file could not be read
    #[error("Cannot read rules file: {0}")]
    IoError(#[from] std::io::Error),

    /// A single validation error
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidationErrors(Vec<ValidationError>),

    /// Unsupported document version
    #[error("Unsupported rules version: {0}")]
    UnsupportedVersion(String),

    /// The kernel refused the compiled rule set
    #[error("Rule set rejected: {0}")]
    Core(#[from] CoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [ValidationError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl RulesError {
    /// Create a RulesError from one or more validation errors
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Self {
        match errors.len() {
            0 => RulesError::InternalError(
                "Called from_validation_errors with empty vector".to_string(),
            ),
            1 => match errors.pop() {
                Some(err) => RulesError::ValidationError(err),
                None => RulesError::MultipleValidationErrors(errors),
            },
            _ => RulesError::MultipleValidationErrors(errors),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RulesError::YamlError(_) => "ERR_RULES_YAML_PARSE",
            RulesError::IoError(_) => "ERR_RULES_IO",
            RulesError::ValidationError(err) => err.code,
            RulesError::MultipleValidationErrors(_) => "ERR_RULES_VALIDATION_MULTIPLE",
            RulesError::UnsupportedVersion(_) => "ERR_RULES_UNSUPPORTED_VERSION",
            RulesError::Core(_) => "ERR_RULES_REJECTED",
            RulesError::InternalError(_) => "ERR_RULES_INTERNAL",
        }
    }

    /// Every validation error carried by this error
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            RulesError::ValidationError(err) => std::slice::from_ref(err),
            RulesError::MultipleValidationErrors(errors) => errors,
            _ => &[],
        }
    }
}
