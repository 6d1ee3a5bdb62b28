//! Document validation.

use std::error::Error;
use std::fmt;

use crate::document::RuleDocument;
use crate::error::RulesError;

mod dependency;
mod rule_validator;

pub use dependency::DependencyValidator;
pub use rule_validator::RuleValidator;

/// Represents a validation error found in a rule-set document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error code (one of [`error_codes`])
    pub code: &'static str,

    /// Human-readable error message
    pub message: String,

    /// Optional path to the location of the error (e.g., "rules[2].then[0]")
    pub path: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationError {}

/// Validation error codes
pub mod error_codes {
    /// Duplicate rule ID
    pub const DUPLICATE_ID: &str = "ERR_RULES_VALIDATION_DUPLICATE_ID";

    /// Circular dependency between rules
    pub const CIRCULAR_DEPENDENCY: &str = "ERR_RULES_VALIDATION_CIRCULAR_DEPENDENCY";

    /// Missing required field
    pub const MISSING_REQUIRED_FIELD: &str = "ERR_RULES_VALIDATION_MISSING_REQUIRED_FIELD";

    /// Malformed condition
    pub const INVALID_CONDITION: &str = "ERR_RULES_VALIDATION_INVALID_CONDITION";

    /// Invalid configuration value
    pub const INVALID_CONFIG: &str = "ERR_RULES_VALIDATION_INVALID_CONFIG";
}

/// A trait for validators that check specific aspects of a rule-set document
pub trait Validator {
    /// Validate the document and return a list of validation errors (if any)
    fn validate(&self, document: &RuleDocument) -> Vec<ValidationError>;
}

/// Validate a parsed rule-set document, collecting every problem
pub fn validate_document(document: &RuleDocument) -> Result<(), RulesError> {
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(RuleValidator::new()),
        Box::new(DependencyValidator::new()),
    ];

    let mut errors = Vec::new();
    for validator in validators {
        errors.extend(validator.validate(document));
    }

    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "Rule document failed validation");
        return Err(RulesError::from_validation_errors(errors));
    }

    Ok(())
}
