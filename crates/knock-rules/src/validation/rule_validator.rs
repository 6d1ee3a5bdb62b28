use std::collections::BTreeSet;

use crate::document::{EffectDefinition, RuleDefinition, RuleDocument};
use crate::validation::{error_codes, ValidationError, Validator};

/// Validates rule identity, the seed domain and the shape of conditions and effects
#[derive(Debug, Default)]
pub struct RuleValidator {}

impl RuleValidator {
    /// Create a new rule validator
    pub fn new() -> Self {
        RuleValidator {}
    }

    fn validate_ids(&self, document: &RuleDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();

        for (idx, rule) in document.rules.iter().enumerate() {
            if rule.id.trim().is_empty() {
                errors.push(ValidationError {
                    code: error_codes::MISSING_REQUIRED_FIELD,
                    message: "Rule ID must not be empty".to_string(),
                    path: Some(format!("rules[{}].id", idx)),
                });
            } else if !seen.insert(rule.id.as_str()) {
                duplicates.insert(rule.id.as_str());
            }
        }

        for duplicate in duplicates {
            errors.push(ValidationError {
                code: error_codes::DUPLICATE_ID,
                message: format!("Duplicate rule ID: '{}' - rule IDs must be unique", duplicate),
                path: Some("rules".to_string()),
            });
        }

        errors
    }

    fn validate_rule(&self, rule: &RuleDefinition, path: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if rule.on.is_empty() && rule.watch.is_empty() {
            errors.push(ValidationError {
                code: error_codes::INVALID_CONFIG,
                message: format!("Rule '{}' has no trigger and watches nothing, it can never run", rule.id),
                path: Some(path.to_string()),
            });
        }

        for (idx, condition) in rule.when.iter().enumerate() {
            let condition_path = format!("{}.when[{}]", path, idx);
            if condition.attr.is_empty() {
                errors.push(ValidationError {
                    code: error_codes::MISSING_REQUIRED_FIELD,
                    message: "Condition attribute must not be empty".to_string(),
                    path: Some(condition_path.clone()),
                });
            }
            match (condition.op.needs_value(), &condition.value) {
                (true, None) => errors.push(ValidationError {
                    code: error_codes::INVALID_CONDITION,
                    message: format!("Operator '{}' requires a value", condition.op),
                    path: Some(condition_path),
                }),
                (false, Some(_)) => errors.push(ValidationError {
                    code: error_codes::INVALID_CONDITION,
                    message: format!("Operator '{}' does not take a value", condition.op),
                    path: Some(condition_path),
                }),
                _ => {}
            }
        }

        for (idx, effect) in rule.then.iter().enumerate() {
            let effect_path = format!("{}.then[{}]", path, idx);
            if effect.written_attribute() == Some("") {
                errors.push(ValidationError {
                    code: error_codes::MISSING_REQUIRED_FIELD,
                    message: "Effect attribute must not be empty".to_string(),
                    path: Some(effect_path.clone()),
                });
            }
            if let EffectDefinition::Timer { after, .. } = effect {
                if *after < 0 {
                    errors.push(ValidationError {
                        code: error_codes::INVALID_CONFIG,
                        message: format!("Timer delay must be non-negative, got {}", after),
                        path: Some(effect_path),
                    });
                }
            }
        }

        errors
    }
}

impl Validator for RuleValidator {
    fn validate(&self, document: &RuleDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if document.seeds.min > document.seeds.max {
            errors.push(ValidationError {
                code: error_codes::INVALID_CONFIG,
                message: format!(
                    "Seed range is empty: min {} is greater than max {}",
                    document.seeds.min, document.seeds.max
                ),
                path: Some("seeds".to_string()),
            });
        }

        errors.extend(self.validate_ids(document));

        for (idx, rule) in document.rules.iter().enumerate() {
            errors.extend(self.validate_rule(rule, &format!("rules[{}]", idx)));
        }

        errors
    }
}
