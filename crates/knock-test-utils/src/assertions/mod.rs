//! Assertion utilities for consequence sequences and node state.

use knock_core::{Cause, Consequences, NodeState};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Error type for consequence validation failures
#[derive(Debug, Error, PartialEq)]
pub enum ConsequenceAssertionError {
    #[error("Rule order mismatch: expected {expected:?}, got {actual:?}")]
    RuleOrder {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Consequence at position {position} has index {index}")]
    IndexGap { position: usize, index: usize },

    #[error("Consequence {index} is caused by {cause}, which is not an earlier consequence")]
    InvalidCause { index: usize, cause: usize },

    #[error("Waves go backwards at consequence {0}")]
    WaveOrder(usize),

    #[error("Rule {rule} fired twice in wave {wave}")]
    DuplicateFiring { rule: String, wave: u32 },

    #[error("Missing state key: {0}")]
    MissingStateKey(String),

    #[error("Invalid state value for {key}: expected {expected}, got {actual}")]
    InvalidStateValue {
        key: String,
        expected: String,
        actual: String,
    },
}

/// Asserts that consequences were produced by the given rules, in order.
pub fn assert_rule_order(
    consequences: &Consequences,
    expected: &[&str],
) -> Result<(), ConsequenceAssertionError> {
    let actual = consequences.rules();
    if actual != expected {
        return Err(ConsequenceAssertionError::RuleOrder {
            expected: expected.iter().map(|s| s.to_string()).collect(),
            actual: actual.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(())
}

/// Asserts the structural guarantees every cascade result must satisfy.
///
/// * indices run from 0 without gaps
/// * waves never decrease
/// * every cause points to an earlier consequence
/// * no rule appears in two separate runs within the same wave
pub fn assert_well_formed(consequences: &Consequences) -> Result<(), ConsequenceAssertionError> {
    let mut last_wave = 0;
    let mut fired: HashSet<(String, u32)> = HashSet::new();
    let mut previous_rule: Option<(&str, u32)> = None;

    for (position, consequence) in consequences.iter().enumerate() {
        if consequence.index != position {
            return Err(ConsequenceAssertionError::IndexGap {
                position,
                index: consequence.index,
            });
        }

        if consequence.wave < last_wave {
            return Err(ConsequenceAssertionError::WaveOrder(position));
        }
        last_wave = consequence.wave;

        if let Cause::Consequence(cause) = consequence.cause {
            if cause >= position {
                return Err(ConsequenceAssertionError::InvalidCause {
                    index: position,
                    cause,
                });
            }
        }

        // Effects of one firing are contiguous
        let rule = consequence.rule.as_str();
        if previous_rule != Some((rule, consequence.wave))
            && !fired.insert((rule.to_string(), consequence.wave))
        {
            return Err(ConsequenceAssertionError::DuplicateFiring {
                rule: rule.to_string(),
                wave: consequence.wave,
            });
        }
        previous_rule = Some((rule, consequence.wave));
    }

    Ok(())
}

/// Asserts that the state holds `expected` under `key`.
pub fn assert_state_value(
    state: &NodeState,
    key: &str,
    expected: Value,
) -> Result<(), ConsequenceAssertionError> {
    let actual = state
        .get(key)
        .ok_or_else(|| ConsequenceAssertionError::MissingStateKey(key.to_string()))?;

    if actual != &expected {
        return Err(ConsequenceAssertionError::InvalidStateValue {
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(())
}
