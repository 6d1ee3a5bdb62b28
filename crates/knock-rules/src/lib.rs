//! # Knock Rules
//!
//! Parsing, validation and compilation of YAML rule-set documents.
//!
//! A rule-set document looks like this:
//!
//! ```yaml
//! version: "1.0"
//! seeds: { min: 0, max: 100 }
//! rules:
//!   - id: reset
//!     then:
//!       - { effect: set, attr: packets, value: 0 }
//!   - id: collect
//!     on: [timer]
//!     then:
//!       - { effect: increment, attr: packets }
//!       - { effect: timer, after: 1 }
//!   - id: reply
//!     on: [message]
//!     when:
//!       - { attr: payload.sender, op: eq, value: drone }
//!     then:
//!       - { effect: send, message: { from: packets } }
//!       - { effect: set, attr: packets, value: 0 }
//! ```
//!
//! ```
//! let yaml = r#"
//! version: "1.0"
//! rules:
//!   - id: reset
//!     then:
//!       - { effect: set, attr: packets, value: 0 }
//! "#;
//!
//! let registry = knock_rules::load_rules(yaml).unwrap();
//! assert_eq!(registry.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compile;
pub mod document;
pub mod error;
pub mod parser;
pub mod validation;

pub use compile::{compile, DeclarativeRule};
pub use document::{
    AttributeRef, ConditionDefinition, ConditionOp, EffectDefinition, ObjectTemplate,
    RuleDefinition, RuleDocument, SeedDomain, ValueSource,
};
pub use error::RulesError;
pub use validation::ValidationError;

use knock_core::RuleRegistry;
use std::path::Path;

/// Parse and validate a rule-set document from a YAML string.
///
/// Every validation problem is reported, not just the first one.
pub fn parse_and_validate_rules(yaml_str: &str) -> Result<RuleDocument, RulesError> {
    let document = parser::parse_rule_document(yaml_str)?;
    validation::validate_document(&document)?;
    Ok(document)
}

/// Parse, validate and compile a rule-set document
pub fn load_rules(yaml_str: &str) -> Result<RuleRegistry, RulesError> {
    let document = parse_and_validate_rules(yaml_str)?;
    Ok(compile(&document)?)
}

/// Read and compile a rules file
pub fn load_rules_file(path: impl AsRef<Path>) -> Result<RuleRegistry, RulesError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    tracing::info!(path = %path.display(), "Loading rules file");
    load_rules(&contents)
}

/// Get the version of the crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
