//! YAML parsing.

use crate::document::RuleDocument;
use crate::error::RulesError;

/// Document versions this crate understands
pub const SUPPORTED_VERSION: &str = "1.0";

/// Parse a YAML string into a RuleDocument.
///
/// Only the structure and the version are checked here. Cross-rule checks
/// (ids, dependencies) are handled by the validation module.
pub fn parse_rule_document(yaml_str: &str) -> Result<RuleDocument, RulesError> {
    let document: RuleDocument = serde_yaml::from_str(yaml_str)?;

    if document.version != SUPPORTED_VERSION {
        return Err(RulesError::UnsupportedVersion(document.version));
    }

    Ok(document)
}
