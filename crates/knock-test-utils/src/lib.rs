//! Testing utilities for the Knock simulation kernel.
//!
//! This crate provides rule-set fixtures, a builder for small ad-hoc rule
//! sets, assertion helpers for consequence sequences, and mocks of the
//! kernel's extension traits.

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mocks;
pub mod util;

/// Re-export commonly used types for convenience
pub use mockall;

pub use assertions::ConsequenceAssertionError;
pub use builders::RuleSetBuilder;
pub use fixtures::{chain_rules, counter_rules, oscillating_rules, sensor_rules};
