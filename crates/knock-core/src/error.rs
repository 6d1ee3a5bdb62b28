use thiserror::Error;

use crate::domain::node::{NodeId, NodeStatus};

/// Core error type for the Knock kernel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Timestamp outside the representable logical range
    #[error("Invalid timestamp: {0} (logical ticks must be non-negative)")]
    InvalidTimestamp(i64),

    /// A cascade was requested before any timestamp was assigned
    #[error("Timestamp was never set for node {0}")]
    UninitializedTimestamp(NodeId),

    /// Seed outside the domain recognised by the rule set
    #[error("Invalid seed {seed}: {reason}")]
    InvalidSeed {
        /// The rejected seed
        seed: i64,
        /// Why the rule set rejected it
        reason: String,
    },

    /// The cascade did not reach a fixed point within its bounds
    #[error("Cascade depth exceeded: {0}")]
    CascadeDepthExceeded(String),

    /// The store cannot host any more nodes
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Node not found in the store
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// `initialize` was called on a node that already went through it
    #[error("Node already initialized: {0}")]
    AlreadyInitialized(NodeId),

    /// Operation not allowed in the node's current status
    #[error("Cannot {operation} node {node} in state {status:?}")]
    InvalidTransition {
        /// Node the operation targeted
        node: NodeId,
        /// Status the node was in
        status: NodeStatus,
        /// Operation name
        operation: &'static str,
    },

    /// A rule reported a failure while being evaluated
    #[error("Rule '{rule}' failed: {message}")]
    RuleFailed {
        /// Rule identifier
        rule: String,
        /// Failure message
        message: String,
    },

    /// The rule set itself is malformed
    #[error("Rule set error: {0}")]
    RuleSetError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigurationError(err.to_string())
    }
}
