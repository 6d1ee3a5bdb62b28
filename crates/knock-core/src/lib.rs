//!
//! Knock Core - node store and cascade engine of the Knock simulation kernel
//!
//! A node is created, anchored to a logical timestamp and initialized with a
//! seed. Initialization runs a fixed-point cascade over a pluggable rule set
//! and returns every consequence it produced, in a deterministic order.
//!
//! ```
//! use knock_core::{Effect, FnRule, Kernel, KernelConfig, RuleRegistry};
//! use serde_json::json;
//!
//! let registry = RuleRegistry::new()
//!     .with_rule(FnRule::new("reset", |_| Ok(Some(vec![Effect::set("packets", json!(0))]))))
//!     .unwrap();
//! let kernel = Kernel::new(registry, KernelConfig::default()).unwrap();
//!
//! let node = kernel.create_node().unwrap();
//! node.set_timestamp(0).unwrap();
//! let consequences = node.initialize(1).unwrap();
//! assert_eq!(consequences.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - nodes, rules, consequences and events
pub mod domain;

/// Application services - registry, engine, store and kernel
pub mod application;

/// Core types
pub mod types;

/// Error types
pub mod error;

/// Kernel configuration
pub mod config;

// Re-export key types
pub use application::cascade_engine::{CascadeEngine, CascadeOutcome};
pub use application::context::ExecutionContext;
pub use application::kernel::{Kernel, NodeHandle};
pub use application::node_store::NodeStore;
pub use application::rule_registry::RuleRegistry;
pub use config::KernelConfig;
pub use domain::consequence::{
    Cause, CommunicationCommand, Consequence, Consequences, Effect, MobilityCommand, MobilityMode,
};
pub use domain::events::{NodeEvent, NodeEventHandler, TracingEventHandler};
pub use domain::node::{Node, NodeId, NodeStatus};
pub use domain::repository::{memory::MemoryNodeRepository, NodeRepository};
pub use domain::rule::{FnRule, Rule, RuleContext, RuleFn, RuleId, Trigger, TriggerKind};
pub use error::CoreError;
pub use types::{NodeState, Tick};
