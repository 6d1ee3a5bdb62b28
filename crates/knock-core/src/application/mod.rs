/// Ordered rule registry
pub mod rule_registry;

/// Fixed-point cascade engine
pub mod cascade_engine;

/// Node store on top of a repository
pub mod node_store;

/// Kernel facade and node handles
pub mod kernel;

/// Scoped execution context
pub mod context;
