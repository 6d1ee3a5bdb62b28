/// Node aggregate
pub mod node;

/// Domain events
pub mod events;

/// Consequence records and effects
pub mod consequence;

/// Rule trait and triggers
pub mod rule;

/// Repository interfaces
pub mod repository;
