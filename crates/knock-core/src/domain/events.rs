use crate::domain::node::NodeId;
use crate::domain::rule::TriggerKind;
use crate::types::Tick;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Domain event trait for everything that happens to a node
pub trait NodeEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the node this event is associated with
    fn node_id(&self) -> &NodeId;

    /// Returns the wall-clock time when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Event: Node created
#[derive(Debug)]
pub struct NodeCreated {
    /// The node identifier
    pub node_id: NodeId,

    /// The timestamp when the node was created
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent for NodeCreated {
    fn event_type(&self) -> &'static str {
        "node.created"
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Logical timestamp assigned
#[derive(Debug)]
pub struct TimestampAssigned {
    /// The node identifier
    pub node_id: NodeId,

    /// The assigned logical tick
    pub tick: Tick,

    /// The previous logical tick, if any
    pub previous: Option<Tick>,

    /// The timestamp when the assignment happened
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent for TimestampAssigned {
    fn event_type(&self) -> &'static str {
        "node.timestamp_assigned"
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Node initialized
#[derive(Debug)]
pub struct NodeInitialized {
    /// The node identifier
    pub node_id: NodeId,

    /// Seed the node was initialized with
    pub seed: i64,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent for NodeInitialized {
    fn event_type(&self) -> &'static str {
        "node.initialized"
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: A cascade reached its fixed point and was committed
#[derive(Debug)]
pub struct CascadeCompleted {
    /// The node identifier
    pub node_id: NodeId,

    /// What started the cascade
    pub trigger: TriggerKind,

    /// Number of consequences produced
    pub consequences: usize,

    /// Number of waves evaluated
    pub waves: u32,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent for CascadeCompleted {
    fn event_type(&self) -> &'static str {
        "cascade.completed"
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: A cascade failed and was discarded
#[derive(Debug)]
pub struct CascadeFailed {
    /// The node identifier
    pub node_id: NodeId,

    /// What started the cascade
    pub trigger: TriggerKind,

    /// Error message
    pub error: String,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent for CascadeFailed {
    fn event_type(&self) -> &'static str {
        "cascade.failed"
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Node finished
#[derive(Debug)]
pub struct NodeFinished {
    /// The node identifier
    pub node_id: NodeId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent for NodeFinished {
    fn event_type(&self) -> &'static str {
        "node.finished"
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Receives the events recorded by node operations
pub trait NodeEventHandler: Send + Sync {
    /// Handle a domain event
    fn handle_event(&self, event: Box<dyn NodeEvent>);
}

/// Event handler that reports every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

impl NodeEventHandler for TracingEventHandler {
    fn handle_event(&self, event: Box<dyn NodeEvent>) {
        tracing::debug!(
            node_id = %event.node_id(),
            event_type = event.event_type(),
            at = %event.timestamp(),
            "{:?}",
            event
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let node_id = NodeId::new();
        let now = Utc::now();

        let events: Vec<Box<dyn NodeEvent>> = vec![
            Box::new(NodeCreated {
                node_id: node_id.clone(),
                timestamp: now,
            }),
            Box::new(TimestampAssigned {
                node_id: node_id.clone(),
                tick: 5,
                previous: None,
                timestamp: now,
            }),
            Box::new(NodeInitialized {
                node_id: node_id.clone(),
                seed: 1,
                timestamp: now,
            }),
            Box::new(CascadeCompleted {
                node_id: node_id.clone(),
                trigger: TriggerKind::Initialize,
                consequences: 3,
                waves: 2,
                timestamp: now,
            }),
            Box::new(CascadeFailed {
                node_id: node_id.clone(),
                trigger: TriggerKind::Timer,
                error: "boom".to_string(),
                timestamp: now,
            }),
            Box::new(NodeFinished {
                node_id: node_id.clone(),
                timestamp: now,
            }),
        ];

        let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "node.created",
                "node.timestamp_assigned",
                "node.initialized",
                "cascade.completed",
                "cascade.failed",
                "node.finished",
            ]
        );
        assert!(events.iter().all(|e| e.node_id() == &node_id));
        assert!(events.iter().all(|e| e.timestamp() == now));
    }

    #[test]
    fn test_tracing_handler_accepts_events() {
        let handler = TracingEventHandler;
        handler.handle_event(Box::new(NodeCreated {
            node_id: NodeId::new(),
            timestamp: Utc::now(),
        }));
    }
}
