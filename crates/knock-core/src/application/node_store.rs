use std::sync::{Arc, PoisonError};
use tracing::info;

use crate::domain::events::NodeEventHandler;
use crate::domain::node::{Node, NodeId, NodeStatus};
use crate::domain::repository::NodeRepository;
use crate::types::{NodeState, Tick};
use crate::CoreError;

/// Owns node identity, state and logical time
///
/// Every access to a node goes through its mutex, so one node has a single
/// writer at a time. Domain events recorded by an operation are drained to
/// the event handler once the lock is released.
pub struct NodeStore {
    repository: Arc<dyn NodeRepository>,
    event_handler: Arc<dyn NodeEventHandler>,
}

impl NodeStore {
    /// Create a store over a repository
    pub fn new(
        repository: Arc<dyn NodeRepository>,
        event_handler: Arc<dyn NodeEventHandler>,
    ) -> Self {
        Self {
            repository,
            event_handler,
        }
    }

    /// Allocate a node with empty state and no timestamp
    pub fn create_node(&self) -> Result<NodeId, CoreError> {
        let mut node = Node::new();
        let events = node.take_events();
        let id = self.repository.insert(node)?;

        for event in events {
            self.event_handler.handle_event(event);
        }

        info!(node_id = %id, "Node created");
        Ok(id)
    }

    /// Assign a logical timestamp
    pub fn set_timestamp(&self, id: &NodeId, tick: Tick) -> Result<(), CoreError> {
        self.mutate_state(id, |node| node.set_timestamp(tick))
    }

    /// Snapshot of a node's state
    pub fn get_state(&self, id: &NodeId) -> Result<NodeState, CoreError> {
        self.read(id, |node| node.state.clone())
    }

    /// Current lifecycle status
    pub fn status(&self, id: &NodeId) -> Result<NodeStatus, CoreError> {
        self.read(id, |node| node.status)
    }

    /// Current logical timestamp
    pub fn timestamp(&self, id: &NodeId) -> Result<Option<Tick>, CoreError> {
        self.read(id, |node| node.timestamp)
    }

    /// Run `f` with exclusive access to a node
    ///
    /// Events recorded by `f` are dispatched whether it succeeds or not.
    pub(crate) fn mutate_state<R, F>(&self, id: &NodeId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Node) -> Result<R, CoreError>,
    {
        let shared = self
            .repository
            .find_by_id(id)
            .ok_or_else(|| CoreError::NodeNotFound(id.clone()))?;

        // A cascade only touches a working copy, so a poisoned node is still consistent
        let mut node = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut *node);
        let events = node.take_events();
        drop(node);

        for event in events {
            self.event_handler.handle_event(event);
        }

        result
    }

    fn read<R>(&self, id: &NodeId, f: impl FnOnce(&Node) -> R) -> Result<R, CoreError> {
        let shared = self
            .repository
            .find_by_id(id)
            .ok_or_else(|| CoreError::NodeNotFound(id.clone()))?;
        let node = shared.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&*node))
    }

    /// Remove a node and free its slot
    pub fn remove_node(&self, id: &NodeId) -> Result<(), CoreError> {
        if self.repository.remove(id) {
            info!(node_id = %id, "Node removed");
            Ok(())
        } else {
            Err(CoreError::NodeNotFound(id.clone()))
        }
    }

    /// IDs of all live nodes, sorted
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.repository.ids()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.repository.len()
    }

    /// Check if the store holds no nodes
    pub fn is_empty(&self) -> bool {
        self.repository.is_empty()
    }

    /// Drop every node, returning how many were removed
    pub fn clear(&self) -> usize {
        let count = self.repository.len();
        self.repository.clear();
        count
    }
}
