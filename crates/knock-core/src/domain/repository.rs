//! Repository trait for node storage
//!
//! The kernel owns its nodes through a `NodeRepository`. Each node lives
//! behind its own mutex so a cascade holds exclusive access to exactly one
//! node while other nodes stay available to other threads.

use std::sync::{Arc, Mutex};

use super::node::{Node, NodeId};
use crate::CoreError;

/// A node shared between the store and the operation currently using it
pub type SharedNode = Arc<Mutex<Node>>;

/// Repository for nodes
pub trait NodeRepository: Send + Sync {
    /// Store a new node, failing when no more nodes can be hosted
    fn insert(&self, node: Node) -> Result<NodeId, CoreError>;

    /// Find a node by ID
    fn find_by_id(&self, id: &NodeId) -> Option<SharedNode>;

    /// Remove a node, returning whether it existed
    fn remove(&self, id: &NodeId) -> bool;

    /// All node IDs, sorted
    fn ids(&self) -> Vec<NodeId>;

    /// Number of stored nodes
    fn len(&self) -> usize;

    /// Check if the repository holds no nodes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every node
    fn clear(&self);
}

/// Memory implementation
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory node repository backed by a concurrent map
    pub struct MemoryNodeRepository {
        nodes: DashMap<NodeId, SharedNode>,
        reserved: AtomicUsize,
        capacity: Option<usize>,
    }

    impl MemoryNodeRepository {
        /// Create an unbounded repository
        pub fn new() -> Self {
            Self::with_capacity(None)
        }

        /// Create a repository that hosts at most `capacity` nodes
        pub fn with_capacity(capacity: Option<usize>) -> Self {
            Self {
                nodes: DashMap::with_capacity(capacity.unwrap_or(16).min(1024)),
                reserved: AtomicUsize::new(0),
                capacity,
            }
        }

        fn reserve_slot(&self) -> Result<(), CoreError> {
            let capacity = match self.capacity {
                Some(capacity) => capacity,
                None => {
                    self.reserved.fetch_add(1, Ordering::SeqCst);
                    return Ok(());
                }
            };

            self.reserved
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                    (used < capacity).then_some(used + 1)
                })
                .map(|_| ())
                .map_err(|used| {
                    CoreError::ResourceExhausted(format!(
                        "node store is full ({} of {} nodes)",
                        used, capacity
                    ))
                })
        }
    }

    impl Default for MemoryNodeRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    impl NodeRepository for MemoryNodeRepository {
        fn insert(&self, node: Node) -> Result<NodeId, CoreError> {
            self.reserve_slot()?;
            let id = node.id.clone();
            self.nodes.insert(id.clone(), Arc::new(Mutex::new(node)));
            Ok(id)
        }

        fn find_by_id(&self, id: &NodeId) -> Option<SharedNode> {
            self.nodes.get(id).map(|entry| Arc::clone(entry.value()))
        }

        fn remove(&self, id: &NodeId) -> bool {
            if self.nodes.remove(id).is_some() {
                self.reserved.fetch_sub(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        }

        fn ids(&self) -> Vec<NodeId> {
            let mut ids: Vec<NodeId> = self.nodes.iter().map(|e| e.key().clone()).collect();
            ids.sort();
            ids
        }

        fn len(&self) -> usize {
            self.nodes.len()
        }

        fn clear(&self) {
            // Release only the slots of removed nodes, an in-flight insert keeps its own
            self.nodes.retain(|_, _| {
                self.reserved.fetch_sub(1, Ordering::SeqCst);
                false
            });
        }
    }

}
