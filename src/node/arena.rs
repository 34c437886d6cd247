//! Arena of node slots keyed by stable path.

use crate::error::{FormError, FormResult};
use crate::expr::ValueLookup;
use crate::node::core::SchemaNode;
use crate::pointer::JsonPointer;
use serde_json::Value;
use std::collections::HashMap;

/// Index of a node slot in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Slot arena owning every node of one form tree.
///
/// Removal tombstones the slot; slot indices are never reused within a tree's
/// lifetime, so a stale `NodeId` can never alias a different node.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<SchemaNode>>,
    index: HashMap<JsonPointer, NodeId>,
    root: Option<NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot and construct the node into it.
    pub fn insert_with(&mut self, build: impl FnOnce(NodeId) -> SchemaNode) -> NodeId {
        let id = NodeId(self.slots.len());
        let node = build(id);
        debug_assert!(
            !self.index.contains_key(&node.path),
            "path collision at {}",
            node.path
        );
        self.index.insert(node.path.clone(), id);
        self.slots.push(Some(node));
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// The root node id.
    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SchemaNode> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Fetch a node, treating absence as an internal invariant violation.
    pub fn expect(&self, id: NodeId) -> FormResult<&SchemaNode> {
        self.get(id)
            .ok_or_else(|| FormError::internal(format!("node slot {:?} is tombstoned", id)))
    }

    pub fn expect_mut(&mut self, id: NodeId) -> FormResult<&mut SchemaNode> {
        self.get_mut(id)
            .ok_or_else(|| FormError::internal(format!("node slot {:?} is tombstoned", id)))
    }

    /// The node id at a path, if one exists.
    pub fn id_at(&self, path: &JsonPointer) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// The node at a path, if one exists.
    pub fn node_at(&self, path: &JsonPointer) -> Option<&SchemaNode> {
        self.id_at(path).and_then(|id| self.get(id))
    }

    /// Tombstone a node and its whole subtree, unregistering paths.
    pub fn remove_subtree(&mut self, id: NodeId) {
        let Some(node) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.index.remove(&node.path);
        for child in node.children {
            self.remove_subtree(child);
        }
    }

    /// Iterate live nodes.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaNode> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Iterate live nodes mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SchemaNode> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ValueLookup for NodeArena {
    fn value_at(&self, pointer: &JsonPointer) -> Option<Value> {
        if let Some(node) = self.node_at(pointer) {
            return Some(node.value.clone());
        }
        // Fall back to pointing into the nearest materialized ancestor
        let root = self.root.and_then(|id| self.get(id))?;
        pointer.lookup(&root.value).cloned()
    }
}
