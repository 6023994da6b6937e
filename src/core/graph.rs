//! core::graph
//!
//! Parent-pointer hierarchy over object ids.
//!
//! # Architecture
//!
//! Event folders, banks and buses each form a tree where:
//! - Nodes are object ids
//! - Edges point from child to parent (the `folder` or `output` edge)
//! - Roots are the master objects
//!
//! The hierarchy is built once at project open and extended as objects are
//! committed. Ancestry queries walk parent pointers on demand, so they cost
//! O(depth) per call.
//!
//! # Invariants
//!
//! - Each node has at most one parent
//! - Walks terminate even when external edits have introduced a cycle

use std::collections::{BTreeSet, HashMap, HashSet};

use super::types::ObjectId;

/// A parent-pointer tree (or forest) of object ids.
#[derive(Debug, Default, Clone)]
pub struct Hierarchy {
    /// Parent pointer for each non-root node
    parents: HashMap<ObjectId, ObjectId>,
    /// Cached children sets (derived from parents)
    children: HashMap<ObjectId, BTreeSet<ObjectId>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parent relationship.
    ///
    /// This also updates the children cache. Re-parenting a node moves it.
    pub fn add_edge(&mut self, child: ObjectId, parent: ObjectId) {
        if let Some(old) = self.parents.get(&child) {
            if let Some(siblings) = self.children.get_mut(old) {
                siblings.remove(&child);
            }
        }
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.parents.insert(child, parent);
    }

    pub fn parent(&self, id: &ObjectId) -> Option<&ObjectId> {
        self.parents.get(id)
    }

    /// Direct children, in id order.
    pub fn children(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.children
            .get(id)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get all ancestors (parent, grandparent, ...), nearest first.
    ///
    /// Stops if a cycle is encountered.
    ///
    /// # Example
    ///
    /// ```
    /// use eventforge::core::graph::Hierarchy;
    /// use eventforge::core::types::ObjectId;
    ///
    /// let id = |s: &str| ObjectId::new(s).unwrap();
    /// let mut tree = Hierarchy::new();
    /// tree.add_edge(id("chars"), id("master"));
    /// tree.add_edge(id("boss"), id("chars"));
    ///
    /// assert_eq!(tree.ancestors(&id("boss")), vec![id("chars"), id("master")]);
    /// ```
    pub fn ancestors(&self, id: &ObjectId) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.parent(id);

        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            result.push(parent.clone());
            current = self.parent(parent);
        }

        result
    }

    /// Whether `ancestor` is reachable from `id` through parent pointers.
    ///
    /// A node is not its own descendant.
    pub fn is_descendant(&self, id: &ObjectId, ancestor: &ObjectId) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if !seen.insert(parent.clone()) {
                return false;
            }
            current = self.parent(parent);
        }
        false
    }
}
