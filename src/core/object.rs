//! core::object
//!
//! The generic graph node.
//!
//! Every object in a project, whatever its class, is a typed node with an
//! ordered property map and an ordered map of labelled edges. Edges point at
//! other objects by id; an edge label maps to an ordered destination list.
//!
//! # Example
//!
//! ```
//! use eventforge::core::object::GraphObject;
//! use eventforge::core::types::{ObjectClass, ObjectId};
//!
//! let master = ObjectId::new("MEF").unwrap();
//! let folder = GraphObject::new(ObjectId::new("F1").unwrap(), ObjectClass::EventFolder)
//!     .with_property("name", "Characters")
//!     .with_edge("folder", [master.clone()]);
//!
//! assert_eq!(folder.name(), Some("Characters"));
//! assert_eq!(folder.single_edge("folder"), Some(&master));
//! ```

use indexmap::IndexMap;

use super::types::{ObjectClass, ObjectId};

/// A single object element.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphObject {
    pub id: ObjectId,
    pub class: ObjectClass,
    pub properties: IndexMap<String, String>,
    pub edges: IndexMap<String, Vec<ObjectId>>,
}

impl GraphObject {
    pub fn new(id: ObjectId, class: ObjectClass) -> Self {
        Self {
            id,
            class,
            properties: IndexMap::new(),
            edges: IndexMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Builder-style edge setter.
    pub fn with_edge(
        mut self,
        label: impl Into<String>,
        destinations: impl IntoIterator<Item = ObjectId>,
    ) -> Self {
        self.set_edge(label, destinations);
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Set a property, keeping its original position if it already existed.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// The `name` property, which most user-visible classes carry.
    pub fn name(&self) -> Option<&str> {
        self.property("name")
    }

    /// All destinations of an edge (empty if the edge is absent).
    pub fn edge(&self, label: &str) -> &[ObjectId] {
        self.edges.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first destination of an edge, for single-valued relationships.
    pub fn single_edge(&self, label: &str) -> Option<&ObjectId> {
        self.edge(label).first()
    }

    pub fn has_edge(&self, label: &str) -> bool {
        self.edges.contains_key(label)
    }

    /// Replace an edge's destinations, keeping its position if present.
    pub fn set_edge(
        &mut self,
        label: impl Into<String>,
        destinations: impl IntoIterator<Item = ObjectId>,
    ) {
        self.edges
            .insert(label.into(), destinations.into_iter().collect());
    }

    /// Append one destination to an edge, creating the edge if needed.
    pub fn push_edge(&mut self, label: impl Into<String>, destination: ObjectId) {
        self.edges.entry(label.into()).or_default().push(destination);
    }

    /// Every `(label, destination)` pair in document order.
    pub fn outgoing(&self) -> impl Iterator<Item = (&str, &ObjectId)> {
        self.edges
            .iter()
            .flat_map(|(label, dests)| dests.iter().map(move |d| (label.as_str(), d)))
    }
}
