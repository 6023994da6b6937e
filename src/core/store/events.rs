//! core::store::events
//!
//! On-demand event access.
//!
//! Events are not indexed at open. Listing a folder scans `Metadata/Event/`
//! and parses every document, so each call costs O(total events). Loading a
//! single event reads one document and extracts the private closure of the
//! Event object: every object in the same file reachable from it through
//! edges.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use indexmap::IndexMap;
use log::debug;

use super::{read_dir_documents, read_document, ProjectStore, StoreError};
use crate::core::object::GraphObject;
use crate::core::types::{ManagedKind, ObjectClass, ObjectId, SerializationModel};

/// A lightweight description of an event found by a folder scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub id: ObjectId,
    pub name: String,
    /// The event's `folder` edge, if any.
    pub folder: Option<ObjectId>,
    /// The document the event was read from.
    pub file: PathBuf,
}

/// An Event object and its closure, keyed by id in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventGraph {
    pub root: ObjectId,
    pub model: SerializationModel,
    pub nodes: IndexMap<ObjectId, GraphObject>,
}

impl EventGraph {
    /// Extract the closure of `root` from a set of co-located objects.
    ///
    /// Returns `None` if no Event with that id is among `objects`. Edges that
    /// leave the set are kept on the nodes but not followed.
    pub fn extract(
        root: &ObjectId,
        model: SerializationModel,
        objects: &[GraphObject],
    ) -> Option<Self> {
        let by_id: HashMap<&ObjectId, &GraphObject> =
            objects.iter().map(|o| (&o.id, o)).collect();
        let start = by_id.get(root).filter(|o| o.class == ObjectClass::Event)?;

        let mut reached: IndexMap<ObjectId, ()> = IndexMap::new();
        let mut queue = VecDeque::from([*start]);
        reached.insert(root.clone(), ());
        while let Some(object) = queue.pop_front() {
            for (_, dest) in object.outgoing() {
                if reached.contains_key(dest) {
                    continue;
                }
                if let Some(next) = by_id.get(dest) {
                    reached.insert(dest.clone(), ());
                    queue.push_back(*next);
                }
            }
        }

        // Keep document order rather than discovery order.
        let nodes = objects
            .iter()
            .filter(|o| reached.contains_key(&o.id))
            .map(|o| (o.id.clone(), o.clone()))
            .collect();

        Some(Self {
            root: root.clone(),
            model,
            nodes,
        })
    }

    /// The Event object itself.
    pub fn root_object(&self) -> Option<&GraphObject> {
        self.nodes.get(&self.root)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&GraphObject> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes of one class, in document order.
    pub fn of_class<'a>(&'a self, class: &'a ObjectClass) -> impl Iterator<Item = &'a GraphObject> {
        self.nodes.values().filter(move |o| &o.class == class)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consume the graph, yielding its objects with the root first.
    pub fn into_objects(mut self) -> Vec<GraphObject> {
        let mut objects = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.nodes.shift_remove(&self.root) {
            objects.push(root);
        }
        objects.extend(self.nodes.into_values());
        objects
    }
}

impl ProjectStore {
    /// Events whose folder is `folder` or one of its descendants.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `folder` is not a committed event folder
    /// - [`StoreError::Parse`] if any event document is malformed
    pub fn events_in_folder(&self, folder: &ObjectId) -> Result<Vec<EventSummary>, StoreError> {
        self.resolve(ManagedKind::EventFolder, folder)?;

        let mut events = Vec::new();
        for (file, doc) in read_dir_documents(&self.paths().event_dir())? {
            for object in doc.all_of(&ObjectClass::Event) {
                let parent = object.single_edge("folder").cloned();
                let inside = parent.as_ref().is_some_and(|p| {
                    p == folder || self.is_descendant(ManagedKind::EventFolder, p, folder)
                });
                if inside {
                    events.push(EventSummary {
                        id: object.id.clone(),
                        name: object.name().unwrap_or_default().to_string(),
                        folder: parent,
                        file: file.clone(),
                    });
                }
            }
        }

        events.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        debug!("{} events under folder {}", events.len(), folder);
        Ok(events)
    }

    /// Load an Event and its in-document closure.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `Event/<id>.xml` is missing or holds no
    ///   Event with that id
    /// - [`StoreError::Parse`] if the document is malformed
    pub fn load_event(&self, id: &ObjectId) -> Result<EventGraph, StoreError> {
        let path = self
            .paths()
            .object_path(&ObjectClass::Event, id)
            .ok_or_else(|| StoreError::not_found("event", id))?;
        if !path.exists() {
            return Err(StoreError::not_found("event", id));
        }
        let doc = read_document(&path)?;
        let graph = EventGraph::extract(id, doc.model.clone(), &doc.objects)
            .ok_or_else(|| StoreError::not_found("event", id))?;
        debug!("loaded event {} ({} nodes)", id, graph.len());
        Ok(graph)
    }

    /// Whether an Event document exists for `id`.
    pub fn has_event(&self, id: &ObjectId) -> bool {
        self.paths()
            .object_path(&ObjectClass::Event, id)
            .is_some_and(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    fn model() -> SerializationModel {
        SerializationModel::new("Studio.02.02.00").unwrap()
    }

    #[test]
    fn closure_follows_edges_within_document() {
        let objects = vec![
            GraphObject::new(id("E"), ObjectClass::Event)
                .with_edge("folder", [id("F-outside")])
                .with_edge("timeline", [id("T")]),
            GraphObject::new(id("T"), ObjectClass::Timeline).with_edge("modules", [id("S")]),
            GraphObject::new(id("S"), ObjectClass::SingleSound),
            GraphObject::new(id("orphan"), ObjectClass::SingleSound),
        ];
        let graph = EventGraph::extract(&id("E"), model(), &objects).unwrap();
        assert_eq!(graph.len(), 3);
        assert!(graph.contains(&id("S")));
        assert!(!graph.contains(&id("orphan")));
        assert!(!graph.contains(&id("F-outside")));
    }

    #[test]
    fn extract_requires_event_root() {
        let objects = vec![GraphObject::new(id("T"), ObjectClass::Timeline)];
        assert!(EventGraph::extract(&id("T"), model(), &objects).is_none());
        assert!(EventGraph::extract(&id("E"), model(), &objects).is_none());
    }

    #[test]
    fn into_objects_puts_root_first() {
        let objects = vec![
            GraphObject::new(id("T"), ObjectClass::Timeline),
            GraphObject::new(id("E"), ObjectClass::Event).with_edge("timeline", [id("T")]),
        ];
        let graph = EventGraph::extract(&id("E"), model(), &objects).unwrap();
        let out = graph.into_objects();
        assert_eq!(out[0].id, id("E"));
        assert_eq!(out[1].id, id("T"));
    }

    #[test]
    fn cyclic_edges_terminate() {
        let objects = vec![
            GraphObject::new(id("E"), ObjectClass::Event).with_edge("mixer", [id("M")]),
            GraphObject::new(id("M"), ObjectClass::EventMixer).with_edge("owner", [id("E")]),
        ];
        let graph = EventGraph::extract(&id("E"), model(), &objects).unwrap();
        assert_eq!(graph.len(), 2);
    }
}
