//! instantiate::remap
//!
//! Structural copy of a template event under fresh ids.
//!
//! Every node of the template closure gets a new id. Edges whose destination
//! lies inside the closure are rewritten through the mapping; edges that
//! leave it (folders, banks, buses, audio files) keep their destination
//! until [`apply_overrides`] redirects the handful that must change.

use indexmap::IndexMap;
use log::warn;

use crate::core::ids::IdFactory;
use crate::core::object::GraphObject;
use crate::core::store::EventGraph;
use crate::core::types::{ObjectClass, ObjectId};

/// The old-id to new-id bijection of one copy.
#[derive(Debug, Clone, Default)]
pub struct Remap {
    map: IndexMap<ObjectId, ObjectId>,
}

impl Remap {
    /// The new id for `old`, if it was part of the template.
    pub fn get(&self, old: &ObjectId) -> Option<&ObjectId> {
        self.map.get(old)
    }

    /// Map an edge destination: internal ids are rewritten, others kept.
    pub fn translate(&self, id: &ObjectId) -> ObjectId {
        self.map.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    /// `(old, new)` pairs in template document order.
    pub fn pairs(&self) -> impl Iterator<Item = (&ObjectId, &ObjectId)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Copy `template` so that its root becomes `root` and every other node
/// gets a freshly minted id.
pub fn clone_template(template: &EventGraph, root: ObjectId, ids: &IdFactory) -> (EventGraph, Remap) {
    let mut remap = Remap::default();
    for old in template.nodes.keys() {
        let new = if old == &template.root {
            root.clone()
        } else {
            ids.mint()
        };
        remap.map.insert(old.clone(), new);
    }

    let nodes = template
        .nodes
        .values()
        .map(|node| {
            let mut copy = GraphObject::new(remap.translate(&node.id), node.class.clone());
            copy.properties = node.properties.clone();
            for (label, dests) in &node.edges {
                copy.set_edge(label.clone(), dests.iter().map(|d| remap.translate(d)));
            }
            (copy.id.clone(), copy)
        })
        .collect();

    let graph = EventGraph {
        root,
        model: template.model.clone(),
        nodes,
    };
    (graph, remap)
}

/// Caller-supplied values that replace template state.
#[derive(Debug, Clone, Copy)]
pub struct Overrides<'a> {
    pub name: &'a str,
    pub folder: &'a ObjectId,
    pub bank: &'a ObjectId,
    pub bus: &'a ObjectId,
}

/// Set the root name and the external edges of a copied event.
///
/// The root's `folder` and `banks` edges are replaced outright, and every
/// MixerInput in the copy has its `output` routed to the bus. Returns the
/// number of mixer inputs redirected.
pub fn apply_overrides(graph: &mut EventGraph, overrides: &Overrides<'_>) -> usize {
    let root_id = graph.root.clone();
    if let Some(root) = graph.nodes.get_mut(&root_id) {
        root.set_property("name", overrides.name);
        root.set_edge("folder", [overrides.folder.clone()]);
        root.set_edge("banks", [overrides.bank.clone()]);
    }

    let mut redirected = 0;
    for input in graph.nodes.values_mut() {
        if input.class == ObjectClass::MixerInput {
            input.set_edge("output", [overrides.bus.clone()]);
            redirected += 1;
        }
    }
    if redirected == 0 {
        warn!(
            "event {} has no mixer input; bus {} was not applied",
            root_id, overrides.bus
        );
    }
    redirected
}
