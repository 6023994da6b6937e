//! core::store::index
//!
//! Per-kind read indices.
//!
//! Each managed kind keeps a lightweight entry per object (`{id, class,
//! name, position}`) rather than the object itself. Parent-pointer kinds
//! also maintain a [`Hierarchy`]; asset folders maintain a path lookup.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::core::graph::Hierarchy;
use crate::core::object::GraphObject;
use crate::core::types::{AssetPath, ManagedKind, ObjectClass, ObjectId};

/// Where an object sits in its kind's hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// A root: a master folder, or the bus with no `output` edge.
    Root,
    /// Child of another object of the same kind.
    Parent(ObjectId),
    /// An asset folder, positioned by path.
    Path(AssetPath),
}

/// A lightweight description of an indexed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ObjectId,
    pub class: ObjectClass,
    pub name: String,
    pub position: Position,
}

impl IndexEntry {
    /// Derive an entry from an object of a managed kind.
    ///
    /// Returns `None` if the object does not belong to `kind`. Asset folders
    /// without a valid `assetPath` are also rejected with `None`.
    pub fn from_object(kind: ManagedKind, object: &GraphObject) -> Option<Self> {
        let root = matches!(
            (kind, &object.class),
            (ManagedKind::EventFolder, ObjectClass::MasterEventFolder)
                | (ManagedKind::Bank, ObjectClass::MasterBankFolder)
                | (ManagedKind::AssetFolder, ObjectClass::MasterAssetFolder)
        );
        if !root && !kind.accepts(&object.class) {
            return None;
        }

        let position = match kind.parent_edge() {
            _ if root && kind == ManagedKind::AssetFolder => Position::Path(AssetPath::root()),
            _ if root => Position::Root,
            Some(edge) => match object.single_edge(edge) {
                Some(parent) => Position::Parent(parent.clone()),
                None => Position::Root,
            },
            None => {
                let path = AssetPath::new(object.property("assetPath")?).ok()?;
                Position::Path(path)
            }
        };

        let name = match &position {
            Position::Path(path) => object
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| path.name().to_string()),
            _ => object.name().unwrap_or_default().to_string(),
        };

        Some(Self {
            id: object.id.clone(),
            class: object.class.clone(),
            name,
            position,
        })
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        match &self.position {
            Position::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    pub fn asset_path(&self) -> Option<&AssetPath> {
        match &self.position {
            Position::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        match &self.position {
            Position::Root => true,
            Position::Path(path) => path.is_root(),
            Position::Parent(_) => false,
        }
    }
}

/// The committed objects of one kind.
#[derive(Debug, Clone)]
pub struct KindIndex {
    kind: ManagedKind,
    entries: IndexMap<ObjectId, IndexEntry>,
    tree: Hierarchy,
    by_path: HashMap<AssetPath, ObjectId>,
}

impl KindIndex {
    pub fn new(kind: ManagedKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
            tree: Hierarchy::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ManagedKind {
        self.kind
    }

    pub fn insert(&mut self, entry: IndexEntry) {
        match &entry.position {
            Position::Parent(parent) => self.tree.add_edge(entry.id.clone(), parent.clone()),
            Position::Path(path) => {
                self.by_path.insert(path.clone(), entry.id.clone());
            }
            Position::Root => {}
        }
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &ObjectId) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries in load/commit order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn roots(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values().filter(|e| e.is_root())
    }

    pub fn tree(&self) -> &Hierarchy {
        &self.tree
    }

    pub fn by_path(&self, path: &AssetPath) -> Option<&IndexEntry> {
        self.by_path.get(path).and_then(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn folder_entry_uses_folder_edge() {
        let obj = GraphObject::new(id("F2"), ObjectClass::EventFolder)
            .with_property("name", "Boss")
            .with_edge("folder", [id("F1")]);
        let entry = IndexEntry::from_object(ManagedKind::EventFolder, &obj).unwrap();
        assert_eq!(entry.name, "Boss");
        assert_eq!(entry.parent(), Some(&id("F1")));
    }

    #[test]
    fn bus_without_output_is_root() {
        let master = GraphObject::new(id("M"), ObjectClass::MixerMaster);
        let entry = IndexEntry::from_object(ManagedKind::Bus, &master).unwrap();
        assert!(entry.is_root());

        let group = GraphObject::new(id("X"), ObjectClass::MixerGroup)
            .with_edge("output", [id("M")]);
        let entry = IndexEntry::from_object(ManagedKind::Bus, &group).unwrap();
        assert_eq!(entry.position, Position::Parent(id("M")));
    }

    #[test]
    fn asset_folder_uses_path() {
        let obj = GraphObject::new(id("A"), ObjectClass::AssetFolder)
            .with_property("assetPath", "Characters/Boss/");
        let entry = IndexEntry::from_object(ManagedKind::AssetFolder, &obj).unwrap();
        assert_eq!(entry.name, "Boss");
        assert_eq!(entry.asset_path().unwrap().as_str(), "Characters/Boss/");
    }

    #[test]
    fn asset_folder_without_path_is_skipped() {
        let obj = GraphObject::new(id("A"), ObjectClass::AssetFolder);
        assert!(IndexEntry::from_object(ManagedKind::AssetFolder, &obj).is_none());
    }

    #[test]
    fn master_folders_are_roots() {
        let obj = GraphObject::new(id("MA"), ObjectClass::MasterAssetFolder);
        let entry = IndexEntry::from_object(ManagedKind::AssetFolder, &obj).unwrap();
        assert!(entry.is_root());
        let obj = GraphObject::new(id("MEF"), ObjectClass::MasterEventFolder);
        let entry = IndexEntry::from_object(ManagedKind::EventFolder, &obj).unwrap();
        assert_eq!(entry.position, Position::Root);
    }

    #[test]
    fn foreign_classes_are_skipped() {
        let chain = GraphObject::new(id("C"), ObjectClass::MixerBusEffectChain);
        assert!(IndexEntry::from_object(ManagedKind::Bus, &chain).is_none());
        let bank = GraphObject::new(id("B"), ObjectClass::Bank);
        assert!(IndexEntry::from_object(ManagedKind::EventFolder, &bank).is_none());
    }

    #[test]
    fn index_tracks_tree_and_paths() {
        let mut index = KindIndex::new(ManagedKind::AssetFolder);
        let obj = GraphObject::new(id("A"), ObjectClass::AssetFolder)
            .with_property("assetPath", "Sfx/");
        index.insert(IndexEntry::from_object(ManagedKind::AssetFolder, &obj).unwrap());
        assert!(index.by_path(&AssetPath::new("Sfx").unwrap()).is_some());
        assert_eq!(index.len(), 1);
    }
}
