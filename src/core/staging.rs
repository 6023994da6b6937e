//! core::staging
//!
//! Transient pending area for new folders, banks, buses and asset folders.
//!
//! # Architecture
//!
//! A [`Staging`] value is owned by the caller and holds one insertion-ordered
//! table per [`ManagedKind`]. Records carry their final id from the moment
//! they are built, so hosts can wire records to each other (a folder under a
//! pending folder, a bus under a pending bus) before anything is on disk.
//!
//! # Commit
//!
//! [`Staging::commit_all`] walks the kinds in [`ManagedKind::ALL`] order.
//! Within a kind it makes repeated passes over the remaining records,
//! committing every record whose parent is ready, until a pass commits
//! nothing. A record is ready when:
//!
//! - its parent edge is absent, or names an object already committed
//!   (including one committed earlier in the same call), or
//! - for asset folders, its path's parent is the root or a committed asset
//!   folder path.
//!
//! Records left over form cycles or hang off missing parents. They are
//! reported together in [`StagingError::DependencyUnresolved`] and stay
//! pending; later kinds are not attempted. Files written before the failure
//! stay on disk.
//!
//! # Example
//!
//! ```ignore
//! use eventforge::core::ids::IdFactory;
//! use eventforge::core::staging::{PendingRecord, Staging};
//! use eventforge::core::types::ManagedKind;
//!
//! let ids = IdFactory::new();
//! let mut staging = Staging::new();
//!
//! let chars = PendingRecord::event_folder(&ids, "Characters", store.root(ManagedKind::EventFolder).clone());
//! let boss = PendingRecord::event_folder(&ids, "Boss", chars.id().clone());
//! staging.stage(&store, ManagedKind::EventFolder, boss)?;
//! staging.stage(&store, ManagedKind::EventFolder, chars)?;
//!
//! let counts = staging.commit_all(&mut store)?;
//! assert_eq!(counts.event_folders, 2);
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info, warn};
use thiserror::Error;

use super::ids::IdFactory;
use super::object::GraphObject;
use super::ops::journal::{Journal, JournalError};
use super::store::{IndexEntry, ProjectStore, StoreError};
use super::types::{AssetPath, ManagedKind, ObjectClass, ObjectId};

/// Errors from staging and commit.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The id is already pending or committed.
    #[error("id already in use: {0}")]
    DuplicateId(ObjectId),

    /// Another asset folder, committed or pending, already has this path.
    ///
    /// Asset folders are identified by path, so this is the asset-folder form
    /// of [`StagingError::DuplicateId`]; [`StagingError::is_duplicate`]
    /// matches both.
    #[error("asset folder path already in use: {path} (by {existing})")]
    DuplicatePath { path: AssetPath, existing: ObjectId },

    /// The record cannot be staged in the requested table.
    #[error("invalid {kind} record {id}: {reason}")]
    InvalidRecord {
        kind: ManagedKind,
        id: ObjectId,
        reason: String,
    },

    /// Some records of `kind` could never become ready.
    #[error(
        "{} {} record(s) have unresolved parents: {} ({} committed before stopping)",
        .ids.len(),
        .kind,
        .ids.iter().map(ObjectId::as_str).collect::<Vec<_>>().join(", "),
        .committed.total()
    )]
    DependencyUnresolved {
        kind: ManagedKind,
        ids: Vec<ObjectId>,
        committed: CommitCounts,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl StagingError {
    /// Whether the record collided with an id or asset path already in use.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            StagingError::DuplicateId(_) | StagingError::DuplicatePath { .. }
        )
    }
}

/// A staged object plus the siblings persisted in the same document.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub object: GraphObject,
    pub siblings: Vec<GraphObject>,
}

impl PendingRecord {
    pub fn new(object: GraphObject) -> Self {
        Self {
            object,
            siblings: Vec::new(),
        }
    }

    pub fn with_sibling(mut self, sibling: GraphObject) -> Self {
        self.siblings.push(sibling);
        self
    }

    pub fn id(&self) -> &ObjectId {
        &self.object.id
    }

    /// Every object in the record, primary first.
    pub fn objects(&self) -> Vec<GraphObject> {
        std::iter::once(&self.object)
            .chain(&self.siblings)
            .cloned()
            .collect()
    }

    /// An event folder under `parent`.
    pub fn event_folder(ids: &IdFactory, name: &str, parent: ObjectId) -> Self {
        Self::new(
            GraphObject::new(ids.mint(), ObjectClass::EventFolder)
                .with_property("name", name)
                .with_edge("folder", [parent]),
        )
    }

    /// A bank folder under `parent`.
    pub fn bank_folder(ids: &IdFactory, name: &str, parent: ObjectId) -> Self {
        Self::new(
            GraphObject::new(ids.mint(), ObjectClass::BankFolder)
                .with_property("name", name)
                .with_edge("folder", [parent]),
        )
    }

    /// A bank under `parent` (a bank folder or the master bank folder).
    pub fn bank(ids: &IdFactory, name: &str, parent: ObjectId) -> Self {
        Self::new(
            GraphObject::new(ids.mint(), ObjectClass::Bank)
                .with_property("name", name)
                .with_edge("folder", [parent]),
        )
    }

    /// A bus routed into `output`, with its effect chain, panner and fader.
    pub fn bus(ids: &IdFactory, name: &str, output: ObjectId) -> Self {
        let chain_id = ids.mint();
        let panner_id = ids.mint();
        let fader_id = ids.mint();

        let group = GraphObject::new(ids.mint(), ObjectClass::MixerGroup)
            .with_property("name", name)
            .with_edge("effectChain", [chain_id.clone()])
            .with_edge("panner", [panner_id.clone()])
            .with_edge("output", [output]);
        let chain = GraphObject::new(chain_id, ObjectClass::MixerBusEffectChain)
            .with_edge("effects", [fader_id.clone()]);
        let panner = GraphObject::new(panner_id, ObjectClass::MixerBusPanner);
        let fader = GraphObject::new(fader_id, ObjectClass::MixerBusFader);

        Self::new(group)
            .with_sibling(chain)
            .with_sibling(panner)
            .with_sibling(fader)
    }

    /// An asset folder at `path`.
    pub fn asset_folder(ids: &IdFactory, path: &AssetPath) -> Self {
        Self::new(
            GraphObject::new(ids.mint(), ObjectClass::AssetFolder)
                .with_property("assetPath", path.as_str()),
        )
    }

    /// The record's asset path, for asset folder records.
    pub fn asset_path(&self) -> Option<AssetPath> {
        self.object
            .property("assetPath")
            .and_then(|p| AssetPath::new(p).ok())
    }

    /// The parent named by the record's parent edge, for parent-pointer kinds.
    pub fn parent(&self, kind: ManagedKind) -> Option<&ObjectId> {
        kind.parent_edge()
            .and_then(|edge| self.object.single_edge(edge))
    }
}

/// Objects committed per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitCounts {
    pub event_folders: usize,
    pub asset_folders: usize,
    pub banks: usize,
    pub buses: usize,
}

impl CommitCounts {
    pub fn get(&self, kind: ManagedKind) -> usize {
        match kind {
            ManagedKind::EventFolder => self.event_folders,
            ManagedKind::AssetFolder => self.asset_folders,
            ManagedKind::Bank => self.banks,
            ManagedKind::Bus => self.buses,
        }
    }

    fn increment(&mut self, kind: ManagedKind) {
        match kind {
            ManagedKind::EventFolder => self.event_folders += 1,
            ManagedKind::AssetFolder => self.asset_folders += 1,
            ManagedKind::Bank => self.banks += 1,
            ManagedKind::Bus => self.buses += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.event_folders + self.asset_folders + self.banks + self.buses
    }
}

impl std::fmt::Display for CommitCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} event folders, {} asset folders, {} banks, {} buses",
            self.event_folders, self.asset_folders, self.banks, self.buses
        )
    }
}

/// Pending records, one table per kind.
#[derive(Debug, Default)]
pub struct Staging {
    event_folders: IndexMap<ObjectId, PendingRecord>,
    asset_folders: IndexMap<ObjectId, PendingRecord>,
    banks: IndexMap<ObjectId, PendingRecord>,
    buses: IndexMap<ObjectId, PendingRecord>,
    /// Every pending primary id, across tables.
    pending: HashSet<ObjectId>,
    /// Pending asset folder paths.
    paths: HashMap<AssetPath, ObjectId>,
}

impl Staging {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ManagedKind) -> &IndexMap<ObjectId, PendingRecord> {
        match kind {
            ManagedKind::EventFolder => &self.event_folders,
            ManagedKind::AssetFolder => &self.asset_folders,
            ManagedKind::Bank => &self.banks,
            ManagedKind::Bus => &self.buses,
        }
    }

    fn table_mut(&mut self, kind: ManagedKind) -> &mut IndexMap<ObjectId, PendingRecord> {
        match kind {
            ManagedKind::EventFolder => &mut self.event_folders,
            ManagedKind::AssetFolder => &mut self.asset_folders,
            ManagedKind::Bank => &mut self.banks,
            ManagedKind::Bus => &mut self.buses,
        }
    }

    /// Add a record to `kind`'s table.
    ///
    /// # Errors
    ///
    /// - [`StagingError::DuplicateId`] if the id is pending anywhere or
    ///   committed in any kind
    /// - [`StagingError::DuplicatePath`] if an asset folder already has the
    ///   record's path
    /// - [`StagingError::InvalidRecord`] if the primary class does not belong
    ///   to `kind`, a bus has no `output` edge, or an asset folder record has
    ///   no valid non-root path
    pub fn stage(
        &mut self,
        store: &ProjectStore,
        kind: ManagedKind,
        record: PendingRecord,
    ) -> Result<(), StagingError> {
        let id = record.id().clone();
        let invalid = |reason: String| StagingError::InvalidRecord {
            kind,
            id: id.clone(),
            reason,
        };

        if !kind.accepts(&record.object.class) {
            return Err(invalid(format!(
                "class {} does not belong in this table",
                record.object.class
            )));
        }
        if kind == ManagedKind::Bus && record.parent(kind).is_none() {
            return Err(invalid(
                "a bus needs an output edge; the project already has a master bus".to_string(),
            ));
        }

        if self.pending.contains(&id) || ManagedKind::ALL.iter().any(|k| store.contains(*k, &id)) {
            return Err(StagingError::DuplicateId(id));
        }

        let path = if kind == ManagedKind::AssetFolder {
            let path = record
                .asset_path()
                .filter(|p| !p.is_root())
                .ok_or_else(|| invalid("missing or invalid assetPath".to_string()))?;
            let existing = store
                .asset_folder_by_path(&path)
                .map(|e| e.id.clone())
                .or_else(|| self.paths.get(&path).cloned());
            if let Some(existing) = existing {
                return Err(StagingError::DuplicatePath { path, existing });
            }
            Some(path)
        } else {
            None
        };

        debug!("staged {} {}", kind, id);
        if let Some(path) = path {
            self.paths.insert(path, id.clone());
        }
        self.pending.insert(id.clone());
        self.table_mut(kind).insert(id, record);
        Ok(())
    }

    /// Whether `id` is pending in any table. O(1).
    pub fn is_pending(&self, id: &ObjectId) -> bool {
        self.pending.contains(id)
    }

    pub fn get(&self, kind: ManagedKind, id: &ObjectId) -> Option<&PendingRecord> {
        self.table(kind).get(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Pending ids of a kind, in staging order.
    pub fn pending_ids(&self, kind: ManagedKind) -> Vec<ObjectId> {
        self.table(kind).keys().cloned().collect()
    }

    /// Index-style entries for the pending records of a kind.
    pub fn entries(&self, kind: ManagedKind) -> impl Iterator<Item = IndexEntry> + '_ {
        self.table(kind)
            .values()
            .filter_map(move |r| IndexEntry::from_object(kind, &r.object))
    }

    /// Drop every pending record. Returns how many were dropped.
    ///
    /// Ids of dropped records are never reissued by the [`IdFactory`] that
    /// minted them.
    pub fn discard_all(&mut self) -> usize {
        let count = self.pending.len();
        for kind in ManagedKind::ALL {
            self.table_mut(kind).clear();
        }
        self.pending.clear();
        self.paths.clear();
        if count > 0 {
            info!("discarded {} pending records", count);
        }
        count
    }

    fn is_ready(store: &ProjectStore, kind: ManagedKind, record: &PendingRecord) -> bool {
        match kind {
            ManagedKind::AssetFolder => match record.asset_path().and_then(|p| p.parent()) {
                Some(parent) if parent.is_root() => true,
                Some(parent) => store.asset_folder_by_path(&parent).is_some(),
                None => false,
            },
            _ => match record.parent(kind) {
                None => true,
                Some(parent) => store.contains(kind, parent),
            },
        }
    }

    fn take(&mut self, kind: ManagedKind, id: &ObjectId) -> Option<PendingRecord> {
        let record = self.table_mut(kind).shift_remove(id)?;
        self.pending.remove(id);
        if let Some(path) = record.asset_path() {
            self.paths.remove(&path);
        }
        Some(record)
    }

    /// Write every pending record to disk in dependency order.
    ///
    /// # Errors
    ///
    /// - [`StagingError::DependencyUnresolved`] naming every record of the
    ///   first kind that could not be committed
    /// - [`StagingError::Store`] or [`StagingError::Journal`] on write
    ///   failure; the failing record stays pending
    pub fn commit_all(&mut self, store: &mut ProjectStore) -> Result<CommitCounts, StagingError> {
        let mut counts = CommitCounts::default();
        if self.pending.is_empty() {
            return Ok(counts);
        }

        let paths = store.paths().clone();
        let mut journal = Journal::new("commit");

        for kind in ManagedKind::ALL {
            loop {
                let mut progressed = false;
                for id in self.pending_ids(kind) {
                    let Some(record) = self.get(kind, &id) else {
                        continue;
                    };
                    if !Self::is_ready(store, kind, record) {
                        continue;
                    }
                    let file = store.commit_objects(kind, &record.objects())?;
                    let class = record.object.class.clone();
                    self.take(kind, &id);
                    journal.append_object_write(&paths, &class, &id, &file)?;
                    counts.increment(kind);
                    progressed = true;
                }

                let remaining = self.pending_ids(kind);
                if remaining.is_empty() {
                    break;
                }
                if !progressed {
                    warn!(
                        "{} {} records left pending with unresolved parents",
                        remaining.len(),
                        kind
                    );
                    journal.finish_incomplete(&paths, store.keep_journals())?;
                    return Err(StagingError::DependencyUnresolved {
                        kind,
                        ids: remaining,
                        committed: counts,
                    });
                }
            }
        }

        journal.finish(&paths, store.keep_journals())?;
        info!("committed {}", counts);
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn bus_record_has_mixer_siblings() {
        let ids = IdFactory::new();
        let record = PendingRecord::bus(&ids, "SFX", id("MB"));
        assert_eq!(record.object.class, ObjectClass::MixerGroup);
        assert_eq!(record.parent(ManagedKind::Bus), Some(&id("MB")));
        let classes: Vec<&ObjectClass> = record.siblings.iter().map(|s| &s.class).collect();
        assert_eq!(
            classes,
            vec![
                &ObjectClass::MixerBusEffectChain,
                &ObjectClass::MixerBusPanner,
                &ObjectClass::MixerBusFader
            ]
        );
        assert_eq!(
            record.object.single_edge("effectChain"),
            Some(&record.siblings[0].id)
        );
        assert_eq!(record.objects().len(), 4);
        assert_eq!(ids.issued(), 4);
    }

    #[test]
    fn folder_records_point_at_parent() {
        let ids = IdFactory::new();
        let record = PendingRecord::event_folder(&ids, "Boss", id("F1"));
        assert_eq!(record.object.name(), Some("Boss"));
        assert_eq!(record.parent(ManagedKind::EventFolder), Some(&id("F1")));

        let bank = PendingRecord::bank(&ids, "Level1", id("MBF"));
        assert_eq!(bank.parent(ManagedKind::Bank), Some(&id("MBF")));
    }

    #[test]
    fn asset_folder_record_carries_path() {
        let ids = IdFactory::new();
        let path = AssetPath::new("Characters/Boss").unwrap();
        let record = PendingRecord::asset_folder(&ids, &path);
        assert_eq!(record.asset_path(), Some(path));
        assert_eq!(record.parent(ManagedKind::AssetFolder), None);
    }

    #[test]
    fn counts_display_and_total() {
        let mut counts = CommitCounts::default();
        counts.increment(ManagedKind::Bus);
        counts.increment(ManagedKind::Bus);
        counts.increment(ManagedKind::EventFolder);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get(ManagedKind::Bus), 2);
        assert!(counts.to_string().contains("2 buses"));
    }

    #[test]
    fn unresolved_error_names_ids() {
        let err = StagingError::DependencyUnresolved {
            kind: ManagedKind::EventFolder,
            ids: vec![id("A"), id("B")],
            committed: CommitCounts::default(),
        };
        let msg = err.to_string();
        assert!(msg.contains("A, B"));
        assert!(msg.contains("event-folder"));
    }

    #[test]
    fn empty_staging_discards_nothing() {
        let mut staging = Staging::new();
        assert_eq!(staging.discard_all(), 0);
        assert_eq!(staging.pending_count(), 0);
    }
}
