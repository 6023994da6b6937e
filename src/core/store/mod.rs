//! core::store
//!
//! The project object store.
//!
//! # Architecture
//!
//! At open the store scans each managed kind's directory once and keeps a
//! lightweight [`KindIndex`] per kind. Event subgraphs are never indexed or
//! cached: [`ProjectStore::events_in_folder`] rescans `Metadata/Event/` on
//! every call and [`ProjectStore::load_event`] reads a single event document
//! on demand.
//!
//! # Writes
//!
//! Every document is written atomically (temp file, fsync, rename) and is
//! never allowed to replace an existing object file. Writing a managed kind
//! updates its index in place so later readiness checks see it as committed.
//!
//! # Modules
//!
//! - [`index`] - Per-kind read indices
//! - [`events`] - On-demand event scanning and closure loading
//!
//! # Example
//!
//! ```ignore
//! use eventforge::core::paths::ProjectPaths;
//! use eventforge::core::store::ProjectStore;
//! use eventforge::core::types::ManagedKind;
//!
//! let store = ProjectStore::open(ProjectPaths::new("/path/to/project".into()))?;
//! for entry in store.entries(ManagedKind::EventFolder) {
//!     println!("{} {}", entry.id, entry.name);
//! }
//! ```

pub mod events;
pub mod index;

pub use events::{EventGraph, EventSummary};
pub use index::{IndexEntry, KindIndex, Position};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;

use super::config::Config;
use super::object::GraphObject;
use super::paths::ProjectPaths;
use super::staging::Staging;
use super::types::{AssetPath, ManagedKind, ObjectClass, ObjectId, SerializationModel};
use super::xml::{parse_document, write_document, ObjectDocument, XmlError};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An id did not resolve to a committed object.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// A write would replace an existing object document.
    #[error("object already exists: {0}")]
    DuplicateId(ObjectId),

    /// A required project file is missing.
    #[error("missing project file: {}", .0.display())]
    MissingFile(PathBuf),

    /// A document failed to parse.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse { path: PathBuf, source: XmlError },

    /// The project's structure violates an invariant.
    #[error("invalid project: {0}")]
    InvalidProject(String),

    /// Filesystem failure.
    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn not_found(what: &'static str, id: &ObjectId) -> Self {
        StoreError::NotFound {
            what,
            id: id.to_string(),
        }
    }
}

/// Ids of the three master folders, read from `Workspace.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masters {
    pub workspace: ObjectId,
    pub event_folder: ObjectId,
    pub bank_folder: ObjectId,
    pub asset_folder: ObjectId,
}

/// The loaded project: per-kind indices plus project-wide constants.
#[derive(Debug)]
pub struct ProjectStore {
    paths: ProjectPaths,
    model: SerializationModel,
    masters: Masters,
    master_bus: ObjectId,
    event_folders: KindIndex,
    asset_folders: KindIndex,
    banks: KindIndex,
    buses: KindIndex,
    keep_journals: bool,
}

impl ProjectStore {
    /// Open the project at `root` using configured paths and settings.
    pub fn load(root: PathBuf, config: &Config) -> Result<Self, StoreError> {
        let mut store = Self::open(config.project_paths(root))?;
        store.keep_journals = config.keep_journals();
        Ok(store)
    }

    /// Open a project and build the per-kind indices.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissingFile`] if `Workspace.xml` or `Master.xml` is absent
    /// - [`StoreError::Parse`] for any malformed document
    /// - [`StoreError::InvalidProject`] if master pointers are missing or the
    ///   project does not have exactly one root bus
    pub fn open(paths: ProjectPaths) -> Result<Self, StoreError> {
        let workspace_path = paths.workspace_path();
        let workspace = read_required(&workspace_path)?;
        let model = workspace.model.clone();
        let masters = read_masters(&workspace)?;

        let mut event_folders = KindIndex::new(ManagedKind::EventFolder);
        let mut asset_folders = KindIndex::new(ManagedKind::AssetFolder);
        let mut banks = KindIndex::new(ManagedKind::Bank);
        let mut buses = KindIndex::new(ManagedKind::Bus);

        for index in [&mut event_folders, &mut asset_folders, &mut banks] {
            index_document(index, &workspace);
        }

        let master_doc = read_required(&paths.master_bus_path())?;
        index_document(&mut buses, &master_doc);

        for index in [
            &mut event_folders,
            &mut asset_folders,
            &mut banks,
            &mut buses,
        ] {
            for dir in index.kind().directories() {
                for (_, doc) in read_dir_documents(&paths.kind_dir(dir))? {
                    index_document(index, &doc);
                }
            }
        }

        let master_bus = find_master_bus(&buses)?;

        for (what, master) in [
            ("master event folder", &masters.event_folder),
            ("master bank folder", &masters.bank_folder),
            ("master asset folder", &masters.asset_folder),
        ] {
            let found = event_folders.contains(master)
                || banks.contains(master)
                || asset_folders.contains(master);
            if !found {
                return Err(StoreError::InvalidProject(format!(
                    "{what} {master} is referenced by Workspace.xml but not defined"
                )));
            }
        }

        info!(
            "opened project {} ({}): {} event folders, {} asset folders, {} banks, {} buses",
            paths.root.display(),
            model,
            event_folders.len(),
            asset_folders.len(),
            banks.len(),
            buses.len()
        );

        Ok(Self {
            paths,
            model,
            masters,
            master_bus,
            event_folders,
            asset_folders,
            banks,
            buses,
            keep_journals: false,
        })
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// The serialization model every new document must carry.
    pub fn serialization_model(&self) -> &SerializationModel {
        &self.model
    }

    /// Whether journals of successful operations are kept on disk.
    pub fn keep_journals(&self) -> bool {
        self.keep_journals
    }

    pub fn masters(&self) -> &Masters {
        &self.masters
    }

    /// The root bus: the unique bus with no `output` edge.
    pub fn master_bus(&self) -> &ObjectId {
        &self.master_bus
    }

    /// The root object of a kind's hierarchy.
    pub fn root(&self, kind: ManagedKind) -> &ObjectId {
        match kind {
            ManagedKind::EventFolder => &self.masters.event_folder,
            ManagedKind::AssetFolder => &self.masters.asset_folder,
            ManagedKind::Bank => &self.masters.bank_folder,
            ManagedKind::Bus => &self.master_bus,
        }
    }

    pub fn index(&self, kind: ManagedKind) -> &KindIndex {
        match kind {
            ManagedKind::EventFolder => &self.event_folders,
            ManagedKind::AssetFolder => &self.asset_folders,
            ManagedKind::Bank => &self.banks,
            ManagedKind::Bus => &self.buses,
        }
    }

    fn index_mut(&mut self, kind: ManagedKind) -> &mut KindIndex {
        match kind {
            ManagedKind::EventFolder => &mut self.event_folders,
            ManagedKind::AssetFolder => &mut self.asset_folders,
            ManagedKind::Bank => &mut self.banks,
            ManagedKind::Bus => &mut self.buses,
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Whether `id` is a committed object of `kind` (roots included).
    pub fn contains(&self, kind: ManagedKind, id: &ObjectId) -> bool {
        self.index(kind).contains(id)
    }

    pub fn entry(&self, kind: ManagedKind, id: &ObjectId) -> Option<&IndexEntry> {
        self.index(kind).get(id)
    }

    /// Resolve a committed object or fail with `NotFound`.
    pub fn resolve(&self, kind: ManagedKind, id: &ObjectId) -> Result<&IndexEntry, StoreError> {
        self.entry(kind, id)
            .ok_or_else(|| StoreError::not_found(kind_label(kind), id))
    }

    /// Committed entries of a kind, in load/commit order.
    pub fn entries(&self, kind: ManagedKind) -> impl Iterator<Item = &IndexEntry> {
        self.index(kind).entries()
    }

    /// Committed and pending entries of a kind.
    ///
    /// Committed entries come first in load order, then pending entries in
    /// staging order. If an id is present in both views the pending entry
    /// replaces the committed one in place.
    pub fn get_all(&self, kind: ManagedKind, pending: Option<&Staging>) -> Vec<IndexEntry> {
        let mut merged: IndexMap<ObjectId, IndexEntry> = self
            .entries(kind)
            .map(|e| (e.id.clone(), e.clone()))
            .collect();
        if let Some(staging) = pending {
            for entry in staging.entries(kind) {
                merged.insert(entry.id.clone(), entry);
            }
        }
        merged.into_values().collect()
    }

    /// Direct children of a parent-pointer object.
    pub fn children(&self, kind: ManagedKind, id: &ObjectId) -> Vec<&IndexEntry> {
        let index = self.index(kind);
        index
            .tree()
            .children(id)
            .iter()
            .filter_map(|child| index.get(child))
            .collect()
    }

    /// Ancestors of a parent-pointer object, nearest first. O(depth).
    pub fn folder_ancestors(&self, kind: ManagedKind, id: &ObjectId) -> Vec<ObjectId> {
        self.index(kind).tree().ancestors(id)
    }

    /// Whether `id` lies strictly below `ancestor`. O(depth).
    pub fn is_descendant(&self, kind: ManagedKind, id: &ObjectId, ancestor: &ObjectId) -> bool {
        self.index(kind).tree().is_descendant(id, ancestor)
    }

    pub fn asset_folder_by_path(&self, path: &AssetPath) -> Option<&IndexEntry> {
        self.asset_folders.by_path(path)
    }

    /// Asset folders that are path prefixes of `path`, nearest first.
    ///
    /// Ancestry is textual; folders that were never created are skipped.
    pub fn asset_ancestors(&self, path: &AssetPath) -> Vec<&IndexEntry> {
        let mut result = Vec::new();
        let mut current = path.parent();
        while let Some(parent) = current {
            if let Some(entry) = self.asset_folders.by_path(&parent) {
                result.push(entry);
            }
            current = parent.parent();
        }
        result
    }

    /// Asset folders strictly below `path`, in path order.
    pub fn asset_descendants(&self, path: &AssetPath) -> Vec<&IndexEntry> {
        let mut result: Vec<&IndexEntry> = self
            .asset_folders
            .entries()
            .filter(|e| e.asset_path().is_some_and(|p| path.is_ancestor_of(p)))
            .collect();
        result.sort_by(|a, b| a.asset_path().cmp(&b.asset_path()));
        result
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write a new standalone document for `objects[0]` and its siblings.
    ///
    /// The document path is derived from the primary object's class and id.
    /// Does not touch any index.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidProject`] if the class has no document directory
    /// - [`StoreError::DuplicateId`] if the document already exists
    /// - [`StoreError::Io`] on write failure
    pub fn write_new_document(&self, objects: &[GraphObject]) -> Result<PathBuf, StoreError> {
        let primary = objects.first().ok_or_else(|| {
            StoreError::InvalidProject("cannot write an empty document".to_string())
        })?;
        let path = self
            .paths
            .object_path(&primary.class, &primary.id)
            .ok_or_else(|| {
                StoreError::InvalidProject(format!(
                    "class {} cannot own a document",
                    primary.class
                ))
            })?;
        if path.exists() {
            return Err(StoreError::DuplicateId(primary.id.clone()));
        }

        let doc = ObjectDocument::new(self.model.clone(), objects.to_vec());
        let xml = write_document(&doc).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, xml.as_bytes())?;
        debug!(
            "wrote {} {} ({} objects) to {}",
            primary.class,
            primary.id,
            objects.len(),
            path.display()
        );
        Ok(path)
    }

    /// Write a managed object's document and record it as committed.
    pub fn commit_objects(
        &mut self,
        kind: ManagedKind,
        objects: &[GraphObject],
    ) -> Result<PathBuf, StoreError> {
        let primary = objects.first().ok_or_else(|| {
            StoreError::InvalidProject("cannot commit an empty record".to_string())
        })?;
        let entry = IndexEntry::from_object(kind, primary).ok_or_else(|| {
            StoreError::InvalidProject(format!(
                "{} {} does not belong to {}",
                primary.class, primary.id, kind
            ))
        })?;
        let path = self.write_new_document(objects)?;
        self.index_mut(kind).insert(entry);
        Ok(path)
    }

    /// Remove a document written by this process (rollback support).
    pub fn remove_document(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

fn kind_label(kind: ManagedKind) -> &'static str {
    match kind {
        ManagedKind::EventFolder => "event folder",
        ManagedKind::AssetFolder => "asset folder",
        ManagedKind::Bank => "bank",
        ManagedKind::Bus => "bus",
    }
}

fn index_document(index: &mut KindIndex, doc: &ObjectDocument) {
    for object in &doc.objects {
        if let Some(entry) = IndexEntry::from_object(index.kind(), object) {
            index.insert(entry);
        }
    }
}

fn find_master_bus(buses: &KindIndex) -> Result<ObjectId, StoreError> {
    let roots: Vec<&IndexEntry> = buses.roots().collect();
    match roots.as_slice() {
        [master] => Ok(master.id.clone()),
        [] => Err(StoreError::InvalidProject(
            "no bus without an output edge; the master bus is missing".to_string(),
        )),
        many => Err(StoreError::InvalidProject(format!(
            "{} buses have no output edge: {}",
            many.len(),
            many.iter()
                .map(|e| e.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

fn read_masters(workspace: &ObjectDocument) -> Result<Masters, StoreError> {
    let object = workspace.first_of(&ObjectClass::Workspace).ok_or_else(|| {
        StoreError::InvalidProject("Workspace.xml has no Workspace object".to_string())
    })?;
    let pointer = |label: &str| {
        object.single_edge(label).cloned().ok_or_else(|| {
            StoreError::InvalidProject(format!("Workspace.xml is missing '{label}'"))
        })
    };
    Ok(Masters {
        workspace: object.id.clone(),
        event_folder: pointer("masterEventFolder")?,
        bank_folder: pointer("masterBankFolder")?,
        asset_folder: pointer("masterAssetFolder")?,
    })
}

/// Read and parse a document.
pub(crate) fn read_document(path: &Path) -> Result<ObjectDocument, StoreError> {
    let xml = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    parse_document(&xml).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_required(path: &Path) -> Result<ObjectDocument, StoreError> {
    if !path.exists() {
        return Err(StoreError::MissingFile(path.to_path_buf()));
    }
    read_document(path)
}

/// Parse every `.xml` file in a directory, sorted by file name.
///
/// A missing directory yields no documents.
pub(crate) fn read_dir_documents(dir: &Path) -> Result<Vec<(PathBuf, ObjectDocument)>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
            files.push(path);
        }
    }
    files.sort();

    files
        .into_iter()
        .map(|path| read_document(&path).map(|doc| (path, doc)))
        .collect()
}

/// Write a file via a sibling temp file, fsync and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::InvalidProject(format!("no parent for {}", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = dir.join(tmp_name);

    let result = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StoreError::io(path, e)
    })
}
