//! instantiate
//!
//! Creates new events by copying a template event.
//!
//! # Algorithm
//!
//! 1. Validate every input id and media target against the store
//! 2. Load the template closure and copy it under fresh ids
//!    ([`remap::clone_template`])
//! 3. Point the copy at the caller's folder, bank and bus
//!    ([`remap::apply_overrides`])
//! 4. Build AudioFile/SingleSound/MultiSound objects for the media and
//!    attach them ([`graft::graft_media`]), then drop template modules the
//!    copy no longer reaches
//! 5. Copy media, write AudioFile documents, then write the Event document
//!
//! Steps 1-4 make up [`Instantiator::plan`] and only read from disk.
//!
//! # Atomicity
//!
//! Every file step 5 creates is journaled. If any step fails, the files are
//! removed again and the journal is marked rolled back. The Event document is
//! written last, so a partially written event is never visible. A media file
//! that already exists at its destination is reused only when its bytes match
//! the source; it is never overwritten and never removed by a rollback.
//!
//! # Example
//!
//! ```ignore
//! use eventforge::instantiate::{InstantiateRequest, Instantiator};
//!
//! let request = InstantiateRequest::new(template, "Boss_Attack", folder, bank, bus)
//!     .with_media("/tmp/atk1.wav", AssetPath::new("Characters/Boss")?);
//! let event = Instantiator::new(&store, &ids).instantiate(&request)?;
//! ```

pub mod graft;
pub mod probe;
pub mod remap;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::core::ids::IdFactory;
use crate::core::object::GraphObject;
use crate::core::ops::journal::{Journal, JournalError};
use crate::core::store::{EventGraph, ProjectStore, StoreError};
use crate::core::types::{AssetPath, ManagedKind, ObjectClass, ObjectId};

use graft::PreparedMedia;
use remap::Overrides;

/// Errors from event instantiation.
#[derive(Debug, Error)]
pub enum InstantiateError {
    /// An input id or media target does not resolve.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// The requested event id is already in use.
    #[error("id already in use: {0}")]
    DuplicateId(ObjectId),

    /// A media source path has no usable file name.
    #[error("invalid media source: {}", .0.display())]
    InvalidMedia(PathBuf),

    /// Two media sources of one request copy to the same file.
    #[error("more than one media source copies to {}", .0.display())]
    DuplicateMedia(PathBuf),

    /// A different file already exists at a media destination.
    #[error("{} already exists with different content", .0.display())]
    MediaConflict(PathBuf),

    /// Copying a media file failed.
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    MediaCopy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl InstantiateError {
    fn not_found(what: &'static str, id: &ObjectId) -> Self {
        InstantiateError::NotFound {
            what,
            id: id.to_string(),
        }
    }
}

/// One media file and the asset folder path it is copied into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub source: PathBuf,
    pub target: AssetPath,
}

/// Everything needed to create one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiateRequest {
    pub template: ObjectId,
    /// Pre-allocated id for the new event; minted when `None`.
    pub new_event_id: Option<ObjectId>,
    pub name: String,
    pub folder: ObjectId,
    pub bank: ObjectId,
    pub bus: ObjectId,
    pub media: Vec<MediaSource>,
}

impl InstantiateRequest {
    pub fn new(
        template: ObjectId,
        name: impl Into<String>,
        folder: ObjectId,
        bank: ObjectId,
        bus: ObjectId,
    ) -> Self {
        Self {
            template,
            new_event_id: None,
            name: name.into(),
            folder,
            bank,
            bus,
            media: Vec::new(),
        }
    }

    pub fn with_event_id(mut self, id: ObjectId) -> Self {
        self.new_event_id = Some(id);
        self
    }

    pub fn with_media(mut self, source: impl Into<PathBuf>, target: AssetPath) -> Self {
        self.media.push(MediaSource {
            source: source.into(),
            target,
        });
        self
    }
}

/// A media copy the plan will perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// The destination already holds identical bytes and will be reused.
    pub reuse: bool,
}

/// The in-memory result of steps 1-4.
#[derive(Debug, Clone)]
pub struct InstantiationPlan {
    /// The new event and every node of its document.
    pub event: EventGraph,
    /// AudioFile objects, one per media source, each its own document.
    pub audio_files: Vec<GraphObject>,
    pub copies: Vec<PlannedCopy>,
    /// Number of template nodes copied.
    pub copied: usize,
    /// Number of copied template nodes dropped by the media graft.
    pub pruned: usize,
}

impl InstantiationPlan {
    pub fn event_id(&self) -> &ObjectId {
        &self.event.root
    }
}

/// Instantiates template events against one store.
pub struct Instantiator<'a> {
    store: &'a ProjectStore,
    ids: &'a IdFactory,
    probe_media: bool,
}

impl<'a> Instantiator<'a> {
    pub fn new(store: &'a ProjectStore, ids: &'a IdFactory) -> Self {
        Self {
            store,
            ids,
            probe_media: true,
        }
    }

    /// Enable or disable media probing.
    pub fn probe_media(mut self, enabled: bool) -> Self {
        self.probe_media = enabled;
        self
    }

    /// Resolve inputs and build the new event in memory.
    ///
    /// Reads the template and probes media sources; writes nothing.
    ///
    /// # Errors
    ///
    /// - [`InstantiateError::NotFound`] for an unknown template, folder, bank,
    ///   bus or media target folder
    /// - [`InstantiateError::DuplicateId`] if the pre-allocated id is taken
    /// - [`InstantiateError::InvalidMedia`] for a source without a file name
    /// - [`InstantiateError::DuplicateMedia`] when two sources share a
    ///   destination
    /// - [`InstantiateError::MediaConflict`] when a destination exists with
    ///   other content
    pub fn plan(&self, request: &InstantiateRequest) -> Result<InstantiationPlan, InstantiateError> {
        let template = self.validate(request)?;
        let event_id = match &request.new_event_id {
            Some(id) => id.clone(),
            None => self.ids.mint(),
        };

        let (mut event, remapped) = remap::clone_template(&template, event_id, self.ids);
        remap::apply_overrides(
            &mut event,
            &Overrides {
                name: &request.name,
                folder: &request.folder,
                bank: &request.bank,
                bus: &request.bus,
            },
        );

        let mut copies = Vec::with_capacity(request.media.len());
        let mut prepared = Vec::with_capacity(request.media.len());
        let mut destinations = HashSet::new();
        for media in &request.media {
            let file_name = media_file_name(&media.source)?;
            let dest = self.store.paths().asset_dir(&media.target).join(file_name);
            if !destinations.insert(dest.clone()) {
                return Err(InstantiateError::DuplicateMedia(dest));
            }
            let reuse = dest.exists();
            if reuse && !same_contents(&media.source, &dest)? {
                return Err(InstantiateError::MediaConflict(dest));
            }
            copies.push(PlannedCopy {
                source: media.source.clone(),
                reuse,
                dest,
            });
            prepared.push(PreparedMedia {
                asset_path: media.target.join_file(file_name),
                info: self.probe(&media.source),
            });
        }

        let audio_files = graft::graft_media(
            &mut event,
            &prepared,
            self.ids,
            &self.store.masters().asset_folder,
        );
        let pruned = if prepared.is_empty() {
            0
        } else {
            graft::prune_unreachable(&mut event)
        };

        Ok(InstantiationPlan {
            event,
            audio_files,
            copies,
            copied: remapped.len(),
            pruned,
        })
    }

    /// Create a new event. Returns its id.
    ///
    /// # Errors
    ///
    /// Everything [`Instantiator::plan`] reports, plus
    /// [`InstantiateError::MediaCopy`], [`InstantiateError::Store`] and
    /// [`InstantiateError::Journal`] for failures while writing. On any
    /// write failure the files created so far are removed.
    pub fn instantiate(&self, request: &InstantiateRequest) -> Result<ObjectId, InstantiateError> {
        let plan = self.plan(request)?;
        let paths = self.store.paths();
        let mut journal = Journal::new("instantiate");
        let mut created = Vec::new();

        match self.execute(&plan, &mut journal, &mut created) {
            Ok(()) => {
                if let Err(e) = journal.finish(paths, self.store.keep_journals()) {
                    warn!("failed to finish journal {}: {}", journal.op_id, e);
                }
                info!(
                    "instantiated event {} '{}' from {} ({} nodes, {} audio files)",
                    plan.event_id(),
                    request.name,
                    request.template,
                    plan.event.len(),
                    plan.audio_files.len()
                );
                Ok(plan.event_id().clone())
            }
            Err(err) => {
                warn!("instantiate of '{}' failed, rolling back: {}", request.name, err);
                self.roll_back(&mut journal, &created);
                Err(err)
            }
        }
    }

    fn validate(&self, request: &InstantiateRequest) -> Result<EventGraph, InstantiateError> {
        let template = match self.store.load_event(&request.template) {
            Ok(template) => template,
            Err(StoreError::NotFound { .. }) => {
                return Err(InstantiateError::not_found("template event", &request.template))
            }
            Err(e) => return Err(e.into()),
        };

        if !self.store.contains(ManagedKind::EventFolder, &request.folder) {
            return Err(InstantiateError::not_found("event folder", &request.folder));
        }
        let is_bank = self
            .store
            .entry(ManagedKind::Bank, &request.bank)
            .is_some_and(|e| e.class == ObjectClass::Bank);
        if !is_bank {
            return Err(InstantiateError::not_found("bank", &request.bank));
        }
        if !self.store.contains(ManagedKind::Bus, &request.bus) {
            return Err(InstantiateError::not_found("bus", &request.bus));
        }

        for media in &request.media {
            let known = media.target.is_root()
                || self.store.asset_folder_by_path(&media.target).is_some();
            if !known {
                return Err(InstantiateError::NotFound {
                    what: "asset folder",
                    id: media.target.as_str().to_string(),
                });
            }
            media_file_name(&media.source)?;
        }

        if let Some(id) = &request.new_event_id {
            let taken = self.store.has_event(id)
                || ManagedKind::ALL.iter().any(|k| self.store.contains(*k, id));
            if taken {
                return Err(InstantiateError::DuplicateId(id.clone()));
            }
        }

        Ok(template)
    }

    fn probe(&self, source: &Path) -> Option<probe::MediaInfo> {
        if !self.probe_media {
            return None;
        }
        match probe::probe(source) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("could not probe {}: {}", source.display(), e);
                None
            }
        }
    }

    fn execute(
        &self,
        plan: &InstantiationPlan,
        journal: &mut Journal,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), InstantiateError> {
        let paths = self.store.paths();

        for copy in &plan.copies {
            if copy.reuse {
                warn!("reusing existing media {}", copy.dest.display());
                continue;
            }
            if copy.dest.exists() {
                return Err(InstantiateError::MediaConflict(copy.dest.clone()));
            }
            copy_media(&copy.source, &copy.dest)?;
            created.push(copy.dest.clone());
            journal.append_media_copy(paths, &copy.source, &copy.dest)?;
        }
        journal.append_checkpoint(paths, "media")?;

        for audio in &plan.audio_files {
            let path = self.store.write_new_document(std::slice::from_ref(audio))?;
            created.push(path.clone());
            journal.append_object_write(paths, &audio.class, &audio.id, &path)?;
        }

        let objects = plan.event.clone().into_objects();
        let path = self.store.write_new_document(&objects)?;
        created.push(path.clone());
        journal.append_object_write(paths, &ObjectClass::Event, plan.event_id(), &path)?;
        Ok(())
    }

    fn roll_back(&self, journal: &mut Journal, created: &[PathBuf]) {
        let paths = self.store.paths();
        for path in created.iter().rev() {
            if let Err(e) = self.store.remove_document(path) {
                warn!("rollback could not remove {}: {}", path.display(), e);
            }
        }
        journal.rollback();
        let result = if self.store.keep_journals() {
            journal.write(paths)
        } else {
            journal.delete(paths)
        };
        if let Err(e) = result {
            warn!("failed to record rollback of {}: {}", journal.op_id, e);
        }
        debug!("rolled back {} files", created.len());
    }
}

fn media_file_name(source: &Path) -> Result<&str, InstantiateError> {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| InstantiateError::InvalidMedia(source.to_path_buf()))
}

/// Whether the existing file at `dest` holds the same bytes as `source`.
fn same_contents(source: &Path, dest: &Path) -> Result<bool, InstantiateError> {
    let read = |path: &Path| {
        fs::read(path).map_err(|e| InstantiateError::MediaCopy {
            from: source.to_path_buf(),
            to: dest.to_path_buf(),
            source: e,
        })
    };
    Ok(read(source)? == read(dest)?)
}

fn copy_media(source: &Path, dest: &Path) -> Result<(), InstantiateError> {
    let fail = |e: std::io::Error| InstantiateError::MediaCopy {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    };
    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir).map_err(fail)?;
    }
    if let Err(e) = fs::copy(source, dest) {
        let _ = fs::remove_file(dest);
        return Err(fail(e));
    }
    debug!("copied {} to {}", source.display(), dest.display());
    Ok(())
}
