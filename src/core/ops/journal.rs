//! core::ops::journal
//!
//! Operation journaling for crash safety.
//!
//! # Crash Safety Contract
//!
//! 1. **Per-step persistence:** Every `append_*` method writes the journal
//!    with fsync before returning. A crash at any point leaves the journal in
//!    a consistent state.
//!
//! 2. **Recoverability:** After a crash, [`Journal::read`] returns the
//!    journal as it was after the last successful `append_*` call, and
//!    [`Journal::list`] reports it as unfinished.
//!
//! 3. **Rollback support:** Every file an operation creates is recorded
//!    before the caller moves on, so [`Journal::created_files`] names exactly
//!    what must be removed to undo it.
//!
//! # Storage
//!
//! - `<project>/.eventforge/ops/<op_id>.json`
//!
//! # Invariants
//!
//! - A step is appended only after the file it names exists on disk
//! - Existing files are never journaled as created (reused media is not
//!   recorded, so rollback cannot delete it)
//!
//! # Usage
//!
//! ```ignore
//! use eventforge::core::ops::journal::Journal;
//!
//! let mut journal = Journal::new("instantiate");
//! journal.append_media_copy(&paths, &source, &dest)?;
//! journal.append_object_write(&paths, &class, &id, &path)?;
//! journal.commit();
//! journal.write(&paths)?;
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::paths::ProjectPaths;
use crate::core::types::{ObjectClass, ObjectId, UtcTimestamp};

/// Errors from journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// I/O error reading or writing journal files.
    #[error("journal i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("journal json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Journal file not found.
    #[error("journal not found: {0}")]
    NotFound(String),
}

/// Unique identifier for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId(String);

impl OpId {
    /// Generate a new unique operation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an OpId from an existing string.
    ///
    /// Used when reading journals from disk.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The current phase of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpPhase {
    /// Operation is in progress (or crashed while in progress).
    InProgress,
    /// Operation completed successfully.
    Committed,
    /// Operation failed and its files were removed.
    RolledBack,
    /// Operation stopped early; the steps recorded stay in place.
    Incomplete,
}

impl OpPhase {
    /// Check if the operation is finished (anything but in progress).
    pub fn is_finished(&self) -> bool {
        !matches!(self, OpPhase::InProgress)
    }
}

/// A single step in an operation journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalStep {
    pub kind: StepKind,
    pub timestamp: UtcTimestamp,
}

/// The kind of journal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// A new object document was written.
    ObjectWrite {
        /// XML class of the document's primary object.
        class: String,
        /// Id of the primary object.
        id: ObjectId,
        /// Absolute path of the new document.
        path: PathBuf,
    },

    /// A media file was copied into the assets tree.
    MediaCopy { source: PathBuf, dest: PathBuf },

    /// A named marker between phases of an operation.
    Checkpoint { name: String },
}

/// An operation journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub op_id: OpId,
    /// Command that started this operation.
    pub command: String,
    pub started_at: UtcTimestamp,
    pub finished_at: Option<UtcTimestamp>,
    pub phase: OpPhase,
    pub steps: Vec<JournalStep>,
}

impl Journal {
    /// Create a new journal for an operation.
    ///
    /// Nothing is written until the first `append_*` or [`Journal::write`].
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            op_id: OpId::new(),
            command: command.into(),
            started_at: UtcTimestamp::now(),
            finished_at: None,
            phase: OpPhase::InProgress,
            steps: vec![],
        }
    }

    pub fn file_path(&self, paths: &ProjectPaths) -> PathBuf {
        paths.op_journal_path(self.op_id.as_str())
    }

    fn append(&mut self, paths: &ProjectPaths, kind: StepKind) -> Result<(), JournalError> {
        self.steps.push(JournalStep {
            kind,
            timestamp: UtcTimestamp::now(),
        });
        self.write(paths)
    }

    /// Append an object write step and persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be written to disk.
    pub fn append_object_write(
        &mut self,
        paths: &ProjectPaths,
        class: &ObjectClass,
        id: &ObjectId,
        path: &Path,
    ) -> Result<(), JournalError> {
        self.append(
            paths,
            StepKind::ObjectWrite {
                class: class.as_str().to_string(),
                id: id.clone(),
                path: path.to_path_buf(),
            },
        )
    }

    /// Append a media copy step and persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be written to disk.
    pub fn append_media_copy(
        &mut self,
        paths: &ProjectPaths,
        source: &Path,
        dest: &Path,
    ) -> Result<(), JournalError> {
        self.append(
            paths,
            StepKind::MediaCopy {
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
            },
        )
    }

    /// Append a checkpoint step and persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be written to disk.
    pub fn append_checkpoint(
        &mut self,
        paths: &ProjectPaths,
        name: impl Into<String>,
    ) -> Result<(), JournalError> {
        self.append(paths, StepKind::Checkpoint { name: name.into() })
    }

    /// Mark the operation as committed (successful completion).
    pub fn commit(&mut self) {
        self.phase = OpPhase::Committed;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Mark the operation as rolled back.
    pub fn rollback(&mut self) {
        self.phase = OpPhase::RolledBack;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Mark committed, then either persist the final state or delete the file.
    ///
    /// A journal with no steps was never written and stays that way.
    pub fn finish(&mut self, paths: &ProjectPaths, keep: bool) -> Result<(), JournalError> {
        self.commit();
        self.close(paths, keep)
    }

    /// Like [`Journal::finish`], but records that the operation stopped
    /// before doing everything it was asked to.
    pub fn finish_incomplete(&mut self, paths: &ProjectPaths, keep: bool) -> Result<(), JournalError> {
        self.phase = OpPhase::Incomplete;
        self.finished_at = Some(UtcTimestamp::now());
        self.close(paths, keep)
    }

    fn close(&self, paths: &ProjectPaths, keep: bool) -> Result<(), JournalError> {
        if self.steps.is_empty() {
            return Ok(());
        }
        if keep {
            self.write(paths)
        } else {
            self.delete(paths)
        }
    }

    /// Files created by this operation, most recent first.
    pub fn created_files(&self) -> Vec<&Path> {
        self.steps
            .iter()
            .rev()
            .filter_map(|step| match &step.kind {
                StepKind::ObjectWrite { path, .. } => Some(path.as_path()),
                StepKind::MediaCopy { dest, .. } => Some(dest.as_path()),
                StepKind::Checkpoint { .. } => None,
            })
            .collect()
    }

    /// Number of object documents written.
    pub fn object_writes(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::ObjectWrite { .. }))
            .count()
    }

    /// Write the journal to disk with fsync.
    ///
    /// # Fault Injection
    ///
    /// When compiled with `cfg(test)` or the `fault_injection` feature,
    /// this method can simulate crashes for testing crash recovery.
    /// Use [`fault_injection::set_crash_after`] to configure.
    pub fn write(&self, paths: &ProjectPaths) -> Result<(), JournalError> {
        #[cfg(any(test, feature = "fault_injection"))]
        if fault_injection::should_crash() {
            return Err(JournalError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated crash for fault injection testing",
            )));
        }

        fs::create_dir_all(paths.ops_dir())?;

        let path = self.file_path(paths);
        let content = serde_json::to_string_pretty(self)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read a journal from disk.
    pub fn read(paths: &ProjectPaths, op_id: &OpId) -> Result<Self, JournalError> {
        let path = paths.op_journal_path(op_id.as_str());

        if !path.exists() {
            return Err(JournalError::NotFound(op_id.to_string()));
        }

        let content = fs::read_to_string(&path)?;
        let journal = serde_json::from_str(&content)?;
        Ok(journal)
    }

    /// List journal ids, newest first.
    pub fn list(paths: &ProjectPaths) -> Result<Vec<OpId>, JournalError> {
        let dir = paths.ops_dir();
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = fs::read_dir(&dir)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().into_string().ok()?;
                let id = name.strip_suffix(".json")?;
                let mtime = entry.metadata().ok()?.modified().ok()?;
                Some((OpId::from_string(id), mtime))
            })
            .collect();

        entries.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(entries.into_iter().map(|(id, _)| id).collect())
    }

    /// Journals left in progress, newest first.
    ///
    /// These are operations that crashed before committing or rolling back.
    /// Unreadable journal files are skipped.
    pub fn unfinished(paths: &ProjectPaths) -> Result<Vec<Self>, JournalError> {
        Ok(Self::list(paths)?
            .iter()
            .filter_map(|id| Self::read(paths, id).ok())
            .filter(|j| !j.phase.is_finished())
            .collect())
    }

    /// Delete this journal from disk.
    pub fn delete(&self, paths: &ProjectPaths) -> Result<(), JournalError> {
        let path = self.file_path(paths);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Fault injection for crash recovery tests.
#[cfg(any(test, feature = "fault_injection"))]
pub mod fault_injection {
    use std::cell::Cell;

    // Thread-local so parallel tests don't interfere.
    thread_local! {
        /// Crash after N writes; 0 disables.
        static CRASH_AFTER_WRITES: Cell<usize> = const { Cell::new(0) };

        static WRITE_COUNT: Cell<usize> = const { Cell::new(0) };
    }

    /// Set the write count after which to simulate a crash.
    ///
    /// The `n`th write attempt fails with a simulated I/O error. Set to 0 to
    /// disable crash simulation.
    pub fn set_crash_after(n: usize) {
        CRASH_AFTER_WRITES.with(|c| c.set(n));
        WRITE_COUNT.with(|c| c.set(0));
    }

    /// Check if we should simulate a crash.
    pub fn should_crash() -> bool {
        CRASH_AFTER_WRITES.with(|threshold_cell| {
            let threshold = threshold_cell.get();
            if threshold == 0 {
                return false;
            }
            WRITE_COUNT.with(|count_cell| {
                let count = count_cell.get() + 1;
                count_cell.set(count);
                count >= threshold
            })
        })
    }

    /// Reset fault injection state.
    pub fn reset() {
        CRASH_AFTER_WRITES.with(|c| c.set(0));
        WRITE_COUNT.with(|c| c.set(0));
    }
}
