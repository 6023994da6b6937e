//! core::paths
//!
//! Centralized path routing for project storage locations.
//!
//! # Architecture
//!
//! Every location the crate reads or writes is computed here. No other
//! module joins `"Metadata"` or a kind directory onto a project root.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//!   Metadata/
//!     Workspace.xml        master folder pointers + serialization model
//!     Master.xml           the root bus
//!     EventFolder/ Event/ Bank/ BankFolder/ Group/ Asset/ AudioFile/
//!   Assets/                media tree (directory name is configurable)
//!   .eventforge/
//!     config.toml          project configuration
//!     lock                 host lock file
//!     ops/<op-id>.json     operation journals
//! ```
//!
//! # Example
//!
//! ```
//! use eventforge::core::paths::ProjectPaths;
//! use eventforge::core::types::{ObjectClass, ObjectId};
//! use std::path::PathBuf;
//!
//! let paths = ProjectPaths::new(PathBuf::from("/proj"));
//! let id = ObjectId::new("F1").unwrap();
//!
//! assert_eq!(
//!     paths.object_path(&ObjectClass::EventFolder, &id),
//!     Some(PathBuf::from("/proj/Metadata/EventFolder/F1.xml"))
//! );
//! assert_eq!(paths.workspace_path(), PathBuf::from("/proj/Metadata/Workspace.xml"));
//! ```

use std::path::{Path, PathBuf};

use super::types::{AssetPath, ObjectClass, ObjectId};

/// Default name of the media directory under the project root.
pub const DEFAULT_ASSETS_DIR: &str = "Assets";

/// Name of the tool-state directory under the project root.
pub const TOOL_DIR: &str = ".eventforge";

/// Centralized path routing for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// The project root (the directory holding `Metadata/`).
    pub root: PathBuf,

    /// Media directory name relative to the root.
    pub assets_dir: String,
}

impl ProjectPaths {
    /// Create paths for a project with the default media directory.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            assets_dir: DEFAULT_ASSETS_DIR.to_string(),
        }
    }

    /// Override the media directory name.
    pub fn with_assets_dir(mut self, assets_dir: impl Into<String>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("Metadata")
    }

    pub fn workspace_path(&self) -> PathBuf {
        self.metadata_dir().join("Workspace.xml")
    }

    pub fn master_bus_path(&self) -> PathBuf {
        self.metadata_dir().join("Master.xml")
    }

    /// A kind directory, e.g. `Metadata/Group`.
    pub fn kind_dir(&self, directory: &str) -> PathBuf {
        self.metadata_dir().join(directory)
    }

    /// The document path for a standalone object of `class`.
    ///
    /// Returns `None` for classes that never own a document (they live
    /// inside another object's file).
    pub fn object_path(&self, class: &ObjectClass, id: &ObjectId) -> Option<PathBuf> {
        class
            .directory()
            .map(|dir| self.kind_dir(dir).join(id.file_name()))
    }

    pub fn event_dir(&self) -> PathBuf {
        self.kind_dir("Event")
    }

    // =========================================================================
    // Media
    // =========================================================================

    pub fn assets_root(&self) -> PathBuf {
        self.root.join(&self.assets_dir)
    }

    /// Filesystem directory for an asset folder path.
    pub fn asset_dir(&self, path: &AssetPath) -> PathBuf {
        let mut dir = self.assets_root();
        for component in path.as_str().split('/').filter(|c| !c.is_empty()) {
            dir.push(component);
        }
        dir
    }

    // =========================================================================
    // Tool state
    // =========================================================================

    pub fn tool_dir(&self) -> PathBuf {
        self.root.join(TOOL_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.tool_dir().join("config.toml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.tool_dir().join("lock")
    }

    pub fn ops_dir(&self) -> PathBuf {
        self.tool_dir().join("ops")
    }

    pub fn op_journal_path(&self, op_id: &str) -> PathBuf {
        self.ops_dir().join(format!("{}.json", op_id))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> ProjectPaths {
        ProjectPaths::new(PathBuf::from("/proj"))
    }

    #[test]
    fn metadata_layout() {
        let p = paths();
        assert_eq!(p.metadata_dir(), PathBuf::from("/proj/Metadata"));
        assert_eq!(p.master_bus_path(), PathBuf::from("/proj/Metadata/Master.xml"));
        assert_eq!(p.event_dir(), PathBuf::from("/proj/Metadata/Event"));
    }

    #[test]
    fn bus_documents_go_to_group() {
        let id = ObjectId::new("X1").unwrap();
        assert_eq!(
            paths().object_path(&ObjectClass::MixerGroup, &id),
            Some(PathBuf::from("/proj/Metadata/Group/X1.xml"))
        );
    }

    #[test]
    fn embedded_classes_have_no_path() {
        let id = ObjectId::new("S").unwrap();
        assert_eq!(paths().object_path(&ObjectClass::SingleSound, &id), None);
        assert_eq!(paths().object_path(&ObjectClass::MixerMaster, &id), None);
    }

    #[test]
    fn asset_dirs() {
        let p = paths();
        assert_eq!(p.asset_dir(&AssetPath::root()), PathBuf::from("/proj/Assets"));
        assert_eq!(
            p.asset_dir(&AssetPath::new("Characters/Boss/").unwrap()),
            PathBuf::from("/proj/Assets/Characters/Boss")
        );
    }

    #[test]
    fn custom_assets_dir() {
        let p = paths().with_assets_dir("Media");
        assert_eq!(p.assets_root(), PathBuf::from("/proj/Media"));
    }

    #[test]
    fn tool_state_layout() {
        let p = paths();
        assert_eq!(p.config_path(), PathBuf::from("/proj/.eventforge/config.toml"));
        assert_eq!(p.lock_path(), PathBuf::from("/proj/.eventforge/lock"));
        assert_eq!(
            p.op_journal_path("abc"),
            PathBuf::from("/proj/.eventforge/ops/abc.json")
        );
    }
}
