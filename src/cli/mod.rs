//! cli
//!
//! Command-line interface layer for eventforge.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration for the target project
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers open a [`ProjectStore`], call into
//! [`crate::core`] and [`crate::instantiate`], and format results through
//! [`crate::ui::output`]. Mutating handlers hold the project lock for their
//! whole run, taken before the store is read.
//!
//! [`ProjectStore`]: crate::core::store::ProjectStore

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use crate::core::config::Config;
use crate::core::ops::ProjectLock;
use crate::core::store::ProjectStore;
use crate::ui::output::Verbosity;

/// Per-invocation state shared by all handlers.
#[derive(Debug)]
pub struct Context {
    /// Project root directory.
    pub project: PathBuf,
    pub verbosity: Verbosity,
    pub config: Config,
}

impl Context {
    /// Open the project store.
    pub fn open_store(&self) -> Result<ProjectStore> {
        ProjectStore::load(self.project.clone(), &self.config)
            .with_context(|| format!("Failed to open project at {}", self.project.display()))
    }

    /// Take the exclusive project lock.
    ///
    /// Called before the store is opened, so a directory without
    /// `Workspace.xml` is refused here rather than given a tool directory.
    pub fn lock(&self) -> Result<ProjectLock> {
        let paths = self.config.project_paths(self.project.clone());
        let workspace = paths.workspace_path();
        if !workspace.is_file() {
            bail!(
                "Not a project: {} does not exist",
                workspace.display()
            );
        }
        ProjectLock::acquire(&paths).context("Failed to lock project")
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`, after logging is
/// initialized from the parsed flags.
pub fn run(cli: Cli) -> Result<()> {
    let project = match cli.project {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let config = Config::load(Some(&project)).context("Failed to load configuration")?;

    let ctx = Context {
        project,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        config,
    };

    commands::dispatch(cli.command, &ctx)
}
