//! info command - Show the project's model, masters and per-kind counts

use crate::cli::Context;
use crate::core::ops::Journal;
use crate::core::types::ManagedKind;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Print a summary of the project.
pub fn info(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let masters = store.masters();

    println!("Project: {}", store.paths().root.display());
    println!("Serialization model: {}", store.serialization_model());
    println!("Workspace: {}", masters.workspace);
    println!("Master event folder: {}", masters.event_folder);
    println!("Master bank folder: {}", masters.bank_folder);
    println!("Master asset folder: {}", masters.asset_folder);
    println!("Master bus: {}", store.master_bus());
    println!("Assets directory: {}", store.paths().assets_dir);

    for kind in ManagedKind::ALL {
        println!("{:<14} {}", format!("{}s:", kind), store.index(kind).len());
    }

    let unfinished =
        Journal::unfinished(store.paths()).context("Failed to read operation journals")?;
    if !unfinished.is_empty() {
        output::warn(
            format!("{} operation(s) did not finish:", unfinished.len()),
            ctx.verbosity,
        );
        for journal in &unfinished {
            output::warn(
                format!(
                    "  {} {} started {} ({} files)",
                    journal.op_id,
                    journal.command,
                    journal.started_at,
                    journal.created_files().len()
                ),
                ctx.verbosity,
            );
        }
    }

    Ok(())
}
