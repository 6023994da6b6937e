//! events command - List the events in a folder subtree

use crate::cli::Context;
use crate::core::types::ObjectId;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// List events filed under `folder` or any of its descendants.
pub fn events(ctx: &Context, folder: &ObjectId) -> Result<()> {
    let store = ctx.open_store()?;
    let events = store
        .events_in_folder(folder)
        .with_context(|| format!("Failed to list events in {}", folder))?;

    if events.is_empty() {
        output::print(format!("No events in {}", folder), ctx.verbosity);
        return Ok(());
    }

    for event in &events {
        let location = match &event.folder {
            Some(f) if f != folder => format!("  (in {})", f),
            _ => String::new(),
        };
        println!("{} {}{}", event.id, event.name, location);
    }
    output::debug(format!("{} event(s)", events.len()), ctx.verbosity);
    Ok(())
}
