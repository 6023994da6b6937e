//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Takes the project lock if it writes, then opens the project store
//! 2. Validates command-specific arguments against it
//! 3. Calls the core to execute the command
//! 4. Formats and displays output
//!
//! Read-only handlers (`info`, `tree`, `events`) never take the project lock.
//! `instantiate` and `apply` hold it from before their first read of the
//! project until the last write; their dry runs skip it.

mod apply;
mod events;
mod info;
mod instantiate;
mod tree;

pub use apply::{apply, Plan};
pub use events::events;
pub use info::info;
pub use instantiate::instantiate;
pub use tree::tree;

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Info => info::info(ctx),
        Command::Tree { kind } => tree::tree(ctx, kind),
        Command::Events { folder } => events::events(ctx, &folder),
        Command::Instantiate {
            template,
            name,
            folder,
            bank,
            bus,
            media,
            event_id,
            dry_run,
        } => {
            let mut request =
                crate::instantiate::InstantiateRequest::new(template, name, folder, bank, bus);
            if let Some(id) = event_id {
                request = request.with_event_id(id);
            }
            for item in media {
                request = request.with_media(item.source, item.target);
            }
            instantiate::instantiate(ctx, &request, dry_run)
        }
        Command::Apply { plan, dry_run } => apply::apply(ctx, &plan, dry_run),
    }
}
