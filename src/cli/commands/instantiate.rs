//! instantiate command - Create an event from a template

use crate::cli::Context;
use crate::core::ids::IdFactory;
use crate::instantiate::{InstantiateRequest, InstantiationPlan, Instantiator};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

/// Instantiate one event, or describe what would be created with `dry_run`.
pub fn instantiate(ctx: &Context, request: &InstantiateRequest, dry_run: bool) -> Result<()> {
    let _lock = if dry_run { None } else { Some(ctx.lock()?) };
    let store = ctx.open_store()?;
    let ids = IdFactory::new();
    let instantiator = Instantiator::new(&store, &ids).probe_media(ctx.config.probe_media());

    if dry_run {
        let plan = instantiator
            .plan(request)
            .with_context(|| format!("Cannot instantiate '{}'", request.name))?;
        describe(&plan, &request.name, ctx.verbosity);
        output::print("Dry run: nothing written.", ctx.verbosity);
        return Ok(());
    }

    let event = instantiator
        .instantiate(request)
        .with_context(|| format!("Failed to instantiate '{}'", request.name))?;

    output::success(
        format!("Created event '{}' {}", request.name, event),
        ctx.verbosity,
    );
    if ctx.verbosity == Verbosity::Quiet {
        println!("{}", event);
    }
    Ok(())
}

/// Print a plan summary.
pub(super) fn describe(plan: &InstantiationPlan, name: &str, verbosity: Verbosity) {
    output::print(
        format!(
            "Event '{}' {}: {} objects ({} copied from template, {} pruned)",
            name,
            plan.event_id(),
            plan.event.len(),
            plan.copied,
            plan.pruned
        ),
        verbosity,
    );
    for (copy, audio) in plan.copies.iter().zip(&plan.audio_files) {
        let action = if copy.reuse { "reuse" } else { "copy" };
        output::print(
            format!(
                "  {} {} -> {} (audio file {})",
                action,
                copy.source.display(),
                copy.dest.display(),
                audio.id
            ),
            verbosity,
        );
    }
}
