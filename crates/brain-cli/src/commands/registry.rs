use std::time::Instant;

use anyhow::Context;
use brain_core::responses::RegistryRebuildResponse;
use brain_store::Brain;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ResolveArgs;
use crate::cli::subcommands::RegistryCommands;
use crate::output::output;

/// Handle `brain registry`.
pub fn handle(action: &RegistryCommands, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        RegistryCommands::Rebuild => rebuild(brain, flags),
        RegistryCommands::Stats => stats(brain, flags),
    }
}

fn rebuild(brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut rebuild = brain.rebuild_registry()?;
    let stats = rebuild.registry.compute_stats().clone();

    let response = RegistryRebuildResponse {
        path: rebuild.path.display().to_string(),
        entities: rebuild.registry.entities.len(),
        aliases: rebuild.registry.alias_index.len(),
        collisions: rebuild.collisions,
        stats,
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    output(&response, flags.format)
}

fn stats(brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let mut registry = brain
        .load_registry()?
        .context("no registry found (run `brain registry rebuild` first)")?;
    let stats = match registry.stats.take() {
        Some(stats) => stats,
        None => registry.compute_stats().clone(),
    };
    output(&stats, flags.format)
}

/// Handle `brain resolve`. Prints `null` when nothing matches.
pub fn resolve(args: &ResolveArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let entry = brain.resolve(&args.query)?;
    if entry.is_none() {
        tracing::debug!("no registry entry for '{}'", args.query);
    }
    output(&entry, flags.format)
}
