//! Resolve command implementation.

use super::{Settings, display_path};
use crate::cli::ResolveArgs;
use crate::error::Result;
use crate::output::OutputContext;
use crate::resolve::{self, MergeSource, ResolveOutcome, ResolveStatus};
use tracing::debug;

/// Execute the resolve command.
///
/// # Errors
///
/// Returns an error if a file cannot be read or written, or no files were
/// given and there is no `.docket` directory.
pub fn execute(args: &ResolveArgs, settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let mut options = settings.merge.resolve_options(args.dry_run);
    if args.no_git_stages {
        options.use_git_stages = false;
    }

    let outcomes = if args.files.is_empty() {
        let data_dir = settings.require_data_dir()?;
        debug!(dir = %data_dir.display(), "Resolving all conflicted files");
        resolve::resolve_all(data_dir, &options)?
    } else {
        args.files
            .iter()
            .map(|path| resolve::resolve_conflicts(path, &options))
            .collect::<Result<Vec<_>>>()?
    };

    if ctx.is_json() {
        return ctx.json_pretty(&outcomes);
    }

    if outcomes.is_empty() {
        ctx.print("No conflicted files found.");
        return Ok(());
    }
    for outcome in &outcomes {
        print_outcome(outcome, settings, ctx);
    }
    Ok(())
}

fn print_outcome(outcome: &ResolveOutcome, settings: &Settings, ctx: &OutputContext) {
    let name = display_path(&outcome.path, &settings.cwd);
    if outcome.status == ResolveStatus::NoConflicts {
        ctx.print(&format!("{name}: no conflict markers"));
        return;
    }

    let source = match outcome.source {
        Some(MergeSource::GitStages) => "git stages",
        Some(MergeSource::ConflictMarkers) | None => "conflict markers",
    };
    let verb = if outcome.dry_run {
        "Would resolve"
    } else {
        "Resolved"
    };
    ctx.success(&format!(
        "{verb} {name}: {} region(s), {} record(s), {} decision(s) (from {source})",
        outcome.regions,
        outcome.entity_count,
        outcome.stats.conflicts.len()
    ));
    for conflict in &outcome.stats.conflicts {
        ctx.print(&format!(
            "  {} {}: {}",
            conflict.action, conflict.id, conflict.description
        ));
    }
    for skipped in &outcome.skipped_lines {
        ctx.warning(&format!(
            "{name}:{}: skipped malformed line ({})",
            skipped.line, skipped.reason
        ));
    }
}
