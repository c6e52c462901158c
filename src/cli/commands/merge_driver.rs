//! Merge driver command implementation.

use super::Settings;
use crate::cli::MergeDriverArgs;
use crate::config::{self, CliOverrides, ConfigLayer, MergeConfig};
use crate::error::{DocketError, Result};
use crate::output::OutputContext;
use crate::resolve::{MergeDriverRequest, append_failure_log, run_merge_driver};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Execute the merge driver.
///
/// Failures are appended to the configured failure log before the error is
/// returned, so git sees a non-zero exit and keeps its conflict markers.
///
/// # Errors
///
/// Returns an error if any input cannot be read or the result cannot be
/// written.
pub fn execute(args: &MergeDriverArgs, settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let request = MergeDriverRequest {
        base: args.base.clone(),
        ours: args.ours.clone(),
        theirs: args.theirs.clone(),
        display_path: args.path.clone(),
        options: settings.merge.merge_options(),
    };

    let outcome = run_merge_driver(&request, &settings.merge.failure_log)?;

    if ctx.is_json() {
        return ctx.json_pretty(&outcome);
    }
    ctx.success(&format!(
        "Merged {}: {} record(s), {} decision(s)",
        request.label(),
        outcome.entity_count,
        outcome.stats.conflicts.len()
    ));
    Ok(())
}

/// Log a failure that happened before settings could be loaded.
///
/// Config files are not read. The location comes from `--failure-log` or the
/// environment, else the default under the data directory.
pub fn record_setup_failure(args: &MergeDriverArgs, overrides: &CliOverrides, err: &DocketError) {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let log_path = fallback_failure_log(&ConfigLayer::from_env(), overrides, &cwd);
    let label = args
        .path
        .clone()
        .unwrap_or_else(|| args.ours.display().to_string());
    if let Err(log_err) = append_failure_log(&log_path, &label, err) {
        warn!(
            "could not write merge-driver failure log {}: {log_err}",
            log_path.display()
        );
    }
}

/// Failure log location built from the environment and CLI layers only.
#[must_use]
pub fn fallback_failure_log(
    env_layer: &ConfigLayer,
    overrides: &CliOverrides,
    cwd: &Path,
) -> PathBuf {
    let layer = ConfigLayer::merge_layers(&[env_layer.clone(), overrides.as_layer()]);
    let data_dir = config::discover_data_dir(Some(cwd)).ok();
    MergeConfig::from_layer(&layer, data_dir.as_deref(), cwd).failure_log
}
