//! Check command implementation.

use super::{Settings, display_path};
use crate::cli::CheckArgs;
use crate::error::Result;
use crate::jsonl::ConflictMarkerType;
use crate::output::OutputContext;
use crate::resolve::{self, FileMarkers};

/// Execute the check command.
///
/// # Errors
///
/// Returns `DocketError::ConflictMarkers` when any file still contains
/// markers, or an error if a file cannot be read.
pub fn execute(args: &CheckArgs, settings: &Settings, ctx: &OutputContext) -> Result<()> {
    let files = if args.files.is_empty() {
        resolve::jsonl_files(settings.require_data_dir()?)?
    } else {
        args.files.clone()
    };

    let found = resolve::check_files(&files)?;

    if ctx.is_json() {
        ctx.json_pretty(&found)?;
    } else if found.is_empty() {
        ctx.success(&format!("No conflict markers in {} file(s)", files.len()));
    } else {
        for file in &found {
            print_file(file, settings, ctx);
        }
    }

    match resolve::markers_error(&found) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn print_file(file: &FileMarkers, settings: &Settings, ctx: &OutputContext) {
    let name = display_path(&file.path, &settings.cwd);
    ctx.section(&name);
    for marker in &file.markers {
        let kind = match marker.marker_type {
            ConflictMarkerType::Start => "start",
            ConflictMarkerType::Base => "base",
            ConflictMarkerType::Separator => "separator",
            ConflictMarkerType::End => "end",
        };
        match &marker.branch {
            Some(branch) => ctx.print(&format!("  line {}: {kind} ({branch})", marker.line)),
            None => ctx.print(&format!("  line {}: {kind}", marker.line)),
        }
    }
}
