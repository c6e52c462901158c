//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Three-way merge and conflict resolution for JSONL record files
#[derive(Parser, Debug)]
#[command(name = "docket", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory holding the user config.yaml (default ~/.config/docket)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Also write JSON log events to this file
    #[arg(long, global = true, env = "DOCKET_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve git conflict markers in JSONL files
    #[command(long_about = "Resolve git conflict markers in JSONL files.

With no FILES, every conflicted *.jsonl file in the .docket directory is
resolved. Git's index stages are used when available; otherwise the two
sides are reconstructed from the conflict markers.")]
    Resolve(ResolveArgs),

    /// Git merge driver: merge BASE, OURS and THEIRS into OURS
    #[command(long_about = "Git merge driver: merge BASE, OURS and THEIRS into OURS.

Configure with:
  git config merge.docket.driver 'docket merge-driver %O %A %B --path %P'
  echo '.docket/*.jsonl merge=docket' >> .gitattributes")]
    MergeDriver(MergeDriverArgs),

    /// Report conflict markers without changing anything
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Files to resolve (default: conflicted *.jsonl in .docket/)
    pub files: Vec<PathBuf>,

    /// Show what would be merged without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore git's index stages and use the conflict markers
    #[arg(long)]
    pub no_git_stages: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MergeDriverArgs {
    /// Ancestor version (%O)
    pub base: PathBuf,

    /// Our version (%A); receives the result
    pub ours: PathBuf,

    /// Their version (%B)
    pub theirs: PathBuf,

    /// Path of the file in the repository (%P), for diagnostics
    #[arg(long)]
    pub path: Option<String>,

    /// Failure log location (default .docket/merge-driver.log)
    #[arg(long, value_name = "PATH")]
    pub failure_log: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Files to scan (default: *.jsonl in .docket/)
    pub files: Vec<PathBuf>,
}
