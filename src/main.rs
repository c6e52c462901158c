use clap::Parser;
use docket::cli::commands::{self, Settings};
use docket::cli::{Cli, Commands};
use docket::config;
use docket::logging::init_logging;
use docket::output::OutputContext;
use docket::{DocketError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = build_cli_overrides(&cli);
    let ctx = OutputContext::from_args(&cli);

    let result = match Settings::load(&overrides, cli.config_dir.as_deref()) {
        Ok(settings) => match &cli.command {
            Commands::Resolve(args) => commands::resolve::execute(args, &settings, &ctx),
            Commands::MergeDriver(args) => commands::merge_driver::execute(args, &settings, &ctx),
            Commands::Check(args) => commands::check::execute(args, &settings, &ctx),
        },
        Err(err) => {
            if let Commands::MergeDriver(args) = &cli.command {
                commands::merge_driver::record_setup_failure(args, &overrides, &err);
            }
            Err(err)
        }
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &DocketError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    let mut overrides = config::CliOverrides::default();
    match &cli.command {
        Commands::Resolve(args) if args.no_git_stages => {
            overrides.use_git_stages = Some(false);
        }
        Commands::MergeDriver(args) => {
            overrides.failure_log.clone_from(&args.failure_log);
        }
        _ => {}
    }
    overrides
}
