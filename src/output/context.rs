use crate::cli::Cli;
use crate::error::Result;
use std::io::IsTerminal;

/// Central output coordinator that respects json/quiet/color modes.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    mode: OutputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Text with ANSI colors (interactive terminal)
    Color,
    /// Plain text, no ANSI codes (for piping)
    Plain,
    /// JSON output only
    Json,
    /// Minimal output (quiet mode)
    Quiet,
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

impl OutputContext {
    /// Create from CLI global args
    #[must_use]
    pub fn from_args(args: &Cli) -> Self {
        Self::from_flags(args.json, args.quiet, args.no_color)
    }

    /// Create from CLI-style flags.
    #[must_use]
    pub fn from_flags(json: bool, quiet: bool, no_color: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if no_color || std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal()
        {
            OutputMode::Plain
        } else {
            OutputMode::Color
        };
        Self { mode }
    }

    pub const fn mode(&self) -> OutputMode {
        self.mode
    }
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
    pub fn is_quiet(&self) -> bool {
        self.mode == OutputMode::Quiet
    }
    pub fn use_color(&self) -> bool {
        self.mode == OutputMode::Color
    }

    pub fn print(&self, content: &str) {
        match self.mode {
            OutputMode::Color | OutputMode::Plain => println!("{content}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    /// Print a value as pretty JSON (JSON mode only).
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn json_pretty<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Color => println!("{GREEN}✓{RESET} {message}"),
            OutputMode::Plain => println!("✓ {message}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Color => eprintln!("{YELLOW}⚠ {message}{RESET}"),
            OutputMode::Plain => eprintln!("Warning: {message}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn section(&self, title: &str) {
        match self.mode {
            OutputMode::Color => println!("{BOLD}{title}{RESET}"),
            OutputMode::Plain => println!("{title}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins_over_quiet() {
        let ctx = OutputContext::from_flags(true, true, false);
        assert!(ctx.is_json());
        assert!(!ctx.use_color());
    }

    #[test]
    fn quiet_and_plain_modes() {
        assert!(OutputContext::from_flags(false, true, false).is_quiet());
        assert_eq!(
            OutputContext::from_flags(false, false, true).mode(),
            OutputMode::Plain
        );
    }
}
