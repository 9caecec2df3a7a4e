//! Clap derive structures for the `doorwatch` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use doorwatch_core::MessageKind;
use strum::IntoEnumIterator;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// doorwatch -- live access-control event monitor
#[derive(Debug, Parser)]
#[command(
    name = "doorwatch",
    version,
    about = "Monitor access-control events from the command line",
    long_about = "Connects to an access-control event source over WebSocket and\n\
        keeps door, alert and access-event state up to date.\n\n\
        Use --simulate to run against the built-in event generator.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, env = "DOORWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Event source URL (overrides config)
    #[arg(long, short = 'u', env = "DOORWATCH_URL", global = true)]
    pub url: Option<String>,

    /// Use the built-in event simulator instead of a live connection
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DOORWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// JSON (one document per line when streaming)
    Json,
    /// Plain tab-separated text (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream the live event feed and connection changes
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Collect alerts for a window and list them
    #[command(alias = "a")]
    Alerts(AlertsArgs),

    /// Collect door status for a window and list it
    #[command(alias = "d")]
    Doors(DoorsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH / ALERTS / DOORS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,

    /// Only show these message kinds (e.g. new_alert,access_event)
    #[arg(long, short = 'k', value_delimiter = ',', value_parser = parse_kind)]
    pub kinds: Vec<MessageKind>,
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Seconds to collect events before listing
    #[arg(long, short = 'd', default_value = "5")]
    pub duration: u64,

    /// Acknowledge every unacknowledged alert as this user
    #[arg(long, value_name = "USER")]
    pub ack_as: Option<String>,
}

#[derive(Debug, Args)]
pub struct DoorsArgs {
    /// Seconds to collect events before listing
    #[arg(long, short = 'd', default_value = "5")]
    pub duration: u64,
}

/// Accepts wire names in any case, with `-` or `_` separators.
fn parse_kind(raw: &str) -> Result<MessageKind, String> {
    let normalized = raw.trim().replace('-', "_").to_ascii_uppercase();
    normalized.parse().map_err(|_| {
        let known: Vec<&'static str> = MessageKind::iter().map(Into::into).collect();
        format!(
            "unknown message kind '{raw}' (expected one of: {})",
            known.join(", ")
        )
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
