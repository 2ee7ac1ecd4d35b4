//! CLI argument definitions and subcommand routing.

pub mod config;
pub mod inspect;
pub mod profile;

use clap::{Parser, Subcommand};
use threepid::ThreePid;

/// Manage whether your email addresses and phone numbers make you
/// discoverable.
///
/// Launch without a subcommand to enter the TUI.
/// Use subcommands for one-shot operations.
#[derive(Parser)]
#[command(name = "threepid", version, about)]
pub struct Cli {
    /// Profile to use for the TUI session.
    #[arg(short, long)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One-shot operations (run and exit).
#[derive(Subcommand)]
pub enum Command {
    /// Create a new profile with the identifiers it manages.
    New(NewArgs),
    /// List all saved profiles.
    #[command(alias = "ls")]
    List,
    /// Remove a profile and its data.
    #[command(alias = "rm")]
    Remove {
        /// Profile name to remove.
        name: String,
    },
    /// Remove ALL profiles and data (requires confirmation).
    Clear,
    /// Show profile settings and the discoverability of each identifier.
    Info {
        /// Profile to inspect (uses default if omitted).
        #[arg(short, long)]
        profile: Option<String>,
        /// Print a JSON document instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show or set the default profile.
    Default {
        /// Profile name to set as default. Omit to show current.
        name: Option<String>,
    },
}

/// Arguments for the `new` subcommand.
#[derive(clap::Args)]
pub struct NewArgs {
    /// Profile name.
    pub name: String,

    /// Email address or phone number to manage (repeatable).
    #[arg(short = 't', long = "threepid", value_parser = parse_three_pid, required = true)]
    pub three_pids: Vec<ThreePid>,

    /// Seed these identifiers as already discoverable.
    #[arg(long)]
    pub bound: bool,

    /// Simulate a homeserver that can replace a binding in one call.
    #[arg(long)]
    pub rebind: bool,

    /// Simulate a session without an identity service.
    #[arg(long)]
    pub no_identity_server: bool,

    /// Simulated per-request latency in milliseconds.
    #[arg(long, default_value_t = 400)]
    pub latency_ms: u64,

    /// Log filter for the TUI session log.
    #[arg(long, default_value = "info")]
    pub log: String,
}

/// `value_parser` adapter for [`ThreePid::parse`].
pub fn parse_three_pid(s: &str) -> Result<ThreePid, String> {
    ThreePid::parse(s).map_err(|e| e.to_string())
}
