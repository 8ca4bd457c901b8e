//! CLI argument definitions.

use clap::Parser;

use crate::commands::Command;

/// Store used when neither `--store` nor `MURMUR_STORE` is given.
pub const DEFAULT_STORE: &str = "http://127.0.0.1:8090";

/// Command-line client for a murmur social store.
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(author, version = env!("MURMUR_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Store URL for login and create-account (https://, http://localhost or file://)
    #[arg(long, global = true, env = "MURMUR_STORE", default_value = DEFAULT_STORE)]
    pub store: String,

    #[command(subcommand)]
    pub command: Command,
}
