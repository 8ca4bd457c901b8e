//! Session handling for the CLI.

pub mod storage;
mod types;

pub use types::CliSession;
