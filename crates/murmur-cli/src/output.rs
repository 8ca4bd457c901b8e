//! Output formatting helpers.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;

use murmur_sync::{Notice, NoticeLevel};

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a dimmed hint to stderr.
pub fn hint(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a notice to stderr.
pub fn notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Error => eprintln!("{} {}", "✗".red(), notice.message),
        NoticeLevel::Success => eprintln!("{} {}", "✓".green(), notice.message),
        NoticeLevel::Info => eprintln!("{} {}", "i".blue(), notice.message),
    }
}

pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}
