//! Notifications command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use murmur_sync::Inbox;

use crate::context::App;
use crate::output;

#[derive(Args, Debug)]
pub struct NotificationsArgs {
    /// Mark every notification as read after listing
    #[arg(long)]
    pub mark_all_read: bool,
}

pub async fn run(args: NotificationsArgs) -> Result<()> {
    let mut app = App::load().await?;

    let inbox = Inbox::new(app.session.clone(), &app.config, app.notices.clone());
    let notifications = inbox.load().await.context("Failed to load notifications")?;
    app.flush_notices();

    if notifications.is_empty() {
        output::hint("No notifications.");
        return Ok(());
    }

    for notification in &notifications {
        let marker = if notification.read { " ".normal() } else { "•".blue() };
        println!(
            "{} {} {}",
            marker,
            notification.text(),
            output::timestamp(&notification.created).dimmed()
        );
    }
    println!();
    output::field("Unread", &inbox.unread_count().to_string());

    if args.mark_all_read {
        let report = inbox.mark_all_read().await;
        app.flush_notices();
        if report.is_complete() {
            output::success(&format!("Marked {} as read", report.marked.len()));
        } else {
            anyhow::bail!(
                "Marked {} as read, {} failed",
                report.marked.len(),
                report.failed.len()
            );
        }
    }

    Ok(())
}
