//! Feed command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use murmur_core::Filter;
use murmur_sync::FeedItem;

use super::parse_id;
use crate::context::App;
use crate::output;

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Only show posts by this user id
    #[arg(long)]
    pub user: Option<String>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: u32,

    /// Print each post as a JSON line
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: FeedArgs) -> Result<()> {
    let mut app = App::load().await?;

    let filter = match &args.user {
        Some(user) => Filter::new().eq("user_id", parse_id(user)?.as_str()),
        None => Filter::new(),
    };

    let feed = app.posts();
    feed.load_first_page(filter)
        .await
        .context("Failed to load feed")?;

    for _ in 1..args.pages {
        if !feed.has_more() {
            break;
        }
        feed.load_next_page()
            .await
            .context("Failed to load more posts")?;
    }
    app.flush_notices();

    let items = feed.items();
    if items.is_empty() {
        output::hint("No posts yet.");
        return Ok(());
    }

    for item in &items {
        if args.json {
            output::json(&post_json(item))?;
        } else {
            print_post(item);
        }
    }

    if feed.has_more() {
        output::hint(&format!(
            "More posts available (--pages {})",
            args.pages + 1
        ));
    }

    Ok(())
}

fn post_json(item: &FeedItem) -> serde_json::Value {
    let mut payload = item.payload.clone();
    payload.insert("id".into(), item.id.as_str().into());
    payload.insert("created".into(), item.created.to_rfc3339().into());
    serde_json::Value::Object(payload)
}

pub fn print_post(item: &FeedItem) {
    let liked = if item.get_bool("liked_by_actor").unwrap_or(false) {
        "♥".red()
    } else {
        "♡".normal()
    };

    println!(
        "{} {} {}",
        item.get_str("author_name").unwrap_or("User").bold(),
        output::timestamp(&item.created).dimmed(),
        item.id.as_str().dimmed()
    );
    println!("  {}", item.get_str("content").unwrap_or_default());
    println!(
        "  {} {}  💬 {}",
        liked,
        item.get_i64("like_count").unwrap_or(0),
        item.get_i64("comment_count").unwrap_or(0)
    );
    println!();
}
