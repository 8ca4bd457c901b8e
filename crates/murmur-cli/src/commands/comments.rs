//! Comment commands: comments, comment.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use murmur_sync::{CommentThread, FeedItem};

use super::parse_id;
use crate::context::App;
use crate::output;

#[derive(Args, Debug)]
pub struct CommentsArgs {
    /// Id of the post
    pub post: String,

    /// Load every page of comments
    #[arg(long)]
    pub all: bool,
}

pub async fn list(args: CommentsArgs) -> Result<()> {
    let mut app = App::load().await?;
    let post = parse_id(&args.post)?;

    let thread = CommentThread::new(app.session.clone(), &app.config, post, app.notices.clone());
    let snapshot = thread.load().await.context("Failed to load comments")?;

    let mut has_more = snapshot.has_more;
    while args.all && has_more {
        thread
            .load_more()
            .await
            .context("Failed to load more comments")?;
        has_more = thread.feed().has_more();
    }
    app.flush_notices();

    let comments = thread.comments();
    if comments.is_empty() {
        output::hint("No comments yet.");
        return Ok(());
    }

    for comment in &comments {
        print_comment(comment);
    }
    if has_more {
        output::hint("More comments available (--all)");
    }

    Ok(())
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Id of the post
    pub post: String,

    /// Text of the comment
    pub text: String,
}

pub async fn add(args: CommentArgs) -> Result<()> {
    let mut app = App::load().await?;
    let post = parse_id(&args.post)?;
    let owner = app.post_owner(&post).await?;

    let thread = CommentThread::new(app.session.clone(), &app.config, post, app.notices.clone())
        .with_post_owner(owner);
    let result = thread.add(&args.text).await;
    app.flush_notices();

    let comment = result.context("Failed to add comment")?;
    println!("{}", comment.id);
    Ok(())
}

fn print_comment(comment: &FeedItem) {
    println!(
        "{} {}",
        comment.get_str("author_name").unwrap_or("User").bold(),
        output::timestamp(&comment.created).dimmed()
    );
    println!("  {}", comment.get_str("content").unwrap_or_default());
}
