//! Post commands: post, delete-post.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use murmur_core::Fields;

use super::parse_id;
use crate::context::App;
use crate::output;

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Text of the post
    pub text: String,
}

pub async fn create(args: PostArgs) -> Result<()> {
    let mut app = App::load().await?;

    if args.text.trim().is_empty() {
        bail!("Post text cannot be empty");
    }

    let mut fields = Fields::new();
    fields.insert("content".into(), Value::from(args.text));

    let result = app.posts().create_item(fields).await;
    app.flush_notices();
    let item = result.context("Failed to create post")?;

    println!("{}", item.id);
    output::success("Post published");

    Ok(())
}

#[derive(Args, Debug)]
pub struct DeletePostArgs {
    /// Id of the post
    pub id: String,
}

pub async fn delete(args: DeletePostArgs) -> Result<()> {
    let mut app = App::load().await?;
    let id = parse_id(&args.id)?;

    let feed = app.posts();
    let owner = feed
        .owner_of(&id)
        .await
        .with_context(|| format!("Failed to fetch post {}", id))?;
    if owner.as_ref() != Some(app.actor()) {
        bail!("You can only delete your own posts");
    }

    let result = feed.delete_item(&id).await;
    app.flush_notices();
    result.context("Failed to delete post")?;

    output::success("Post deleted");
    Ok(())
}
