//! Relation commands: like, follow.

use anyhow::{Result, anyhow, bail};
use clap::Args;

use murmur_sync::{ProfileView, RelationSpec, RelationToggle, ToggleOutcome};

use super::parse_id;
use crate::context::App;
use crate::output;

#[derive(Args, Debug)]
pub struct LikeArgs {
    /// Id of the post
    pub post: String,
}

pub async fn like(args: LikeArgs) -> Result<()> {
    let mut app = App::load().await?;
    let post = parse_id(&args.post)?;
    let owner = app.post_owner(&post).await?;

    let toggle = RelationToggle::load(
        app.session.clone(),
        RelationSpec::likes(&app.config),
        post,
        app.engine(),
    )
    .await?
    .notify_on_create(owner);

    let outcome = toggle.toggle().await;
    app.flush_notices();

    let view = committed(outcome)?;
    let verb = if view.related { "Liked" } else { "Unliked" };
    output::success(&format!("{} ({} likes)", verb, view.count));
    Ok(())
}

#[derive(Args, Debug)]
pub struct FollowArgs {
    /// Id of the user
    pub user: String,
}

pub async fn follow(args: FollowArgs) -> Result<()> {
    let mut app = App::load().await?;
    let user = parse_id(&args.user)?;

    let view = ProfileView::load(app.session.clone(), &app.config, &user, app.engine()).await?;
    if view.is_own() {
        bail!("You cannot follow yourself");
    }

    let outcome = view.follow.toggle().await;
    app.flush_notices();

    let followers = committed(outcome)?;
    let verb = if followers.related {
        "Following"
    } else {
        "Unfollowed"
    };
    output::success(&format!(
        "{} {} ({} followers)",
        verb,
        view.profile.display_name(),
        followers.count
    ));
    Ok(())
}

fn committed(outcome: ToggleOutcome) -> Result<murmur_sync::RelationView> {
    match outcome {
        ToggleOutcome::Committed(view) => Ok(view),
        ToggleOutcome::RolledBack { error, .. } => Err(anyhow!(error)),
        ToggleOutcome::Superseded => bail!("Another change to this relation took over"),
    }
}
