//! Profile command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use murmur_core::Fields;
use murmur_sync::{ProfileView, ensure_profile, update_profile};

use super::parse_id;
use crate::context::App;
use crate::output;

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Id of the user (defaults to you)
    pub user: Option<String>,
}

pub async fn run(args: ProfileArgs) -> Result<()> {
    let app = App::load().await?;

    let user = match &args.user {
        Some(user) => parse_id(user)?,
        None => {
            ensure_profile(app.session.as_ref(), &app.config.collections.profiles)
                .await
                .context("Failed to set up profile")?;
            app.actor().clone()
        }
    };

    let view = ProfileView::load(app.session.clone(), &app.config, &user, app.engine())
        .await
        .context("Failed to load profile")?;
    let followers = view.followers();
    let profile = &view.profile;

    output::field("Name", profile.display_name());
    if !profile.username.is_empty() {
        output::field("Username", &format!("@{}", profile.username));
    }
    output::field("Id", profile.id.as_str());
    if let Some(bio) = &profile.bio {
        output::field("Bio", bio);
    }
    output::field("Joined", &output::timestamp(&profile.created));
    output::field("Followers", &followers.count.to_string());
    output::field("Following", &view.following_count.to_string());
    if !view.is_own() {
        output::field("You follow", if followers.related { "yes" } else { "no" });
    }

    Ok(())
}

#[derive(Args, Debug)]
pub struct EditProfileArgs {
    /// Display name (empty to clear)
    #[arg(long)]
    pub name: Option<String>,

    /// Short bio (empty to clear)
    #[arg(long)]
    pub bio: Option<String>,
}

pub async fn edit(args: EditProfileArgs) -> Result<()> {
    let app = App::load().await?;

    let mut fields = Fields::new();
    if let Some(name) = args.name {
        fields.insert("name".into(), Value::from(name));
    }
    if let Some(bio) = args.bio {
        fields.insert("bio".into(), Value::from(bio));
    }
    if fields.is_empty() {
        bail!("Nothing to change. Pass --name or --bio.");
    }

    let profile = update_profile(app.session.as_ref(), &app.config.collections.profiles, &fields)
        .await
        .context("Failed to update profile")?;

    output::success("Profile updated");
    output::field("Name", profile.display_name());
    if let Some(bio) = &profile.bio {
        output::field("Bio", bio);
    }
    Ok(())
}
