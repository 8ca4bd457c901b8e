//! Account commands: login, whoami, logout, create-account.

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use murmur_core::{Credentials, RemoteStore};
use murmur_sync::{ensure_profile, fetch_profile};

use super::parse_store;
use crate::config;
use crate::context::App;
use crate::output;
use crate::session::storage::{self, AnyBackend};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username or email
    #[arg(long)]
    pub identity: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn login(args: LoginArgs, store: &str) -> Result<()> {
    let url = parse_store(store)?;
    let backend = AnyBackend::open(url)?;

    output::hint("Logging in...");

    let session = backend
        .login(Credentials::new(&args.identity, &args.password))
        .await
        .context("Failed to login")?;

    storage::save_session(&session).context("Failed to save session")?;

    let config = config::load()?;
    let profile = match ensure_profile(&session, &config.collections.profiles).await {
        Ok(profile) => Some(profile),
        Err(error) => {
            warn!(%error, "Could not set up profile");
            None
        }
    };

    output::success("Logged in successfully");
    println!();
    output::field("Actor", session.actor().as_str());
    output::field("Store", session.url().as_str());
    if let Some(profile) = profile {
        output::field("Name", profile.display_name());
    }

    Ok(())
}

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn whoami(_args: WhoamiArgs) -> Result<()> {
    let app = App::load().await?;

    output::field("Actor", app.actor().as_str());
    output::field("Store", app.session.url().as_str());

    let profile = fetch_profile(app.session.as_ref(), &app.config.collections.profiles, app.actor())
        .await
        .context("Failed to fetch profile")?;
    match profile {
        Some(profile) => output::field("Name", profile.display_name()),
        None => output::hint("No profile yet."),
    }

    Ok(())
}

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn logout(_args: LogoutArgs) -> Result<()> {
    if storage::clear_session()? {
        output::success("Logged out");
    } else {
        output::hint("No active session.");
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct CreateAccountArgs {
    /// Username (or email address) for the new account
    pub username: String,

    /// Account password
    #[arg(long)]
    pub password: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn create_account(args: CreateAccountArgs, store: &str) -> Result<()> {
    let url = parse_store(store)?;
    let backend = AnyBackend::open(url.clone())?;

    let account = backend
        .create_account(&args.username, &args.password, args.name.as_deref())
        .await
        .context("Failed to create account")?;

    output::field("Id", account.id.as_str());
    output::field("Username", &account.username);
    output::field("Store", url.as_str());
    output::success("Account created successfully");

    Ok(())
}
