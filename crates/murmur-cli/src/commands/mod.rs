//! Subcommand implementations.

mod account;
mod comments;
mod feed;
mod notifications;
mod post;
mod profile;
mod relation;

use anyhow::{Context, Result};
use clap::Subcommand;

use murmur_core::{RecordId, StoreUrl};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and save the session
    Login(account::LoginArgs),

    /// Display the signed-in user
    Whoami(account::WhoamiArgs),

    /// Forget the saved session
    Logout(account::LogoutArgs),

    /// Create a new account
    CreateAccount(account::CreateAccountArgs),

    /// Show the post feed, newest first
    Feed(feed::FeedArgs),

    /// Publish a post
    Post(post::PostArgs),

    /// Delete one of your posts
    DeletePost(post::DeletePostArgs),

    /// Like a post, or unlike it if already liked
    Like(relation::LikeArgs),

    /// Follow a user, or unfollow if already following
    Follow(relation::FollowArgs),

    /// Show a profile (your own by default)
    Profile(profile::ProfileArgs),

    /// Change your display name or bio
    EditProfile(profile::EditProfileArgs),

    /// Show the comments on a post
    Comments(comments::CommentsArgs),

    /// Comment on a post
    Comment(comments::CommentArgs),

    /// List your notifications
    Notifications(notifications::NotificationsArgs),
}

pub async fn handle(command: Command, store: &str) -> Result<()> {
    match command {
        Command::Login(args) => account::login(args, store).await,
        Command::Whoami(args) => account::whoami(args).await,
        Command::Logout(args) => account::logout(args),
        Command::CreateAccount(args) => account::create_account(args, store).await,
        Command::Feed(args) => feed::run(args).await,
        Command::Post(args) => post::create(args).await,
        Command::DeletePost(args) => post::delete(args).await,
        Command::Like(args) => relation::like(args).await,
        Command::Follow(args) => relation::follow(args).await,
        Command::Profile(args) => profile::run(args).await,
        Command::EditProfile(args) => profile::edit(args).await,
        Command::Comments(args) => comments::list(args).await,
        Command::Comment(args) => comments::add(args).await,
        Command::Notifications(args) => notifications::run(args).await,
    }
}

fn parse_store(store: &str) -> Result<StoreUrl> {
    StoreUrl::new(store).context("Invalid store URL")
}

fn parse_id(id: &str) -> Result<RecordId> {
    RecordId::new(id).with_context(|| format!("Invalid id '{}'", id))
}
