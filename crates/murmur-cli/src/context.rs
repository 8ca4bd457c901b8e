//! Per-command state: the signed-in session, config and notice bus.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::TryRecvError};

use murmur_core::{RecordId, RemoteStore};
use murmur_sync::{FeedSynchronizer, Notice, Notices, OptimisticEngine, RelationKey, SyncConfig};

use crate::config;
use crate::output;
use crate::session::{CliSession, storage};

pub struct App {
    pub session: Arc<CliSession>,
    pub config: SyncConfig,
    pub notices: Notices,
    receiver: broadcast::Receiver<Notice>,
}

impl App {
    /// Open the saved session, failing if nobody is signed in.
    pub async fn load() -> Result<Self> {
        let session = storage::load_session()
            .await
            .context("Failed to load session")?
            .context("No active session. Run 'murmur login' first.")?;
        let config = config::load()?;

        let notices = Notices::new();
        let receiver = notices.subscribe();

        Ok(Self {
            session: Arc::new(session),
            config,
            notices,
            receiver,
        })
    }

    pub fn actor(&self) -> &RecordId {
        self.session.actor()
    }

    pub fn engine(&self) -> Arc<OptimisticEngine<RelationKey>> {
        Arc::new(OptimisticEngine::new(self.notices.clone()))
    }

    pub fn posts(&self) -> FeedSynchronizer<CliSession> {
        FeedSynchronizer::posts(self.session.clone(), &self.config, self.notices.clone())
    }

    /// Id of the user who wrote a post.
    pub async fn post_owner(&self, post: &RecordId) -> Result<RecordId> {
        self.posts()
            .owner_of(post)
            .await
            .with_context(|| format!("Failed to fetch post {}", post))?
            .with_context(|| format!("Post {} has no owner", post))
    }

    /// Print the notices published so far to stderr.
    pub fn flush_notices(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(notice) => output::notice(&notice),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}
