//! Comment threads under a post.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use murmur_core::error::InvalidInputError;
use murmur_core::{Collection, Fields, Filter, RecordId, RemoteStore, Result, Sort};

use crate::config::SyncConfig;
use crate::feed::{FeedItem, FeedSnapshot, FeedSynchronizer};
use crate::inbox::{self, NewNotification, NotificationKind};
use crate::lock;
use crate::notice::Notices;
use crate::projection::Projection;

/// The comments of one post, oldest first.
pub struct CommentThread<S> {
    feed: FeedSynchronizer<S>,
    post: RecordId,
    posts: Collection,
    notifications: Collection,
    /// Author of the post, looked up on first use if not given.
    post_owner: Mutex<Option<RecordId>>,
    notices: Notices,
}

impl<S: RemoteStore> CommentThread<S> {
    pub fn new(store: Arc<S>, config: &SyncConfig, post: RecordId, notices: Notices) -> Self {
        let feed = FeedSynchronizer::new(
            store,
            config.collections.comments.clone(),
            config.page_size,
            Sort::oldest_first(),
            Projection::comment(&config.collections),
            notices.clone(),
        );
        Self {
            feed,
            post,
            posts: config.collections.posts.clone(),
            notifications: config.collections.notifications.clone(),
            post_owner: Mutex::new(None),
            notices,
        }
    }

    pub fn with_post_owner(self, owner: RecordId) -> Self {
        *lock(&self.post_owner) = Some(owner);
        self
    }

    pub fn post(&self) -> &RecordId {
        &self.post
    }

    pub fn feed(&self) -> &FeedSynchronizer<S> {
        &self.feed
    }

    pub fn comments(&self) -> Vec<FeedItem> {
        self.feed.items()
    }

    pub async fn load(&self) -> Result<FeedSnapshot> {
        self.feed
            .load_first_page(Filter::new().eq("post_id", self.post.as_str()))
            .await
    }

    pub async fn load_more(&self) -> Result<Vec<FeedItem>> {
        self.feed.load_next_page().await
    }

    /// Post a comment as the actor and append it to the thread.
    ///
    /// Blank content is rejected before anything is sent. The post's author
    /// is notified unless they wrote the comment themselves.
    #[instrument(skip(self, content), fields(post = %self.post))]
    pub async fn add(&self, content: &str) -> Result<FeedItem> {
        let content = content.trim();
        if content.is_empty() {
            return Err(InvalidInputError::Field {
                value: "content".to_string(),
                reason: "comment cannot be empty".to_string(),
            }
            .into());
        }

        let item = match self.create(content).await {
            Ok(item) => item,
            Err(error) => {
                warn!(%error, "Comment not added");
                self.notices.error(format!("Could not add comment: {}", error));
                return Err(error);
            }
        };
        self.feed.append_item(item.clone());
        self.notices.success("Comment added");

        self.notify_owner().await;
        Ok(item)
    }

    /// Delete a comment remotely, then drop it from the thread.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        self.feed.delete_item(id).await
    }

    async fn create(&self, content: &str) -> Result<FeedItem> {
        let store = self.feed.store();
        let mut fields = Fields::new();
        fields.insert("post_id".into(), Value::from(self.post.as_str()));
        fields.insert("user_id".into(), Value::from(store.actor().as_str()));
        fields.insert("content".into(), Value::from(content));

        let created = store.create(self.feed.collection(), &fields).await?;
        debug!(id = %created.id, "Created comment");

        // Re-read so the author relation comes back expanded.
        let record = store
            .get_one(
                self.feed.collection(),
                &created.id,
                self.feed.projection().expansions(),
            )
            .await?;
        Ok(FeedItem::from_record(
            &record,
            self.feed.projection(),
            store.actor(),
        ))
    }

    async fn notify_owner(&self) {
        let store = self.feed.store();

        let known = lock(&self.post_owner).clone();
        let owner = match known {
            Some(owner) => owner,
            None => match store.get_one(&self.posts, &self.post, &[]).await {
                Ok(post) => match post.get_id("user_id") {
                    Some(owner) => {
                        *lock(&self.post_owner) = Some(owner.clone());
                        owner
                    }
                    None => return,
                },
                Err(error) => {
                    warn!(%error, "Could not look up post author");
                    return;
                }
            },
        };

        if &owner == store.actor() {
            return;
        }

        let notification = NewNotification {
            recipient: owner,
            kind: NotificationKind::Comment,
            post: Some(self.post.clone()),
            message: None,
        };
        inbox::deliver_best_effort(store.as_ref(), &self.notifications, &notification).await;
    }
}
