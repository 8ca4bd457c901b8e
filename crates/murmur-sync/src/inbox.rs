//! Notifications inbox.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use murmur_core::{
    Collection, Fields, Filter, ListOptions, Record, RecordId, RemoteStore, Result, Sort,
};

use crate::config::SyncConfig;
use crate::lock;
use crate::notice::Notices;
use crate::projection::Projection;

/// What a notification is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Like,
    Follow,
    Comment,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Follow => "follow",
            NotificationKind::Comment => "comment",
            NotificationKind::Other(kind) => kind,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "like" => NotificationKind::Like,
            "follow" => NotificationKind::Follow,
            "comment" => NotificationKind::Comment,
            other => NotificationKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification as shown in the inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: RecordId,
    pub kind: NotificationKind,
    pub from_user: Option<RecordId>,
    pub from_name: String,
    pub post: Option<RecordId>,
    pub message: Option<String>,
    pub read: bool,
    pub created: DateTime<Utc>,
}

impl Notification {
    fn from_record(record: &Record, projection: &Projection, actor: &RecordId) -> Self {
        let payload = projection.apply(record, actor);
        Self {
            id: record.id.clone(),
            kind: NotificationKind::parse(record.get_str("type").unwrap_or_default()),
            from_user: record.get_id("from_user_id"),
            from_name: payload
                .get("from_name")
                .and_then(Value::as_str)
                .unwrap_or("Someone")
                .to_string(),
            post: record.get_id("post_id"),
            message: record
                .get_str("message")
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            read: record.get("read").and_then(Value::as_bool).unwrap_or(false),
            created: record.created,
        }
    }

    /// One line describing the notification.
    pub fn text(&self) -> String {
        match &self.kind {
            NotificationKind::Like => format!("{} liked your post", self.from_name),
            NotificationKind::Follow => format!("{} started following you", self.from_name),
            NotificationKind::Comment => format!("{} commented on your post", self.from_name),
            NotificationKind::Other(_) => self
                .message
                .clone()
                .unwrap_or_else(|| "New notification".to_string()),
        }
    }
}

/// A notification about to be sent from the actor to `recipient`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient: RecordId,
    pub kind: NotificationKind,
    pub post: Option<RecordId>,
    pub message: Option<String>,
}

impl NewNotification {
    fn to_fields(&self, from: &RecordId) -> Fields {
        let mut fields = Fields::new();
        fields.insert("user_id".into(), Value::from(self.recipient.as_str()));
        fields.insert("from_user_id".into(), Value::from(from.as_str()));
        fields.insert("type".into(), Value::from(self.kind.as_str()));
        fields.insert("read".into(), Value::Bool(false));
        if let Some(post) = &self.post {
            fields.insert("post_id".into(), Value::from(post.as_str()));
        }
        if let Some(message) = &self.message {
            fields.insert("message".into(), Value::from(message.as_str()));
        }
        fields
    }
}

/// Create a notification record from the store's actor.
pub async fn deliver<S: RemoteStore + ?Sized>(
    store: &S,
    collection: &Collection,
    notification: &NewNotification,
) -> Result<Record> {
    store
        .create(collection, &notification.to_fields(store.actor()))
        .await
}

/// [`deliver`], logging failures instead of returning them.
pub async fn deliver_best_effort<S: RemoteStore + ?Sized>(
    store: &S,
    collection: &Collection,
    notification: &NewNotification,
) {
    match deliver(store, collection, notification).await {
        Ok(record) => debug!(id = %record.id, kind = %notification.kind, "Delivered notification"),
        Err(error) => {
            warn!(%error, kind = %notification.kind, recipient = %notification.recipient, "Notification not delivered")
        }
    }
}

/// Result of [`Inbox::mark_all_read`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkAllReport {
    pub marked: Vec<RecordId>,
    pub failed: Vec<RecordId>,
}

impl MarkAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The actor's notifications.
pub struct Inbox<S> {
    store: Arc<S>,
    collection: Collection,
    limit: u32,
    projection: Projection,
    notices: Notices,
    items: Mutex<Vec<Notification>>,
}

impl<S: RemoteStore> Inbox<S> {
    pub fn new(store: Arc<S>, config: &SyncConfig, notices: Notices) -> Self {
        Self {
            store,
            collection: config.collections.notifications.clone(),
            limit: config.inbox_page_size.max(1),
            projection: Projection::notification(&config.collections),
            notices,
            items: Mutex::new(Vec::new()),
        }
    }

    /// Fetch the newest notifications addressed to the actor.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Notification>> {
        let actor = self.store.actor();
        let options = ListOptions {
            filter: Filter::new().eq("user_id", actor.as_str()),
            sort: Some(Sort::newest_first()),
            expand: self.projection.expansions().to_vec(),
        };
        let page = self
            .store
            .list(&self.collection, 1, self.limit, &options)
            .await?;

        let items: Vec<Notification> = page
            .items
            .iter()
            .map(|record| Notification::from_record(record, &self.projection, actor))
            .collect();
        debug!(count = items.len(), "Loaded notifications");

        *lock(&self.items) = items.clone();
        Ok(items)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.items).clone()
    }

    pub fn unread_count(&self) -> usize {
        lock(&self.items).iter().filter(|n| !n.read).count()
    }

    /// Mark one notification read remotely, then locally.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: &RecordId) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("read".into(), Value::Bool(true));

        self.store.update(&self.collection, id, &fields).await?;
        self.set_read(id);
        Ok(())
    }

    /// Mark every unread notification read, one at a time.
    ///
    /// A failure does not stop the rest and does not undo earlier successes;
    /// only the notifications the store accepted become read locally.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> MarkAllReport {
        let unread: Vec<RecordId> = lock(&self.items)
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect();

        let mut report = MarkAllReport::default();
        for id in unread {
            match self.mark_read(&id).await {
                Ok(()) => report.marked.push(id),
                Err(error) => {
                    warn!(%id, %error, "Could not mark notification read");
                    report.failed.push(id);
                }
            }
        }

        if report.is_complete() {
            if !report.marked.is_empty() {
                self.notices.success("All notifications marked as read");
            }
        } else {
            self.notices.error(format!(
                "{} of {} notifications could not be marked as read",
                report.failed.len(),
                report.failed.len() + report.marked.len()
            ));
        }
        report
    }

    /// Delete a notification remotely, then locally.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        self.store.delete(&self.collection, id).await?;
        lock(&self.items).retain(|n| &n.id != id);
        Ok(())
    }

    fn set_read(&self, id: &RecordId) {
        if let Some(n) = lock(&self.items).iter_mut().find(|n| &n.id == id) {
            n.read = true;
        }
    }
}
