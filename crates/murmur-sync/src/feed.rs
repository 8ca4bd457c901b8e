//! Paginated feed synchronizer.
//!
//! Holds an ordered, deduplicated list of items fetched page by page. Only
//! one page fetch runs at a time; a trigger arriving while one is in flight
//! is dropped. Reloading the first page starts a new epoch, and a page that
//! resolves after that is discarded.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use murmur_core::error::InvalidInputError;
use murmur_core::{
    Collection, Fields, Filter, ListOptions, ListPage, Record, RecordId, RemoteStore, Result, Sort,
};

use crate::config::SyncConfig;
use crate::lock;
use crate::notice::Notices;
use crate::projection::Projection;

/// Payload key of an item's text.
const CONTENT_FIELD: &str = "content";

/// Record field naming the user who owns an item.
const OWNER_FIELD: &str = "user_id";

/// One entry of a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: RecordId,
    /// Ordering key.
    pub created: DateTime<Utc>,
    pub payload: Fields,
}

impl FeedItem {
    pub fn from_record(record: &Record, projection: &Projection, actor: &RecordId) -> Self {
        Self {
            id: record.id.clone(),
            created: record.created,
            payload: projection.apply(record, actor),
        }
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.payload.get(field).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.payload.get(field).and_then(|v| v.as_bool())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Failed(String),
}

/// A copy of the feed state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub items: Vec<FeedItem>,
    pub next_page: u32,
    pub has_more: bool,
    pub status: FeedStatus,
}

#[derive(Debug)]
struct FeedState {
    items: Vec<FeedItem>,
    seen: HashSet<RecordId>,
    filter: Filter,
    next_page: u32,
    has_more: bool,
    status: FeedStatus,
    epoch: u64,
    in_flight: bool,
    /// Items received from the store this epoch, duplicates included.
    fetched: u64,
}

impl FeedState {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            filter: Filter::new(),
            next_page: 1,
            has_more: false,
            status: FeedStatus::Idle,
            epoch: 0,
            in_flight: false,
            fetched: 0,
        }
    }

    fn reset(&mut self, filter: Filter) -> u64 {
        self.epoch += 1;
        self.items.clear();
        self.seen.clear();
        self.filter = filter;
        self.next_page = 1;
        self.has_more = false;
        self.fetched = 0;
        self.status = FeedStatus::Loading;
        self.in_flight = true;
        self.epoch
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: self.items.clone(),
            next_page: self.next_page,
            has_more: self.has_more,
            status: self.status.clone(),
        }
    }

    /// Append the new items of a page and advance the cursor.
    fn apply_page(&mut self, page: ListPage, items: Vec<FeedItem>) -> Vec<FeedItem> {
        let received = page.items.len();
        self.fetched += received as u64;

        let appended: Vec<FeedItem> = items
            .into_iter()
            .filter(|item| self.seen.insert(item.id.clone()))
            .collect();
        self.items.extend(appended.iter().cloned());

        self.next_page += 1;
        self.has_more = received > 0
            && !page.is_short()
            && page.total_items.is_none_or(|total| total > self.fetched);
        self.status = FeedStatus::Idle;
        self.in_flight = false;

        appended
    }

    fn fail(&mut self, message: String) {
        self.status = FeedStatus::Failed(message);
        self.in_flight = false;
    }
}

/// Ordered, deduplicated, incrementally loaded list of records.
pub struct FeedSynchronizer<S> {
    store: Arc<S>,
    collection: Collection,
    page_size: u32,
    sort: Sort,
    projection: Projection,
    notices: Notices,
    state: Mutex<FeedState>,
}

impl<S: RemoteStore> FeedSynchronizer<S> {
    pub fn new(
        store: Arc<S>,
        collection: Collection,
        page_size: u32,
        sort: Sort,
        projection: Projection,
        notices: Notices,
    ) -> Self {
        Self {
            store,
            collection,
            page_size: page_size.max(1),
            sort,
            projection,
            notices,
            state: Mutex::new(FeedState::new()),
        }
    }

    /// The post feed: newest first, shaped as post cards.
    pub fn posts(store: Arc<S>, config: &SyncConfig, notices: Notices) -> Self {
        Self::new(
            store,
            config.collections.posts.clone(),
            config.page_size,
            Sort::newest_first(),
            Projection::post_card(&config.collections),
            notices,
        )
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn items(&self) -> Vec<FeedItem> {
        lock(&self.state).items.clone()
    }

    pub fn item(&self, id: &RecordId) -> Option<FeedItem> {
        lock(&self.state).items.iter().find(|i| &i.id == id).cloned()
    }

    pub fn has_more(&self) -> bool {
        lock(&self.state).has_more
    }

    pub fn status(&self) -> FeedStatus {
        lock(&self.state).status.clone()
    }

    /// Clear the feed and fetch page 1 under `filter`.
    ///
    /// Starts a new epoch: any page still in flight will be discarded.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn load_first_page(&self, filter: Filter) -> Result<FeedSnapshot> {
        let epoch = lock(&self.state).reset(filter.clone());
        debug!(epoch, "Loading first page");

        let result = self.fetch(1, filter).await;

        let mut state = lock(&self.state);
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "Discarding stale first page");
            return Ok(state.snapshot());
        }

        match result {
            Ok((page, items)) => {
                state.apply_page(page, items);
                Ok(state.snapshot())
            }
            Err(error) => {
                warn!(%error, "First page failed");
                state.fail(error.to_string());
                Err(error)
            }
        }
    }

    /// Fetch the next page and append the items not already present.
    ///
    /// Returns the appended items. Does nothing, and makes no remote call,
    /// when there is nothing more to load or a fetch is already in flight.
    /// A failure leaves the loaded items and `has_more` as they were, so
    /// calling again retries the same page.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn load_next_page(&self) -> Result<Vec<FeedItem>> {
        let (epoch, page, filter) = {
            let mut state = lock(&self.state);
            if !state.has_more || state.in_flight {
                debug!(
                    has_more = state.has_more,
                    in_flight = state.in_flight,
                    "Skipping next page"
                );
                return Ok(Vec::new());
            }
            state.in_flight = true;
            state.status = FeedStatus::Loading;
            (state.epoch, state.next_page, state.filter.clone())
        };
        debug!(epoch, page, "Loading next page");

        let result = self.fetch(page, filter).await;

        let mut state = lock(&self.state);
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "Discarding stale page");
            return Ok(Vec::new());
        }

        match result {
            Ok((page, items)) => Ok(state.apply_page(page, items)),
            Err(error) => {
                warn!(%error, page, "Next page failed");
                state.fail(error.to_string());
                Err(error)
            }
        }
    }

    async fn fetch(&self, page: u32, filter: Filter) -> Result<(ListPage, Vec<FeedItem>)> {
        let options = ListOptions {
            filter,
            sort: Some(self.sort.clone()),
            expand: self.projection.expansions().to_vec(),
        };
        let list = self
            .store
            .list(&self.collection, page, self.page_size, &options)
            .await?;

        let actor = self.store.actor();
        let items = list
            .items
            .iter()
            .map(|record| FeedItem::from_record(record, &self.projection, actor))
            .collect();
        Ok((list, items))
    }

    /// Drop an item locally. Returns whether it was present.
    pub fn remove_item(&self, id: &RecordId) -> bool {
        let mut state = lock(&self.state);
        let before = state.items.len();
        state.items.retain(|item| &item.id != id);
        state.seen.remove(id);
        state.items.len() != before
    }

    /// Merge `partial` into an item's payload. Returns whether it was present.
    pub fn patch_item(&self, id: &RecordId, partial: &Fields) -> bool {
        let mut state = lock(&self.state);
        match state.items.iter_mut().find(|item| &item.id == id) {
            Some(item) => {
                for (key, value) in partial {
                    item.payload.insert(key.clone(), value.clone());
                }
                true
            }
            None => false,
        }
    }

    /// Insert an item at the top, e.g. a post just created. Ignored if present.
    pub fn prepend_item(&self, item: FeedItem) -> bool {
        let mut state = lock(&self.state);
        if !state.seen.insert(item.id.clone()) {
            return false;
        }
        state.items.insert(0, item);
        true
    }

    /// Insert an item at the bottom, e.g. a comment just added. Ignored if present.
    pub fn append_item(&self, item: FeedItem) -> bool {
        let mut state = lock(&self.state);
        if !state.seen.insert(item.id.clone()) {
            return false;
        }
        state.items.push(item);
        true
    }

    /// Create a record as the actor and put it at the top of the feed.
    ///
    /// The text in `content` is trimmed and must not be blank; nothing is
    /// sent otherwise. `user_id` defaults to the actor. The record is read
    /// back with the projection's expansions so the new item has the same
    /// shape as a fetched one.
    #[instrument(skip(self, fields), fields(collection = %self.collection))]
    pub async fn create_item(&self, mut fields: Fields) -> Result<FeedItem> {
        let content = fields
            .get(CONTENT_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if content.is_empty() {
            return Err(InvalidInputError::Field {
                value: CONTENT_FIELD.to_string(),
                reason: "text cannot be empty".to_string(),
            }
            .into());
        }
        fields.insert(CONTENT_FIELD.into(), Value::from(content));
        fields
            .entry(OWNER_FIELD)
            .or_insert_with(|| Value::from(self.store.actor().as_str()));

        let item = match self.create_and_fetch(&fields).await {
            Ok(item) => item,
            Err(error) => {
                warn!(%error, "Create failed");
                self.notices.error(format!("Could not publish: {}", error));
                return Err(error);
            }
        };
        self.prepend_item(item.clone());
        debug!(id = %item.id, "Created item");
        Ok(item)
    }

    async fn create_and_fetch(&self, fields: &Fields) -> Result<FeedItem> {
        let created = self.store.create(&self.collection, fields).await?;
        let record = self
            .store
            .get_one(&self.collection, &created.id, self.projection.expansions())
            .await?;
        Ok(FeedItem::from_record(&record, &self.projection, self.store.actor()))
    }

    /// Id of the user owning a record of this feed's collection.
    ///
    /// Returns `None` when the record names no owner.
    pub async fn owner_of(&self, id: &RecordId) -> Result<Option<RecordId>> {
        let record = self.store.get_one(&self.collection, id, &[]).await?;
        Ok(record.get_id(OWNER_FIELD))
    }

    /// Delete a record remotely, then drop it from the feed.
    ///
    /// On failure the feed is left as it was and an error notice is published.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn delete_item(&self, id: &RecordId) -> Result<()> {
        match self.store.delete(&self.collection, id).await {
            Ok(()) => {
                self.remove_item(id);
                debug!("Deleted item");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "Delete failed");
                self.notices.error(format!("Could not delete: {}", error));
                Err(error)
            }
        }
    }
}
