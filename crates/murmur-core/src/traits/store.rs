//! Remote store trait.

use async_trait::async_trait;

use crate::repo::{Expand, Fields, ListOptions, ListPage, Record};
use crate::types::{Collection, RecordId, StoreUrl};
use crate::{AuthToken, Result};

/// Page size used when walking a whole collection.
const FULL_LIST_BATCH: u32 = 200;

/// An authenticated view of a remote record store.
///
/// Every call acts as [`actor`](RemoteStore::actor). All operations may fail
/// with a transport, authorization or not-found error.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the id of the user this store acts as.
    fn actor(&self) -> &RecordId;

    /// Returns the store URL.
    fn url(&self) -> &StoreUrl;

    /// Returns the current auth token.
    fn token(&self) -> AuthToken;

    /// Fetch one page (1-based) of a collection.
    async fn list(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage>;

    /// Fetch a single record.
    async fn get_one(
        &self,
        collection: &Collection,
        id: &RecordId,
        expand: &[Expand],
    ) -> Result<Record>;

    /// Create a record.
    async fn create(&self, collection: &Collection, fields: &Fields) -> Result<Record>;

    /// Merge `fields` into an existing record.
    async fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<Record>;

    /// Delete a record.
    async fn delete(&self, collection: &Collection, id: &RecordId) -> Result<()>;

    /// Fetch every record matching `options`, walking pages until exhausted.
    async fn full_list(
        &self,
        collection: &Collection,
        options: &ListOptions,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let batch = self
                .list(collection, page, FULL_LIST_BATCH, options)
                .await?;
            if batch.items.is_empty() {
                return Ok(records);
            }
            let short = batch.is_short();
            records.extend(batch.items);

            let reached_total = batch
                .total_items
                .is_some_and(|total| records.len() as u64 >= total);

            if short || reached_total {
                return Ok(records);
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `pages` in order, reporting `per_page` and no total.
    struct PagedStore {
        actor: RecordId,
        url: StoreUrl,
        per_page: u32,
        pages: Vec<usize>,
        calls: Mutex<u32>,
    }

    impl PagedStore {
        fn new(per_page: u32, pages: Vec<usize>) -> Self {
            Self {
                actor: RecordId::new("me").unwrap(),
                url: StoreUrl::new("http://localhost:8090").unwrap(),
                per_page,
                pages,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteStore for PagedStore {
        fn actor(&self) -> &RecordId {
            &self.actor
        }

        fn url(&self) -> &StoreUrl {
            &self.url
        }

        fn token(&self) -> AuthToken {
            AuthToken::new("t")
        }

        async fn list(
            &self,
            collection: &Collection,
            page: u32,
            _per_page: u32,
            _options: &ListOptions,
        ) -> Result<ListPage> {
            *self.calls.lock().unwrap() += 1;
            let len = self.pages.get(page as usize - 1).copied().unwrap_or(0);
            let items = (0..len)
                .map(|i| Record::from_json(collection, json!({"id": format!("p{}r{}", page, i)})).unwrap())
                .collect();
            Ok(ListPage {
                items,
                page,
                per_page: self.per_page,
                total_items: None,
            })
        }

        async fn get_one(&self, _: &Collection, id: &RecordId, _: &[Expand]) -> Result<Record> {
            Err(crate::Error::not_found(id.to_string()))
        }

        async fn create(&self, _: &Collection, _: &Fields) -> Result<Record> {
            unimplemented!()
        }

        async fn update(&self, _: &Collection, _: &RecordId, _: &Fields) -> Result<Record> {
            unimplemented!()
        }

        async fn delete(&self, _: &Collection, _: &RecordId) -> Result<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn full_list_walks_until_a_short_page() {
        let store = PagedStore::new(2, vec![2, 2, 1]);
        let collection = Collection::new("posts").unwrap();

        let records = store.full_list(&collection, &ListOptions::new()).await.unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(*store.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn full_list_stops_on_an_empty_page_without_page_size() {
        let store = PagedStore::new(0, vec![1]);
        let collection = Collection::new("posts").unwrap();

        let records = store.full_list(&collection, &ListOptions::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(*store.calls.lock().unwrap(), 2);
    }
}
