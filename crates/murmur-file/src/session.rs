//! File-backed session implementation.

use async_trait::async_trait;
use tracing::{debug, instrument};

use murmur_core::{
    AuthToken, Collection, Expand, Fields, ListOptions, ListPage, Record, RecordId, RemoteStore,
    Result, StoreUrl,
};

use crate::backend::FileBackend;

/// Session for a file-backed store.
#[derive(Debug, Clone)]
pub struct FileSession {
    backend: FileBackend,
    actor: RecordId,
    token: AuthToken,
}

impl FileSession {
    pub(crate) fn new(backend: FileBackend, actor: RecordId, token: AuthToken) -> Self {
        Self {
            backend,
            actor,
            token,
        }
    }

    /// Restore a session from a saved token.
    pub fn from_persisted(backend: FileBackend, token: AuthToken) -> Result<Self> {
        backend.validate_token(&token)?;
        let (actor, _) = FileBackend::parse_token(&token)?;
        Ok(Self::new(backend, actor, token))
    }

    fn authorize(&self) -> Result<()> {
        self.backend.validate_token(&self.token).map(|_| ())
    }
}

#[async_trait]
impl RemoteStore for FileSession {
    fn actor(&self) -> &RecordId {
        &self.actor
    }

    fn url(&self) -> &StoreUrl {
        self.backend.url()
    }

    fn token(&self) -> AuthToken {
        self.token.clone()
    }

    #[instrument(skip(self, options), fields(actor = %self.actor, %collection))]
    async fn list(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage> {
        debug!("Listing records");
        self.authorize()?;
        self.backend
            .store()
            .list_records(collection, page, per_page, options)
    }

    #[instrument(skip(self, expand), fields(actor = %self.actor, %collection, %id))]
    async fn get_one(
        &self,
        collection: &Collection,
        id: &RecordId,
        expand: &[Expand],
    ) -> Result<Record> {
        debug!("Getting record");
        self.authorize()?;
        self.backend.store().get_record(collection, id, expand)
    }

    #[instrument(skip(self, fields), fields(actor = %self.actor, %collection))]
    async fn create(&self, collection: &Collection, fields: &Fields) -> Result<Record> {
        debug!("Creating record");
        self.authorize()?;
        self.backend.store().create_record(collection, fields)
    }

    #[instrument(skip(self, fields), fields(actor = %self.actor, %collection, %id))]
    async fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<Record> {
        debug!("Updating record");
        self.authorize()?;
        self.backend.store().update_record(collection, id, fields)
    }

    #[instrument(skip(self), fields(actor = %self.actor, %collection, %id))]
    async fn delete(&self, collection: &Collection, id: &RecordId) -> Result<()> {
        debug!("Deleting record");
        self.authorize()?;
        self.backend.store().delete_record(collection, id)
    }
}
