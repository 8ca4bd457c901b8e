//! CLI session wrapper.

use async_trait::async_trait;

use murmur_core::{
    AuthToken, Collection, Expand, Fields, ListOptions, ListPage, Record, RecordId, RemoteStore,
    Result, StoreUrl,
};
use murmur_file::FileSession;
use murmur_http::HttpSession;

/// Either kind of session, chosen by the store URL scheme.
#[derive(Debug)]
pub enum CliSession {
    File(FileSession),
    Http(HttpSession),
}

#[async_trait]
impl RemoteStore for CliSession {
    fn actor(&self) -> &RecordId {
        match self {
            CliSession::File(session) => session.actor(),
            CliSession::Http(session) => session.actor(),
        }
    }

    fn url(&self) -> &StoreUrl {
        match self {
            CliSession::File(session) => session.url(),
            CliSession::Http(session) => session.url(),
        }
    }

    fn token(&self) -> AuthToken {
        match self {
            CliSession::File(session) => session.token(),
            CliSession::Http(session) => session.token(),
        }
    }

    async fn list(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage> {
        match self {
            CliSession::File(session) => session.list(collection, page, per_page, options).await,
            CliSession::Http(session) => session.list(collection, page, per_page, options).await,
        }
    }

    async fn get_one(
        &self,
        collection: &Collection,
        id: &RecordId,
        expand: &[Expand],
    ) -> Result<Record> {
        match self {
            CliSession::File(session) => session.get_one(collection, id, expand).await,
            CliSession::Http(session) => session.get_one(collection, id, expand).await,
        }
    }

    async fn create(&self, collection: &Collection, fields: &Fields) -> Result<Record> {
        match self {
            CliSession::File(session) => session.create(collection, fields).await,
            CliSession::Http(session) => session.create(collection, fields).await,
        }
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<Record> {
        match self {
            CliSession::File(session) => session.update(collection, id, fields).await,
            CliSession::Http(session) => session.update(collection, id, fields).await,
        }
    }

    async fn delete(&self, collection: &Collection, id: &RecordId) -> Result<()> {
        match self {
            CliSession::File(session) => session.delete(collection, id).await,
            CliSession::Http(session) => session.delete(collection, id).await,
        }
    }
}
