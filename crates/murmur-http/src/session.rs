//! HTTP-backed session implementation.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use murmur_core::error::{AuthError, Error};
use murmur_core::{
    AuthToken, Collection, Expand, Fields, ListOptions, ListPage, Record, RecordId, RemoteStore,
    Result, StoreUrl,
};

use crate::backend::HttpBackend;

/// Session for an HTTP store.
///
/// Clones share the token, so a refresh made through one clone is seen by
/// all of them.
#[derive(Clone)]
pub struct HttpSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    actor: RecordId,
    backend: HttpBackend,
    token: RwLock<AuthToken>,
}

fn is_unauthorized(err: &Error) -> bool {
    matches!(err, Error::Remote(remote) if remote.status == 401)
}

impl HttpSession {
    pub(crate) fn new(backend: HttpBackend, actor: RecordId, token: AuthToken) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                actor,
                backend,
                token: RwLock::new(token),
            }),
        }
    }

    /// Restore a session from a saved token.
    ///
    /// The token is not checked until the first call.
    pub fn from_persisted(url: StoreUrl, actor: RecordId, token: AuthToken) -> Result<Self> {
        Ok(Self::new(HttpBackend::new(url)?, actor, token))
    }

    /// Exchange the current token for a fresh one.
    #[instrument(skip(self), fields(actor = %self.inner.actor))]
    pub async fn refresh(&self) -> Result<()> {
        info!("Refreshing session");

        let current = self.token();
        let response = self
            .inner
            .backend
            .refresh_token(&current)
            .await
            .map_err(|e| {
                if e.is_auth_error() {
                    Error::Auth(AuthError::SessionExpired)
                } else {
                    e
                }
            })?;

        if response.record.id != self.inner.actor.as_str() {
            warn!(record = %response.record.id, "Refresh returned another account");
            return Err(AuthError::SessionExpired.into());
        }

        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = AuthToken::new(response.token);

        debug!("Session refreshed");
        Ok(())
    }

    /// Run `call` with the current token; on a 401, refresh once and retry.
    async fn authorized<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn(AuthToken) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match call(self.token()).await {
            Err(err) if is_unauthorized(&err) => {
                debug!("Token rejected, refreshing");
                self.refresh().await?;
                call(self.token()).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl RemoteStore for HttpSession {
    fn actor(&self) -> &RecordId {
        &self.inner.actor
    }

    fn url(&self) -> &StoreUrl {
        self.inner.backend.url()
    }

    fn token(&self) -> AuthToken {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[instrument(skip(self, options), fields(actor = %self.inner.actor, %collection))]
    async fn list(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage> {
        debug!(page, per_page, "Listing records");
        let backend = &self.inner.backend;
        self.authorized(|token| async move {
            backend
                .list_records(collection, page, per_page, options, &token)
                .await
        })
        .await
    }

    #[instrument(skip(self, expand), fields(actor = %self.inner.actor, %collection, %id))]
    async fn get_one(
        &self,
        collection: &Collection,
        id: &RecordId,
        expand: &[Expand],
    ) -> Result<Record> {
        debug!("Getting record");
        let backend = &self.inner.backend;
        self.authorized(|token| async move {
            backend.get_record(collection, id, expand, &token).await
        })
        .await
    }

    #[instrument(skip(self, fields), fields(actor = %self.inner.actor, %collection))]
    async fn create(&self, collection: &Collection, fields: &Fields) -> Result<Record> {
        debug!("Creating record");
        let backend = &self.inner.backend;
        self.authorized(|token| async move {
            backend.create_record(collection, fields, &token).await
        })
        .await
    }

    #[instrument(skip(self, fields), fields(actor = %self.inner.actor, %collection, %id))]
    async fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<Record> {
        debug!("Updating record");
        let backend = &self.inner.backend;
        self.authorized(|token| async move {
            backend.update_record(collection, id, fields, &token).await
        })
        .await
    }

    #[instrument(skip(self), fields(actor = %self.inner.actor, %collection, %id))]
    async fn delete(&self, collection: &Collection, id: &RecordId) -> Result<()> {
        debug!("Deleting record");
        let backend = &self.inner.backend;
        self.authorized(|token| async move {
            backend.delete_record(collection, id, &token).await
        })
        .await
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("actor", &self.inner.actor)
            .field("store", self.inner.backend.url())
            .field("token", &"[REDACTED]")
            .finish()
    }
}
