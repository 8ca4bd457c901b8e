//! HTTP store deployment.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

use murmur_core::error::{AuthError, Error, InvalidInputError};
use murmur_core::traits::{Backend, CreateAccountOutput};
use murmur_core::{
    AuthToken, Collection, Credentials, Expand, Fields, ListOptions, ListPage, Record, RecordId,
    Result, StoreUrl,
};

use crate::client::HttpClient;
use crate::endpoints::*;
use crate::query;
use crate::session::HttpSession;

fn invalid_record(err: serde_json::Error) -> Error {
    InvalidInputError::Other {
        message: format!("Malformed record in response: {}", err),
    }
    .into()
}

/// A record store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: HttpClient,
}

impl HttpBackend {
    pub fn new(url: StoreUrl) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(url)?,
        })
    }

    pub fn url(&self) -> &StoreUrl {
        self.client.store()
    }

    /// Exchange a still-valid token for a fresh one.
    pub(crate) async fn refresh_token(&self, token: &AuthToken) -> Result<AuthResponse> {
        self.client.post_empty(&auth_refresh(), token).await
    }

    #[instrument(skip(self, options, token), fields(%collection))]
    pub(crate) async fn list_records(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
        token: &AuthToken,
    ) -> Result<ListPage> {
        let params = query::list_params(page, per_page, options)?;
        debug!(filter = ?params.filter, "Listing records via HTTP");

        let response: ListResponse = self
            .client
            .get(&records(collection), &params, Some(token))
            .await?;

        let items = response
            .items
            .into_iter()
            .map(|item| Record::from_json(collection, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(ListPage {
            items,
            page: response.page,
            per_page: response.per_page,
            total_items: response.total_items.and_then(|t| u64::try_from(t).ok()),
        })
    }

    #[instrument(skip(self, expand, token), fields(%collection, %id))]
    pub(crate) async fn get_record(
        &self,
        collection: &Collection,
        id: &RecordId,
        expand: &[Expand],
        token: &AuthToken,
    ) -> Result<Record> {
        debug!("Getting record via HTTP");
        let value: Value = self
            .client
            .get(&record(collection, id), &query::get_params(expand), Some(token))
            .await?;
        Record::from_json(collection, value)
    }

    #[instrument(skip(self, fields, token), fields(%collection))]
    pub(crate) async fn create_record(
        &self,
        collection: &Collection,
        fields: &Fields,
        token: &AuthToken,
    ) -> Result<Record> {
        debug!("Creating record via HTTP");
        let value: Value = self
            .client
            .post(&records(collection), fields, Some(token))
            .await?;
        Record::from_json(collection, value)
    }

    #[instrument(skip(self, fields, token), fields(%collection, %id))]
    pub(crate) async fn update_record(
        &self,
        collection: &Collection,
        id: &RecordId,
        fields: &Fields,
        token: &AuthToken,
    ) -> Result<Record> {
        debug!("Updating record via HTTP");
        let value: Value = self
            .client
            .patch(&record(collection, id), fields, token)
            .await?;
        Record::from_json(collection, value)
    }

    #[instrument(skip(self, token), fields(%collection, %id))]
    pub(crate) async fn delete_record(
        &self,
        collection: &Collection,
        id: &RecordId,
        token: &AuthToken,
    ) -> Result<()> {
        debug!("Deleting record via HTTP");
        self.client.delete(&record(collection, id), token).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    type Session = HttpSession;

    fn url(&self) -> &StoreUrl {
        self.url()
    }

    #[instrument(skip(self, credentials), fields(store = %self.url(), identity = credentials.identity()))]
    async fn login(&self, credentials: Credentials) -> Result<Self::Session> {
        let request = AuthWithPasswordRequest {
            identity: credentials.identity(),
            password: credentials.password(),
        };

        let response: AuthResponse = self
            .client
            .post(&auth_with_password(), &request, None)
            .await
            .map_err(|e| match e {
                Error::Remote(remote) if remote.status == 400 || remote.status == 401 => {
                    AuthError::InvalidCredentials(
                        remote
                            .message
                            .unwrap_or_else(|| "Failed to authenticate".to_string()),
                    )
                    .into()
                }
                other => other,
            })?;

        let actor = RecordId::new(&response.record.id)?;
        info!(%actor, "Signed in");

        Ok(HttpSession::new(
            self.clone(),
            actor,
            AuthToken::new(response.token),
        ))
    }

    #[instrument(skip(self, password, name), fields(store = %self.url()))]
    async fn create_account(
        &self,
        username: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<CreateAccountOutput> {
        let username = username.trim();
        if username.is_empty() {
            return Err(InvalidInputError::Field {
                value: "username".to_string(),
                reason: "username cannot be empty".to_string(),
            }
            .into());
        }
        if password.is_empty() {
            return Err(InvalidInputError::Field {
                value: "password".to_string(),
                reason: "password cannot be empty".to_string(),
            }
            .into());
        }

        let is_email = username.contains('@');
        let request = CreateUserRequest {
            username: (!is_email).then_some(username),
            email: is_email.then_some(username),
            password,
            password_confirm: password,
            name,
        };

        let response: AuthRecord = self.client.post(&create_user(), &request, None).await?;
        debug!(id = %response.id, "Account created");

        Ok(CreateAccountOutput {
            id: RecordId::new(&response.id)?,
            username: response
                .username
                .or(response.email)
                .unwrap_or_else(|| username.to_string()),
        })
    }
}
