//! REST client for the record store API.

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use murmur_core::error::{Error, RemoteError, TransportError};
use murmur_core::{AuthToken, Result, StoreUrl};

use crate::endpoints::ErrorResponse;

pub(crate) fn map_reqwest(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout { duration_ms: 0 }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}

/// HTTP client bound to one store.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    store: StoreUrl,
}

impl HttpClient {
    pub fn new(store: StoreUrl) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("murmur/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest)?;

        Ok(Self { client, store })
    }

    pub fn store(&self) -> &StoreUrl {
        &self.store
    }

    fn request(&self, method: Method, path: &str, token: Option<&AuthToken>) -> RequestBuilder {
        let url = self.store.api_url(path);
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token.as_str())),
            None => builder,
        }
    }

    /// GET with query parameters.
    #[instrument(skip(self, query, token), fields(store = %self.store))]
    pub async fn get<Q, R>(&self, path: &str, query: &Q, token: Option<&AuthToken>) -> Result<R>
    where
        Q: Serialize + std::fmt::Debug,
        R: DeserializeOwned,
    {
        debug!(path, "GET");
        trace!(?query, "query parameters");

        let response = self
            .request(Method::GET, path, token)
            .query(query)
            .send()
            .await
            .map_err(map_reqwest)?;

        handle_response(response).await
    }

    /// POST a JSON body.
    #[instrument(skip(self, body, token), fields(store = %self.store))]
    pub async fn post<B, R>(&self, path: &str, body: &B, token: Option<&AuthToken>) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        debug!(path, "POST");

        let response = self
            .request(Method::POST, path, token)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest)?;

        handle_response(response).await
    }

    /// POST with no body, as token refresh expects.
    #[instrument(skip(self, token), fields(store = %self.store))]
    pub async fn post_empty<R>(&self, path: &str, token: &AuthToken) -> Result<R>
    where
        R: DeserializeOwned,
    {
        debug!(path, "POST (no body)");

        let response = self
            .request(Method::POST, path, Some(token))
            .send()
            .await
            .map_err(map_reqwest)?;

        handle_response(response).await
    }

    /// PATCH a JSON body.
    #[instrument(skip(self, body, token), fields(store = %self.store))]
    pub async fn patch<B, R>(&self, path: &str, body: &B, token: &AuthToken) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        debug!(path, "PATCH");

        let response = self
            .request(Method::PATCH, path, Some(token))
            .json(body)
            .send()
            .await
            .map_err(map_reqwest)?;

        handle_response(response).await
    }

    /// DELETE, expecting an empty success response.
    #[instrument(skip(self, token), fields(store = %self.store))]
    pub async fn delete(&self, path: &str, token: &AuthToken) -> Result<()> {
        debug!(path, "DELETE");

        let response = self
            .request(Method::DELETE, path, Some(token))
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        trace!(%status, "response");
        if status.is_success() {
            Ok(())
        } else {
            Err(parse_error_response(response).await.into())
        }
    }
}

async fn handle_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let status = response.status();
    trace!(%status, "response");

    if status.is_success() {
        response.json::<R>().await.map_err(map_reqwest)
    } else {
        Err(parse_error_response(response).await.into())
    }
}

/// Turn a failed response into a [`RemoteError`].
///
/// The store answers errors with `{"code", "message", "data"}`; a body that
/// does not parse still yields the status.
async fn parse_error_response(response: reqwest::Response) -> RemoteError {
    let status = response.status();

    match response.json::<ErrorResponse>().await {
        Ok(body) => {
            let code = body
                .code
                .filter(|code| *code != i64::from(status.as_u16()))
                .map(|code| code.to_string())
                .or_else(|| first_data_code(&body.data));
            RemoteError::new(status.as_u16(), code, non_empty(body.message))
        }
        Err(_) => RemoteError::new(status.as_u16(), None, default_reason(status)),
    }
}

/// The first field-level validation code, e.g. `validation_not_unique`.
fn first_data_code(data: &serde_json::Value) -> Option<String> {
    data.as_object()?
        .values()
        .find_map(|field| field.get("code")?.as_str().map(str::to_string))
}

fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.is_empty())
}

fn default_reason(status: StatusCode) -> Option<String> {
    status.canonical_reason().map(str::to_string)
}
