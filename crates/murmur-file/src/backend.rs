//! File-backed store deployment.

use std::path::Path;

use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use serde_json::json;

use murmur_core::error::{AuthError, Error, InvalidInputError};
use murmur_core::traits::{Backend, CreateAccountOutput};
use murmur_core::{AuthToken, Credentials, RecordId, Result, StoreUrl};

use crate::session::FileSession;
use crate::store::{FileStore, LocalAccount};

fn map_bcrypt(err: bcrypt::BcryptError) -> Error {
    Error::InvalidInput(InvalidInputError::Other {
        message: err.to_string(),
    })
}

/// A record store kept in a local directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    store: FileStore,
    url: StoreUrl,
}

impl FileBackend {
    /// Open (or lazily create) a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>, url: StoreUrl) -> Self {
        Self {
            store: FileStore::new(root),
            url,
        }
    }

    /// Open the store a `file://` URL points at.
    pub fn from_url(url: StoreUrl) -> Result<Self> {
        let root = url.to_file_path().ok_or_else(|| InvalidInputError::StoreUrl {
            value: url.to_string(),
            reason: "not a file:// URL".to_string(),
        })?;
        Ok(Self::new(root, url))
    }

    pub fn url(&self) -> &StoreUrl {
        &self.url
    }

    pub(crate) fn store(&self) -> &FileStore {
        &self.store
    }

    fn make_token(id: &str, password_hash: &str) -> AuthToken {
        let token = json!({
            "id": id,
            "password_hash": password_hash,
        })
        .to_string();
        AuthToken::new(token)
    }

    pub(crate) fn parse_token(token: &AuthToken) -> Result<(RecordId, String)> {
        let value: serde_json::Value = serde_json::from_str(token.as_str()).map_err(|e| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("Invalid token JSON: {}", e),
            })
        })?;

        let id = value.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
            Error::InvalidInput(InvalidInputError::Other {
                message: "Token missing 'id'".to_string(),
            })
        })?;

        let password_hash = value
            .get("password_hash")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::InvalidInput(InvalidInputError::Other {
                    message: "Token missing 'password_hash'".to_string(),
                })
            })?;

        Ok((RecordId::new(id)?, password_hash.to_string()))
    }

    /// Check a token against the account it names.
    ///
    /// Changing an account's password invalidates its tokens.
    pub(crate) fn validate_token(&self, token: &AuthToken) -> Result<LocalAccount> {
        let (id, password_hash) = Self::parse_token(token)?;
        let account = self
            .store
            .get_account(id.as_str())?
            .ok_or(AuthError::SessionExpired)?;

        if account.password_hash != password_hash {
            return Err(AuthError::SessionExpired.into());
        }

        Ok(account)
    }
}

#[async_trait]
impl Backend for FileBackend {
    type Session = FileSession;

    fn url(&self) -> &StoreUrl {
        self.url()
    }

    async fn login(&self, credentials: Credentials) -> Result<Self::Session> {
        let identity = credentials.identity();

        let account = match self.store.find_account_by_username(identity)? {
            Some(account) => Some(account),
            None if RecordId::new(identity).is_ok() => self.store.get_account(identity)?,
            None => None,
        }
        .ok_or_else(|| AuthError::InvalidCredentials("Account not found".to_string()))?;

        if !verify(credentials.password(), &account.password_hash).map_err(map_bcrypt)? {
            return Err(AuthError::InvalidCredentials("Invalid password".to_string()).into());
        }

        let id = RecordId::new(&account.id)?;
        let token = Self::make_token(&account.id, &account.password_hash);

        Ok(FileSession::new(self.clone(), id, token))
    }

    async fn create_account(
        &self,
        username: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<CreateAccountOutput> {
        if username.trim().is_empty() {
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

        let password_hash = hash(password, DEFAULT_COST).map_err(map_bcrypt)?;
        let account = self.store.create_account(username, name, &password_hash)?;

        Ok(CreateAccountOutput {
            id: RecordId::new(account.id)?,
            username: account.username,
        })
    }
}
