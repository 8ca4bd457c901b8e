//! Backend trait.

use async_trait::async_trait;

use crate::types::{RecordId, StoreUrl};
use crate::{Credentials, Result};

use super::RemoteStore;

/// Output from account creation.
#[derive(Debug, Clone)]
pub struct CreateAccountOutput {
    /// The id of the created user record.
    pub id: RecordId,
    /// The username of the created account.
    pub username: String,
}

/// A record store deployment that sessions can be opened against.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Authenticated session type for this backend.
    type Session: RemoteStore;

    /// Returns the store URL for this instance.
    fn url(&self) -> &StoreUrl;

    /// Authenticate and open a new session.
    async fn login(&self, credentials: Credentials) -> Result<Self::Session>;

    /// Create a new user account.
    async fn create_account(
        &self,
        username: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<CreateAccountOutput>;
}
