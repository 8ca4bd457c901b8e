//! Session storage for persisting login state.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use murmur_core::{AuthToken, Backend, RecordId, RemoteStore, StoreUrl};
use murmur_file::{FileBackend, FileSession};
use murmur_http::{HttpBackend, HttpSession};

use super::CliSession;
use crate::config;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Stored session data.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    actor: String,
    store: String,
    token: String,
}

fn session_path() -> Result<PathBuf> {
    let dirs = config::project_dirs()?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("session.json"))
}

/// Pick the backend a store URL selects.
pub enum AnyBackend {
    File(FileBackend),
    Http(HttpBackend),
}

impl AnyBackend {
    pub fn open(url: StoreUrl) -> Result<Self> {
        if url.is_local() {
            Ok(AnyBackend::File(
                FileBackend::from_url(url).context("Failed to open local store")?,
            ))
        } else {
            Ok(AnyBackend::Http(
                HttpBackend::new(url).context("Failed to create HTTP client")?,
            ))
        }
    }

    pub async fn login(&self, credentials: murmur_core::Credentials) -> Result<CliSession> {
        let session = match self {
            AnyBackend::File(backend) => CliSession::File(backend.login(credentials).await?),
            AnyBackend::Http(backend) => CliSession::Http(backend.login(credentials).await?),
        };
        Ok(session)
    }

    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<murmur_core::CreateAccountOutput> {
        let output = match self {
            AnyBackend::File(backend) => backend.create_account(username, password, name).await?,
            AnyBackend::Http(backend) => backend.create_account(username, password, name).await?,
        };
        Ok(output)
    }
}

/// Save a session to disk, readable by the owner only.
pub fn save_session(session: &CliSession) -> Result<()> {
    let stored = StoredSession {
        actor: session.actor().to_string(),
        store: session.url().to_string(),
        token: session.token().as_str().to_string(),
    };

    let path = session_path()?;
    let json = serde_json::to_string_pretty(&stored)?;

    fs::write(&path, &json).context("Failed to write session file")?;

    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(())
}

/// Load a session from disk.
pub async fn load_session() -> Result<Option<CliSession>> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path).context("Failed to read session file")?;
    let stored: StoredSession = serde_json::from_str(&json).context("Invalid session file")?;

    let store = StoreUrl::new(&stored.store).context("Invalid store URL in session")?;
    let actor = RecordId::new(stored.actor).context("Invalid actor id in session")?;
    let token = AuthToken::new(stored.token);

    if store.is_local() {
        let backend = FileBackend::from_url(store).context("Failed to open local store")?;
        let session = FileSession::from_persisted(backend, token)
            .context("Saved session is no longer valid. Run 'murmur login' again.")?;
        Ok(Some(CliSession::File(session)))
    } else {
        let session = HttpSession::from_persisted(store, actor, token)?;
        match session.refresh().await {
            Ok(()) => save_session(&CliSession::Http(session.clone()))?,
            Err(e) => warn!(error = %e, "Failed to refresh session, using saved token"),
        }
        Ok(Some(CliSession::Http(session)))
    }
}

/// Remove the stored session. Returns whether one existed.
pub fn clear_session() -> Result<bool> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(false);
    }

    fs::remove_file(&path).context("Failed to remove session file")?;
    Ok(true)
}
