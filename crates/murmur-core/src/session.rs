//! Current-session holder with change notifications.
//!
//! There is no ambient global session. Whoever owns the [`SessionHub`]
//! hands stores to components explicitly, and components that care about
//! sign-in and sign-out subscribe to changes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::AuthError;
use crate::{RemoteStore, Result};

/// Holds the signed-in session, if any, and publishes every change.
pub struct SessionHub<S> {
    tx: watch::Sender<Option<Arc<S>>>,
}

impl<S: RemoteStore> SessionHub<S> {
    /// A hub with nobody signed in.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The current session, if signed in.
    pub fn current(&self) -> Option<Arc<S>> {
        self.tx.borrow().clone()
    }

    /// The current session, or [`AuthError::NotSignedIn`].
    pub fn require(&self) -> Result<Arc<S>> {
        self.current().ok_or_else(|| AuthError::NotSignedIn.into())
    }

    /// Replace the current session and notify subscribers.
    pub fn sign_in(&self, session: S) -> Arc<S> {
        let session = Arc::new(session);
        self.tx.send_replace(Some(session.clone()));
        session
    }

    /// Clear the current session and notify subscribers.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<S>>> {
        self.tx.subscribe()
    }
}

impl<S: RemoteStore> Default for SessionHub<S> {
    fn default() -> Self {
        Self::new()
    }
}
