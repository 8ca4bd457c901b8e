//! murmur-sync - Optimistic mutations and paginated feeds over a remote store.
//!
//! The pieces build on each other:
//!
//! - [`OptimisticEngine`] applies a local change at once, runs the remote
//!   call, and commits or rolls back, ignoring superseded resolutions.
//! - [`FeedSynchronizer`] keeps an ordered, deduplicated list of records
//!   fetched page by page, with one fetch in flight at a time.
//! - [`RelationToggle`] drives binary relations (likes, follows) backed by a
//!   join collection through the engine.
//!
//! [`CommentThread`], [`Inbox`] and [`ProfileView`] compose those for the
//! social schema described by [`SyncConfig`].

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod comments;
pub mod config;
pub mod feed;
pub mod inbox;
pub mod notice;
pub mod optimistic;
pub mod profile;
pub mod projection;
pub mod relation;

#[cfg(test)]
pub(crate) mod testing;

pub use comments::CommentThread;
pub use config::{Collections, SyncConfig};
pub use feed::{FeedItem, FeedSnapshot, FeedStatus, FeedSynchronizer};
pub use inbox::{Inbox, MarkAllReport, NewNotification, Notification, NotificationKind};
pub use notice::{Notice, NoticeLevel, Notices};
pub use optimistic::{MutationOutcome, OptimisticEngine, PendingMutation, Resolution};
pub use profile::{Profile, ProfileView, ensure_profile, fetch_profile, update_profile};
pub use projection::{Derived, FieldPath, Projection};
pub use relation::{RelationKey, RelationPhase, RelationSpec, RelationToggle, RelationView, ToggleOutcome};

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
///
/// Guards are never held across an `.await`.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use murmur_core::{RemoteStore, SessionHub};

    use crate::testing::MockStore;

    #[tokio::test]
    async fn session_hub_publishes_sign_in_and_out() {
        let hub = SessionHub::<MockStore>::new();
        let mut rx = hub.subscribe();
        assert!(hub.require().is_err());

        let session = hub.sign_in(MockStore::new("me"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().actor(), session.actor());
        assert_eq!(hub.require().unwrap().actor().as_str(), "me");

        hub.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(hub.current().is_none());
    }
}
