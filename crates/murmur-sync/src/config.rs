//! Sync layer configuration.

use serde::{Deserialize, Serialize};

use murmur_core::Collection;

/// Page size of the post feed.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// How many notifications the inbox loads.
pub const DEFAULT_INBOX_PAGE_SIZE: u32 = 50;

/// Tunables and collection names used by the sync layer.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Items per feed page.
    pub page_size: u32,
    /// Notifications loaded by the inbox.
    pub inbox_page_size: u32,
    /// Collection names on the remote store.
    pub collections: Collections,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            inbox_page_size: DEFAULT_INBOX_PAGE_SIZE,
            collections: Collections::default(),
        }
    }
}

/// Names of the collections the social schema is made of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub posts: Collection,
    pub likes: Collection,
    pub follows: Collection,
    pub comments: Collection,
    pub notifications: Collection,
    pub profiles: Collection,
}

impl Default for Collections {
    fn default() -> Self {
        let name = |s: &str| Collection::new(s).expect("built-in collection name is valid");
        Self {
            posts: name("posts"),
            likes: name("likes"),
            follows: name("follows"),
            comments: name("comments"),
            notifications: name("notifications"),
            profiles: name("profiles"),
        }
    }
}
