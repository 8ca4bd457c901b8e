//! Core murmur types.
//!
//! These types enforce their invariants at construction time,
//! ensuring invalid identifiers never reach a backend.

mod collection;
mod record_id;
mod store_url;

pub use collection::Collection;
pub use record_id::RecordId;
pub use store_url::StoreUrl;
