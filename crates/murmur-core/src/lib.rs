//! murmur-core - Core types and traits for the murmur sync layer.

pub mod credentials;
pub mod error;
pub mod repo;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use repo::{
    Condition, Expand, Fields, Filter, ListOptions, ListPage, Op, Record, Sort, SortDirection,
};
pub use session::SessionHub;
pub use tokens::AuthToken;
pub use traits::{Backend, CreateAccountOutput, RemoteStore};
pub use types::{Collection, RecordId, StoreUrl};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
