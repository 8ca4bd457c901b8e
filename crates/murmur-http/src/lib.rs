//! murmur-http - Record store client over HTTP.
//!
//! Talks to a PocketBase-style REST API: collections under
//! `/api/collections/{name}/records`, password auth against the `users`
//! collection, bearer tokens.

mod backend;
mod client;
mod endpoints;
mod query;
mod session;

pub use backend::HttpBackend;
pub use session::HttpSession;
