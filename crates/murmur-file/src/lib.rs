//! murmur-file - Filesystem-backed record store.
//!
//! Records live as JSON files under a root directory, one directory per
//! collection. Filters, sorts, expansions and pagination are evaluated in
//! process. Meant for development, demos and tests.

mod backend;
mod session;
mod store;

pub use backend::FileBackend;
pub use session::FileSession;
pub use store::LocalAccount;
