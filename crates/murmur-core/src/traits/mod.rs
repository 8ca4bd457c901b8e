//! Core traits for backend and store behavior.

mod backend;
mod store;

pub use backend::{Backend, CreateAccountOutput};
pub use store::RemoteStore;
