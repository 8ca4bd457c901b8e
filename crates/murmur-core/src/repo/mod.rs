//! Record and query types.
//!
//! This module defines the values exchanged with a remote store.
//! The operations themselves are methods on [`RemoteStore`](crate::RemoteStore).

mod query;
mod record;
mod types;

pub use query::{Condition, Expand, Filter, ListOptions, Op, Sort, SortDirection};
pub use record::{Fields, Record, format_timestamp, parse_timestamp};
pub use types::ListPage;
