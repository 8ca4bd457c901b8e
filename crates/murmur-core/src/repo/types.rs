//! List operation types.

use super::Record;

/// One page of a list query.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// The records in this page, in the order the store returned them.
    pub items: Vec<Record>,

    /// The 1-based page number this page answers.
    pub page: u32,

    /// The page size the store applied, which may be below the request.
    pub per_page: u32,

    /// Total number of matching records, if the store reported one.
    ///
    /// This is a hint: it may be stale by the time the next page is fetched.
    pub total_items: Option<u64>,
}

impl ListPage {
    /// Returns true if this page holds fewer items than the store's page size.
    pub fn is_short(&self) -> bool {
        (self.items.len() as u64) < u64::from(self.per_page)
    }
}
