//! Common managed object traversal structures for Intersight.
//!
//! This module doesn't contain anything special beyond a pseudo-iterator
//! to walk over the pages of an Intersight collection in a more idiomatic
//! manner, using `$top` and `$skip` to move through the result set.
use serde::de::DeserializeOwned;

use std::collections::VecDeque;

use crate::client::{IntersightClient, Query};
use crate::types::UtilResult;

/// Number of objects requested per page.
pub const PAGE_SIZE: usize = 100;

/// Pseudo `Iterator` structure to walk over managed objects in Intersight.
///
/// As this is a fallible iteration, a `for` style loop cannot be used
/// easily. Instead, this pattern must be used:
///
/// ```rust,ignore
/// let mut walker = MoWalker::new(...);
///
/// while let Some(object) = walker.next().await? {
///     // do something...
/// }
/// ```
pub struct MoWalker<'a, T> {
    client: &'a IntersightClient,
    path: &'static str,
    query: Query,
    skip: usize,
    buffer: VecDeque<T>,
    finished: bool,
}

impl<'a, T> MoWalker<'a, T>
where
    T: DeserializeOwned,
{
    /// Construct a new `MoWalker` for a collection path and query.
    pub fn new(client: &'a IntersightClient, path: &'static str, query: Query) -> Self {
        Self {
            client,
            path,
            query,
            skip: 0,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    /// Attempts to fetch the next object in the collection.
    ///
    /// Calls can fail, which is why a `Result` is returned. Even if a call
    /// succeeds there is no guarantee an object exists, which is why an
    /// `Option` is returned.
    ///
    /// Calling this method does not guarantee a call will be made to the
    /// API; there may already be buffered data to be returned immediately.
    pub async fn next(&mut self) -> UtilResult<Option<T>> {
        loop {
            // always check the buffer first
            if let Some(object) = self.buffer.pop_front() {
                return Ok(Some(object));
            }

            // if done, no fetch
            if self.finished {
                return Ok(None);
            }

            // fetch the next page from the current offset
            let page: Vec<T> = self
                .client
                .page(self.path, &self.query, self.skip, PAGE_SIZE)
                .await?;

            // a short page is the last page
            if page.len() < PAGE_SIZE {
                self.finished = true;
            }

            self.skip += page.len();
            self.buffer.extend(page);
        }
    }
}
