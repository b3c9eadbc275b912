//! Queryable source contract consumed by pagination and the dynamic builders

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::predicate::{OrderBy, Predicate};
use crate::core::record::Record;

/// A lazily narrowed collection of records.
///
/// Implement this trait for stores that can be filtered by a predicate tree,
/// ordered by a member, counted, and read one window at a time. Translating
/// the tree (into SQL, a document query, or an in-process check) is the
/// implementation's job.
///
/// Failures are reported as `anyhow::Error` and are passed through to callers
/// unchanged; retrying is up to the implementation.
#[async_trait]
pub trait QueryableSource<T: Record>: Send + Sync {
    /// Narrow the source to records satisfying `predicate`.
    ///
    /// Calling this more than once narrows further (conjunction).
    fn filter(self, predicate: &Predicate<T>) -> Self
    where
        Self: Sized;

    /// Order the source by `order`, replacing any previous ordering
    fn order_by(self, order: &OrderBy<T>) -> Self
    where
        Self: Sized;

    /// Number of records in the narrowed source.
    ///
    /// A source that observes `cancel` should fail with
    /// `FilterError::Cancelled` wrapped in the `anyhow::Error`, so pagination
    /// reports it as a cancellation.
    async fn count(&self, cancel: Option<&CancellationToken>) -> Result<usize>;

    /// Materialize `take` records after skipping `skip`, in source order
    async fn fetch(
        &self,
        skip: usize,
        take: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<T>>;
}
