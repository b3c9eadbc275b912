//! In-memory queryable store for testing and development

use crate::core::capability::{ensure_soft_deletable, mark_as_deleted};
use crate::core::error::FilterError;
use crate::core::predicate::{OrderBy, Predicate};
use crate::core::record::Record;
use crate::core::specification::Specification;
use crate::core::store::QueryableSource;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// In-memory record store
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// clones share the same records.
#[derive(Clone)]
pub struct InMemoryStore<T> {
    records: Arc<RwLock<Vec<T>>>,
}

impl<T: Record + Clone> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn insert(&self, record: T) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.push(record);
        Ok(())
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.extend(items);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Start a query over every record in insertion order
    pub fn query(&self) -> InMemorySource<T> {
        InMemorySource {
            records: Arc::clone(&self.records),
            filter: None,
            order: None,
        }
    }

    /// Soft delete every record satisfying `specification`.
    ///
    /// Returns the number of records marked.
    pub fn soft_delete_where(&self, specification: &Specification<T>) -> crate::Result<usize> {
        ensure_soft_deletable::<T>()?;

        let mut records = self
            .records
            .write()
            .map_err(|e| FilterError::Source(anyhow!("Failed to acquire write lock: {}", e)))?;

        let mut marked = 0;
        for record in records.iter_mut() {
            if specification.try_is_satisfied_by(record)? {
                mark_as_deleted(record)?;
                marked += 1;
            }
        }

        tracing::debug!(record = T::type_name(), marked, "records soft deleted");
        Ok(marked)
    }
}

impl<T: Record + Clone> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A filtered, ordered view over an [`InMemoryStore`]
///
/// Nothing is evaluated until [`QueryableSource::count`] or
/// [`QueryableSource::fetch`] is called; each call works on the records
/// present at that moment.
pub struct InMemorySource<T: Record> {
    records: Arc<RwLock<Vec<T>>>,
    filter: Option<Specification<T>>,
    order: Option<OrderBy<T>>,
}

impl<T: Record + Clone> InMemorySource<T> {
    fn matching(&self, cancel: Option<&CancellationToken>) -> Result<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut matched = Vec::new();
        for record in records.iter() {
            ensure_not_cancelled(cancel)?;
            let keep = match &self.filter {
                Some(spec) => spec.try_is_satisfied_by(record)?,
                None => true,
            };
            if keep {
                matched.push(record.clone());
            }
        }
        Ok(matched)
    }
}

fn ensure_not_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(FilterError::Cancelled.into()),
        _ => Ok(()),
    }
}

#[async_trait]
impl<T: Record + Clone> QueryableSource<T> for InMemorySource<T> {
    fn filter(mut self, predicate: &Predicate<T>) -> Self {
        let narrowed = match self.filter.take() {
            Some(existing) => existing.and(&Specification::new(predicate.clone())),
            None => Specification::new(predicate.clone()),
        };
        self.filter = Some(narrowed);
        self
    }

    fn order_by(mut self, order: &OrderBy<T>) -> Self {
        self.order = Some(order.clone());
        self
    }

    async fn count(&self, cancel: Option<&CancellationToken>) -> Result<usize> {
        match &self.filter {
            // Nothing to evaluate, avoid cloning every record.
            None => {
                ensure_not_cancelled(cancel)?;
                let records = self
                    .records
                    .read()
                    .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
                Ok(records.len())
            }
            Some(_) => Ok(self.matching(cancel)?.len()),
        }
    }

    async fn fetch(
        &self,
        skip: usize,
        take: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<T>> {
        let mut matched = self.matching(cancel)?;
        if let Some(order) = &self.order {
            // sort_by is stable, ties keep insertion order
            matched.sort_by(|a, b| order.compare(a, b));
        }
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }
}
