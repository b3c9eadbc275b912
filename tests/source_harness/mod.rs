//! Shared test harness for queryable source testing
//!
//! Provides fixture records covering each capability combination, a
//! `CountingSource` wrapper that records round trips, a `FailingSource`, and
//! helpers for seeding data.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod source_harness;
//! use source_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod source_contract_tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use filterkit::core::predicate::{OrderBy, Predicate};
use filterkit::core::record::Record;
use filterkit::core::store::QueryableSource;
use filterkit::impl_record;
use filterkit::storage::{InMemorySource, InMemoryStore};

// ---------------------------------------------------------------------------
// Fixture records
// ---------------------------------------------------------------------------

impl_record! {
    /// Multi-tenant and soft-deletable.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Order as "Order" {
        pub id: Uuid,
        pub tenant_id: String,
        pub is_deleted: bool,
        pub reference: String,
        pub total: f64,
        pub quantity: i64,
        pub placed_at: DateTime<Utc>,
    }
}

impl_record! {
    /// No capabilities.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Product as "Product" {
        pub name: String,
        pub price: f64,
        pub stock: i64,
    }
}

impl_record! {
    /// Multi-tenant through a uuid-typed tenant id, not soft-deletable.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Account as "Account" {
        pub tenant_id: Uuid,
        pub email: String,
    }
}

impl_record! {
    /// Has a nullable deleted flag, which does not count as soft-deletable.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Archive as "Archive" {
        pub label: String,
        pub is_deleted: Option<bool>,
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Order number `n` (1-based) for `tenant`
pub fn order(n: i64, tenant: &str) -> Order {
    Order {
        id: Uuid::new_v4(),
        tenant_id: tenant.to_string(),
        is_deleted: false,
        reference: format!("ORD-{:03}", n),
        total: n as f64 * 10.0,
        quantity: n,
        placed_at: epoch() + Duration::days(n),
    }
}

/// Orders 1..=count, all for `tenant`
pub fn orders(count: i64, tenant: &str) -> Vec<Order> {
    (1..=count).map(|n| order(n, tenant)).collect()
}

pub fn product(name: &str, price: f64, stock: i64) -> Product {
    Product {
        name: name.to_string(),
        price,
        stock,
    }
}

pub fn order_store(items: Vec<Order>) -> InMemoryStore<Order> {
    let store = InMemoryStore::new();
    store.extend(items).unwrap();
    store
}

/// Seed function for the contract suite
pub fn in_memory_orders(items: Vec<Order>) -> InMemorySource<Order> {
    order_store(items).query()
}

pub fn quantity_at_least(min: i64) -> Predicate<Order> {
    Predicate::<Order>::build(|e| Ok(e.member("quantity")?.ge(min))).unwrap()
}

pub fn quantity_below(max: i64) -> Predicate<Order> {
    Predicate::<Order>::build(|e| Ok(e.member("quantity")?.lt(max))).unwrap()
}

/// Install a test-writer subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// CountingSource: records round trips, optionally cancels around the count
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RoundTrips {
    pub counts: Arc<AtomicUsize>,
    pub fetches: Arc<AtomicUsize>,
}

impl RoundTrips {
    pub fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

pub struct CountingSource<S> {
    inner: S,
    trips: RoundTrips,
    cancel_after_count: Option<CancellationToken>,
    cancel_during_count: Option<CancellationToken>,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> (Self, RoundTrips) {
        let trips = RoundTrips::default();
        (
            Self {
                inner,
                trips: trips.clone(),
                cancel_after_count: None,
                cancel_during_count: None,
            },
            trips,
        )
    }

    /// Cancel `token` as soon as the count round trip completes
    pub fn cancelling_after_count(mut self, token: CancellationToken) -> Self {
        self.cancel_after_count = Some(token);
        self
    }

    /// Cancel `token` after the count starts, before the inner source runs
    pub fn cancelling_during_count(mut self, token: CancellationToken) -> Self {
        self.cancel_during_count = Some(token);
        self
    }
}

#[async_trait]
impl<T, S> QueryableSource<T> for CountingSource<S>
where
    T: Record,
    S: QueryableSource<T>,
{
    fn filter(self, predicate: &Predicate<T>) -> Self {
        Self {
            inner: self.inner.filter(predicate),
            ..self
        }
    }

    fn order_by(self, order: &OrderBy<T>) -> Self {
        Self {
            inner: self.inner.order_by(order),
            ..self
        }
    }

    async fn count(&self, cancel: Option<&CancellationToken>) -> Result<usize> {
        self.trips.counts.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_during_count {
            token.cancel();
        }
        let total = self.inner.count(cancel).await?;
        if let Some(token) = &self.cancel_after_count {
            token.cancel();
        }
        Ok(total)
    }

    async fn fetch(
        &self,
        skip: usize,
        take: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<T>> {
        self.trips.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(skip, take, cancel).await
    }
}

// ---------------------------------------------------------------------------
// FailingSource: every round trip fails
// ---------------------------------------------------------------------------

pub struct FailingSource;

#[async_trait]
impl<T: Record> QueryableSource<T> for FailingSource {
    fn filter(self, _predicate: &Predicate<T>) -> Self {
        self
    }

    fn order_by(self, _order: &OrderBy<T>) -> Self {
        self
    }

    async fn count(&self, _cancel: Option<&CancellationToken>) -> Result<usize> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn fetch(
        &self,
        _skip: usize,
        _take: usize,
        _cancel: Option<&CancellationToken>,
    ) -> Result<Vec<T>> {
        Err(anyhow!("connection reset by peer"))
    }
}
