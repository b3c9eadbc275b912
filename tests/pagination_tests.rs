//! Pagination materializer: round trips, cancellation and error propagation

mod source_harness;

use filterkit::FilterError;
use filterkit::core::capability::DataScope;
use filterkit::core::dynamic::order_by_name;
use filterkit::core::query::{PageRequest, PaginatedResult, paginate};
use filterkit::core::specification::{PagedSpecification, Specification};
use filterkit::core::store::QueryableSource;
use source_harness::*;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_exactly_one_count_and_one_fetch() {
    init_tracing();
    let (source, trips) = CountingSource::new(in_memory_orders(orders(25, "acme")));

    let page = PaginatedResult::<Order>::create(&source, Some(2), 10, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page.items()[0].reference, "ORD-011");
    assert_eq!(trips.counts(), 1);
    assert_eq!(trips.fetches(), 1);
}

#[tokio::test]
async fn test_page_number_defaults_and_floors() {
    let source = in_memory_orders(orders(5, "acme"));

    let page = PaginatedResult::<Order>::create(&source, None, 2, None).await.unwrap();
    assert_eq!(page.page_index(), 1);

    let page = PaginatedResult::<Order>::create(&source, Some(0), 2, None).await.unwrap();
    assert_eq!(page.page_index(), 1);
    assert_eq!(page.items()[0].reference, "ORD-001");
}

#[tokio::test]
async fn test_zero_page_size_is_rejected_before_any_round_trip() {
    let (source, trips) = CountingSource::new(in_memory_orders(orders(5, "acme")));
    let err = PaginatedResult::<Order>::create(&source, Some(1), 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    assert_eq!(trips.counts(), 0);
}

#[tokio::test]
async fn test_page_beyond_last_is_empty() {
    let source = in_memory_orders(orders(25, "acme"));
    let page = PaginatedResult::<Order>::create(&source, Some(9), 10, None).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total_count(), 25);
    assert!(page.has_previous_page());
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (source, trips) = CountingSource::new(in_memory_orders(orders(5, "acme")));
    let token = CancellationToken::new();
    token.cancel();

    let err = PaginatedResult::<Order>::create(&source, Some(1), 10, Some(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::Cancelled));
    assert_eq!(trips.counts(), 0);
    assert_eq!(trips.fetches(), 0);
}

#[tokio::test]
async fn test_cancellation_after_count_prevents_fetch() {
    let token = CancellationToken::new();
    let (source, trips) = CountingSource::new(in_memory_orders(orders(5, "acme")));
    let source = source.cancelling_after_count(token.clone());

    let err = PaginatedResult::<Order>::create(&source, Some(1), 10, Some(&token))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CANCELLED");
    assert_eq!(trips.counts(), 1);
    assert_eq!(trips.fetches(), 0);
}

#[tokio::test]
async fn test_cancellation_observed_by_source_reports_cancelled() {
    let token = CancellationToken::new();
    let (source, trips) = CountingSource::new(in_memory_orders(orders(5, "acme")));
    let source = source
        .filter(&quantity_at_least(2))
        .cancelling_during_count(token.clone());

    let err = PaginatedResult::<Order>::create(&source, Some(1), 10, Some(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::Cancelled));
    assert_eq!(err.error_code(), "CANCELLED");
    assert_eq!(trips.counts(), 1);
    assert_eq!(trips.fetches(), 0);
}

#[tokio::test]
async fn test_source_failure_propagates_unchanged() {
    let err = PaginatedResult::<Order>::create(&FailingSource, Some(1), 10, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "SOURCE_ERROR");
    assert_eq!(err.to_string(), "connection reset by peer");
}

#[tokio::test]
async fn test_paginate_round_trips_with_scope() {
    let mut items = orders(8, "acme");
    items.extend(orders(8, "globex"));
    let (source, trips) = CountingSource::new(in_memory_orders(items));

    let paged = PagedSpecification::new(
        Specification::new(quantity_at_least(3)),
        order_by_name::<Order>("quantity", false).unwrap(),
        Some(1),
        4,
    )
    .unwrap();

    let page = paginate(source, &paged, &DataScope::for_tenant("globex"), None)
        .await
        .unwrap();
    assert_eq!(page.total_count(), 6);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items()[0].quantity, 8);
    assert!(page.items().iter().all(|o| o.tenant_id == "globex"));
    assert_eq!(trips.counts(), 1);
    assert_eq!(trips.fetches(), 1);
}

#[tokio::test]
async fn test_paginate_with_deleted_on_plain_type_fails() {
    let store = filterkit::storage::InMemoryStore::<Product>::new();
    let paged = PagedSpecification::new(
        Specification::all(),
        order_by_name::<Product>("name", true).unwrap(),
        None,
        10,
    )
    .unwrap();

    let err = paginate(store.query(), &paged, &DataScope::new().with_deleted(), None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "MISSING_CAPABILITY");
}

#[tokio::test]
async fn test_page_request_end_to_end() {
    let request: PageRequest = serde_json::from_value(serde_json::json!({
        "page": 2,
        "limit": 3,
        "sort": "total:desc",
        "filter": r#"{"reference": "ORD-0%", "quantity<=": 9}"#,
    }))
    .unwrap();

    let paged = request.into_paged_specification::<Order>().unwrap();
    let page = paginate(
        in_memory_orders(orders(12, "acme")),
        &paged,
        &DataScope::new(),
        None,
    )
    .await
    .unwrap();

    let response = serde_json::to_value(page.into_response().pagination).unwrap();
    assert_eq!(response["total"], 9);
    assert_eq!(response["total_pages"], 3);
    assert_eq!(response["page"], 2);
    assert_eq!(response["has_next"], true);
    assert_eq!(response["has_prev"], true);
}
