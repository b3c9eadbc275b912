//! Macro-generated test suite for `QueryableSource<Order>` contract validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod source_harness;
//!
//! use source_harness::*;
//!
//! queryable_source_tests!(in_memory_orders);
//! ```
//!
//! # Generated Tests
//!
//! ## Narrowing
//! - `test_count_all`, `test_filter_narrows`, `test_filters_conjoin`
//! - `test_wildcard_filter`
//!
//! ## Windows and ordering
//! - `test_fetch_window`, `test_fetch_past_end`
//! - `test_order_descending`, `test_order_by_name_replaces_previous`
//!
//! ## Pagination
//! - `test_paginate_25_items`, `test_paginate_empty`, `test_paginate_scoped_to_tenant`

/// Generate a full `QueryableSource<Order>` conformance test suite.
///
/// `$seed` must be callable as `fn(Vec<Order>) -> S` where `S` implements
/// `QueryableSource<Order>` and yields the orders in the given order when
/// no ordering is applied.
#[macro_export]
macro_rules! queryable_source_tests {
    ($seed:expr) => {
        mod queryable_source_contract_tests {
            use super::*;
            use filterkit::core::capability::{DataScope, soft_delete};
            use filterkit::core::dynamic::{apply_order_by_name, like, order_by_name};
            use filterkit::core::predicate::{OrderBy, Predicate, Selector};
            use filterkit::core::query::{PaginatedResult, paginate};
            use filterkit::core::specification::{PagedSpecification, Specification};
            use filterkit::core::store::QueryableSource;

            fn references(items: &[Order]) -> Vec<String> {
                items.iter().map(|o| o.reference.clone()).collect()
            }

            // ==============================================================
            // Narrowing
            // ==============================================================

            #[tokio::test]
            async fn test_count_all() {
                let source = ($seed)(orders(7, "acme"));
                assert_eq!(source.count(None).await.unwrap(), 7);
            }

            #[tokio::test]
            async fn test_filter_narrows() {
                let source = ($seed)(orders(10, "acme")).filter(&quantity_at_least(8));
                assert_eq!(source.count(None).await.unwrap(), 3);
                let found = source.fetch(0, 10, None).await.unwrap();
                assert_eq!(references(&found), vec!["ORD-008", "ORD-009", "ORD-010"]);
            }

            #[tokio::test]
            async fn test_filters_conjoin() {
                let source = ($seed)(orders(10, "acme"))
                    .filter(&quantity_at_least(3))
                    .filter(&quantity_below(5));
                let found = source.fetch(0, 10, None).await.unwrap();
                assert_eq!(references(&found), vec!["ORD-003", "ORD-004"]);
            }

            #[tokio::test]
            async fn test_wildcard_filter() {
                let selector = Selector::<Order>::field("reference").unwrap();
                let source = ($seed)(orders(12, "acme")).filter(&like(&selector, "%1").unwrap());
                let found = source.fetch(0, 10, None).await.unwrap();
                assert_eq!(references(&found), vec!["ORD-001", "ORD-011"]);
            }

            // ==============================================================
            // Windows and ordering
            // ==============================================================

            #[tokio::test]
            async fn test_fetch_window() {
                let source = ($seed)(orders(10, "acme"));
                let found = source.fetch(2, 3, None).await.unwrap();
                assert_eq!(references(&found), vec!["ORD-003", "ORD-004", "ORD-005"]);
            }

            #[tokio::test]
            async fn test_fetch_past_end() {
                let source = ($seed)(orders(3, "acme"));
                assert!(source.fetch(5, 10, None).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_order_descending() {
                let order = OrderBy::descending(Selector::<Order>::field("total").unwrap());
                let source = ($seed)(orders(4, "acme")).order_by(&order);
                let found = source.fetch(0, 2, None).await.unwrap();
                assert_eq!(references(&found), vec!["ORD-004", "ORD-003"]);
            }

            #[tokio::test]
            async fn test_order_by_name_replaces_previous() {
                let by_total = order_by_name::<Order>("total", true).unwrap();
                let source = ($seed)(orders(4, "acme")).order_by(&by_total);
                let source = apply_order_by_name(source, "PLACED_AT", false).unwrap();
                let found = source.fetch(0, 4, None).await.unwrap();
                assert_eq!(
                    references(&found),
                    vec!["ORD-004", "ORD-003", "ORD-002", "ORD-001"]
                );
            }

            // ==============================================================
            // Pagination
            // ==============================================================

            #[tokio::test]
            async fn test_paginate_25_items() {
                let source = ($seed)(orders(25, "acme"));

                let first = PaginatedResult::<Order>::create(&source, Some(1), 10, None).await.unwrap();
                assert_eq!(first.len(), 10);
                assert_eq!(first.total_count(), 25);
                assert_eq!(first.total_pages(), 3);
                assert!(!first.has_previous_page());
                assert!(first.has_next_page());

                let middle = PaginatedResult::<Order>::create(&source, Some(2), 10, None).await.unwrap();
                let expected: Vec<String> = (11..=20).map(|n| format!("ORD-{:03}", n)).collect();
                assert_eq!(references(middle.items()), expected);
                assert_eq!(middle.page_index(), 2);
                assert!(middle.has_previous_page());
                assert!(middle.has_next_page());

                let last = PaginatedResult::<Order>::create(&source, Some(3), 10, None).await.unwrap();
                assert_eq!(last.len(), 5);
                assert!(last.has_previous_page());
                assert!(!last.has_next_page());
                assert_eq!(last.items()[0].reference, "ORD-021");
            }

            #[tokio::test]
            async fn test_paginate_empty() {
                let source = ($seed)(Vec::new());
                let page = PaginatedResult::<Order>::create(&source, None, 10, None).await.unwrap();
                assert!(page.is_empty());
                assert_eq!(page.page_index(), 1);
                assert_eq!(page.total_pages(), 0);
                assert!(!page.has_previous_page());
                assert!(!page.has_next_page());
            }

            #[tokio::test]
            async fn test_paginate_scoped_to_tenant() {
                let mut items = orders(6, "acme");
                items.extend(orders(4, "globex"));
                soft_delete(&mut items[0]).unwrap();

                let paged = PagedSpecification::new(
                    Specification::new(Predicate::always()),
                    order_by_name::<Order>("quantity", true).unwrap(),
                    Some(1),
                    3,
                )
                .unwrap();

                let page = paginate(($seed)(items.clone()), &paged, &DataScope::for_tenant("acme"), None)
                    .await
                    .unwrap();
                assert_eq!(page.total_count(), 5);
                assert_eq!(page.total_pages(), 2);
                assert_eq!(references(page.items()), vec!["ORD-002", "ORD-003", "ORD-004"]);
                assert!(page.items().iter().all(|o| o.tenant_id == "acme" && !o.is_deleted));

                let with_deleted = DataScope::for_tenant("acme").with_deleted();
                let page = paginate(($seed)(items), &paged, &with_deleted, None)
                    .await
                    .unwrap();
                assert_eq!(page.total_count(), 6);
            }
        }
    };
}
