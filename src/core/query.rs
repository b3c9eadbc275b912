//! Page requests and the pagination materializer

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::FilterConfig;
use crate::core::capability::DataScope;
use crate::core::dynamic::{order_by_name, predicate_from_filter};
use crate::core::error::{FilterError, Result};
use crate::core::predicate::{OrderBy, Selector};
use crate::core::record::Record;
use crate::core::specification::{PagedSpecification, Specification};
use crate::core::store::QueryableSource;

/// Pagination, sorting and filtering parameters of a list request
///
/// All parameters have defaults, so the struct can be deserialized straight
/// from a query string.
///
/// # Example
/// ```rust,ignore
/// // GET /invoices?page=2&limit=10&sort=amount:desc&filter={"status": "open"}
/// let request: PageRequest = serde_json::from_value(query)?;
/// let paged = request.into_paged_specification::<Invoice>()?;
/// let page = paginate(store.query(), &paged, &DataScope::for_tenant(tenant), None).await?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Filters as a JSON object, see [`predicate_from_filter`]
    pub filter: Option<String>,

    /// Sort field and direction
    ///
    /// # Format
    /// - `field:asc` or `field` (ascending)
    /// - `field:desc` (descending)
    pub sort: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: FilterConfig::current().default_page_size,
            filter: None,
            sort: None,
        }
    }
}

impl PageRequest {
    /// Page number, at least 1
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Page size, clamped to the configured maximum
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, FilterConfig::current().max_page_size)
    }

    /// Parse the filter document
    pub fn filter_value(&self) -> Result<Option<Value>> {
        self.filter
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    FilterError::invalid_argument("filter", format!("not valid JSON: {}", e))
                })
            })
            .transpose()
    }

    /// Split `sort` into a property and a direction
    pub fn sort_key(&self) -> Result<Option<(&str, bool)>> {
        let Some(sort) = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let (property, ascending) = match sort.split_once(':') {
            None => (sort, true),
            Some((property, direction)) => match direction.trim().to_ascii_lowercase().as_str() {
                "asc" => (property, true),
                "desc" => (property, false),
                other => {
                    return Err(FilterError::invalid_argument(
                        "sort",
                        format!("unknown direction '{}', expected asc or desc", other),
                    ));
                }
            },
        };
        Ok(Some((property.trim(), ascending)))
    }

    /// Resolve the request against `T`.
    ///
    /// Without `sort` the first declared field of `T` is used, ascending.
    pub fn into_paged_specification<T: Record>(&self) -> Result<PagedSpecification<T>> {
        let order = match self.sort_key()? {
            Some((property, ascending)) => order_by_name::<T>(property, ascending)?,
            None => {
                let first = T::fields().first().ok_or_else(|| {
                    FilterError::invalid_argument(
                        "sort",
                        format!("{} declares no fields to order by", T::type_name()),
                    )
                })?;
                OrderBy::ascending(Selector::field(first.name)?)
            }
        };

        let specification = match self.filter_value()? {
            Some(filter) => Specification::new(predicate_from_filter::<T>(&filter)?),
            None => Specification::all(),
        };

        PagedSpecification::new(specification, order, Some(self.page()), self.limit())
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let total_pages = total_pages(total, limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

fn total_pages(total: usize, page_size: usize) -> usize {
    if total == 0 || page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// One materialized page plus the numbers needed to navigate the rest.
///
/// The items are an owned snapshot; the source is not touched again.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    items: Vec<T>,
    page_index: usize,
    page_size: usize,
    total_count: usize,
    total_pages: usize,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, page_index: usize, page_size: usize, total_count: usize) -> Self {
        Self {
            items,
            page_index,
            page_size,
            total_count,
            total_pages: total_pages(total_count, page_size),
        }
    }

    /// Count the source, then fetch one window of it.
    ///
    /// A missing page number means page 1, and 0 is raised to 1. Cancellation
    /// is checked before each round trip.
    pub async fn create<S>(
        source: &S,
        page_number: Option<usize>,
        page_size: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Self>
    where
        T: Record,
        S: QueryableSource<T>,
    {
        if page_size == 0 {
            return Err(FilterError::invalid_argument(
                "page_size",
                "must be greater than 0",
            ));
        }
        let page_index = page_number.unwrap_or(1).max(1);

        check_cancelled(cancel)?;
        let total_count = source
            .count(cancel)
            .await
            .map_err(FilterError::from_source)?;

        check_cancelled(cancel)?;
        let skip = (page_index - 1).saturating_mul(page_size);
        let items = source
            .fetch(skip, page_size, cancel)
            .await
            .map_err(FilterError::from_source)?;

        tracing::debug!(
            record = T::type_name(),
            page = page_index,
            page_size,
            total = total_count,
            fetched = items.len(),
            "page materialized"
        );
        Ok(Self::new(items, page_index, page_size, total_count))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based page number
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Matching records across all pages
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index < self.total_pages
    }

    pub fn meta(&self) -> PaginationMeta {
        PaginationMeta::new(self.page_index, self.page_size, self.total_count)
    }

    /// Convert into the serializable response shape
    pub fn into_response(self) -> PaginatedResponse<T> {
        let pagination = self.meta();
        PaginatedResponse {
            data: self.items,
            pagination,
        }
    }
}

impl<T> IntoIterator for PaginatedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(FilterError::Cancelled),
        _ => Ok(()),
    }
}

/// Scope, filter, order and materialize one page of `source`
pub async fn paginate<T, S>(
    source: S,
    paged: &PagedSpecification<T>,
    scope: &DataScope,
    cancel: Option<&CancellationToken>,
) -> Result<PaginatedResult<T>>
where
    T: Record,
    S: QueryableSource<T>,
{
    let predicate = scope.apply(paged.predicate())?;
    let source = source.filter(&predicate).order_by(paged.order_by());
    PaginatedResult::create(&source, Some(paged.page_number()), paged.page_size(), cancel).await
}
