//! Specifications: named, combinable wrappers around predicate trees

use std::fmt;
use std::ops::{BitAnd, BitOr, Deref, Not};
use std::sync::OnceLock;

use crate::core::compile::CompiledPredicate;
use crate::core::error::{FilterError, Result};
use crate::core::predicate::{OrderBy, Predicate};
use crate::core::record::Record;

/// A business rule over records of type `T`.
///
/// A specification owns exactly one predicate tree. The tree stays inspectable
/// (see [`Specification::predicate`]) so a storage collaborator can translate
/// it; in-memory checks go through a compiled form built on first use.
///
/// # Example
/// ```rust,ignore
/// let overdue = Specification::new(Predicate::<Invoice>::build(|e| {
///     Ok(e.member("due_days")?.gt(30))
/// })?);
/// let large = Specification::new(Predicate::<Invoice>::build(|e| {
///     Ok(e.member("amount")?.ge(10_000.0))
/// })?);
///
/// let escalate = &overdue & &large;
/// assert!(escalate.is_satisfied_by(&invoice));
/// ```
pub struct Specification<T: Record> {
    predicate: Predicate<T>,
    compiled: OnceLock<CompiledPredicate<T>>,
}

impl<T: Record> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            compiled: self.compiled.clone(),
        }
    }
}

impl<T: Record> Specification<T> {
    pub fn new(predicate: Predicate<T>) -> Self {
        Self {
            predicate,
            compiled: OnceLock::new(),
        }
    }

    /// The specification every record satisfies
    pub fn all() -> Self {
        Self::new(Predicate::always())
    }

    /// The predicate tree, for inspection and translation
    pub fn predicate(&self) -> &Predicate<T> {
        &self.predicate
    }

    /// Consume the specification, keeping its tree
    pub fn into_predicate(self) -> Predicate<T> {
        self.predicate
    }

    /// Evaluate against an in-memory value, propagating evaluation errors
    pub fn try_is_satisfied_by(&self, value: &T) -> Result<bool> {
        self.compiled
            .get_or_init(|| CompiledPredicate::compile(&self.predicate))
            .matches(value)
    }

    /// Evaluate against an in-memory value.
    ///
    /// An ill-formed tree never satisfies; the error is logged.
    pub fn is_satisfied_by(&self, value: &T) -> bool {
        match self.try_is_satisfied_by(value) {
            Ok(satisfied) => satisfied,
            Err(err) => {
                tracing::warn!(
                    record = T::type_name(),
                    predicate = %self.predicate,
                    error = %err,
                    "specification could not be evaluated"
                );
                false
            }
        }
    }

    /// Both specifications hold
    pub fn and(&self, other: &Specification<T>) -> Specification<T> {
        Specification::new(self.predicate.and(&other.predicate))
    }

    /// Either specification holds
    pub fn or(&self, other: &Specification<T>) -> Specification<T> {
        Specification::new(self.predicate.or(&other.predicate))
    }

    /// This specification does not hold
    pub fn negate(&self) -> Specification<T> {
        Specification::new(self.predicate.not())
    }
}

impl<T: Record> From<Predicate<T>> for Specification<T> {
    fn from(predicate: Predicate<T>) -> Self {
        Self::new(predicate)
    }
}

impl<T: Record> TryFrom<Option<Predicate<T>>> for Specification<T> {
    type Error = FilterError;

    fn try_from(predicate: Option<Predicate<T>>) -> Result<Self> {
        predicate
            .map(Specification::new)
            .ok_or(FilterError::MissingPredicate)
    }
}

impl<T: Record> BitAnd for &Specification<T> {
    type Output = Specification<T>;

    fn bitand(self, rhs: Self) -> Specification<T> {
        self.and(rhs)
    }
}

impl<T: Record> BitOr for &Specification<T> {
    type Output = Specification<T>;

    fn bitor(self, rhs: Self) -> Specification<T> {
        self.or(rhs)
    }
}

impl<T: Record> Not for &Specification<T> {
    type Output = Specification<T>;

    fn not(self) -> Specification<T> {
        self.negate()
    }
}

impl<T: Record> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("record", &T::type_name())
            .field("predicate", &self.predicate.to_string())
            .finish()
    }
}

/// A specification plus the ordering and page window of one page request
pub struct PagedSpecification<T: Record> {
    specification: Specification<T>,
    order_by: OrderBy<T>,
    page_number: usize,
    page_size: usize,
}

impl<T: Record> Clone for PagedSpecification<T> {
    fn clone(&self) -> Self {
        Self {
            specification: self.specification.clone(),
            order_by: self.order_by.clone(),
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

impl<T: Record> PagedSpecification<T> {
    /// Create a paged specification.
    ///
    /// A missing page number means page 1, and 0 is raised to 1. A page size
    /// of 0 is rejected.
    pub fn new(
        specification: Specification<T>,
        order_by: OrderBy<T>,
        page_number: Option<usize>,
        page_size: usize,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(FilterError::invalid_argument(
                "page_size",
                "must be greater than 0",
            ));
        }
        Ok(Self {
            specification,
            order_by,
            page_number: page_number.unwrap_or(1).max(1),
            page_size,
        })
    }

    pub fn specification(&self) -> &Specification<T> {
        &self.specification
    }

    /// The ordering key selector
    pub fn order_by(&self) -> &OrderBy<T> {
        &self.order_by
    }

    pub fn order_by_ascending(&self) -> bool {
        self.order_by.is_ascending()
    }

    /// 1-based page number
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Same ordering and window, different rule
    pub fn with_specification(&self, specification: Specification<T>) -> Self {
        Self {
            specification,
            ..self.clone()
        }
    }
}

impl<T: Record> Deref for PagedSpecification<T> {
    type Target = Specification<T>;

    fn deref(&self) -> &Specification<T> {
        &self.specification
    }
}

impl<T: Record> fmt::Debug for PagedSpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedSpecification")
            .field("specification", &self.specification)
            .field("order_by", &self.order_by)
            .field("page_number", &self.page_number)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::predicate::Selector;
    use crate::impl_record;

    impl_record! {
        #[derive(Debug, Clone)]
        struct Product as "Product" {
            name: String,
            price: f64,
            stock: i64,
        }
    }

    fn product(name: &str, price: f64, stock: i64) -> Product {
        Product {
            name: name.to_string(),
            price,
            stock,
        }
    }

    fn cheap() -> Specification<Product> {
        Predicate::<Product>::build(|e| Ok(e.member("price")?.lt(10.0)))
            .unwrap()
            .into()
    }

    fn in_stock() -> Specification<Product> {
        Predicate::<Product>::build(|e| Ok(e.member("stock")?.gt(0)))
            .unwrap()
            .into()
    }

    #[test]
    fn test_missing_predicate_is_rejected() {
        let err = Specification::<Product>::try_from(None).unwrap_err();
        assert!(matches!(err, FilterError::MissingPredicate));
        assert!(Specification::try_from(Some(Predicate::<Product>::always())).is_ok());
    }

    #[test]
    fn test_and_or_not() {
        let bargain = &cheap() & &in_stock();
        let either = &cheap() | &in_stock();
        let pricey = !&cheap();

        let sold_out_cheap = product("pen", 2.0, 0);
        assert!(!bargain.is_satisfied_by(&sold_out_cheap));
        assert!(either.is_satisfied_by(&sold_out_cheap));
        assert!(!pricey.is_satisfied_by(&sold_out_cheap));

        let stocked_cheap = product("pencil", 1.0, 5);
        assert!(bargain.is_satisfied_by(&stocked_cheap));
    }

    #[test]
    fn test_combined_tree_stays_inspectable() {
        let bargain = cheap().and(&in_stock());
        assert!(bargain.predicate().unbound_parameters().is_empty());
        assert_eq!(
            bargain.predicate().to_string(),
            "e => ((e.price < 10.0) && (e.stock > 0))"
        );
    }

    #[test]
    fn test_paged_specification_defaults() {
        let order = OrderBy::ascending(Selector::<Product>::field("name").unwrap());

        let paged = PagedSpecification::new(cheap(), order.clone(), None, 10).unwrap();
        assert_eq!(paged.page_number(), 1);
        assert_eq!(paged.page_size(), 10);
        assert!(paged.order_by_ascending());
        assert!(paged.is_satisfied_by(&product("pen", 2.0, 0)));

        let floored = PagedSpecification::new(cheap(), order.clone(), Some(0), 10).unwrap();
        assert_eq!(floored.page_number(), 1);

        let err = PagedSpecification::new(cheap(), order, Some(2), 0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }
}
