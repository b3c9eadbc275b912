//! Core module containing the predicate model, specifications and pagination

pub mod capability;
pub mod compile;
pub mod dynamic;
pub mod error;
pub mod expr;
pub mod field;
pub mod predicate;
pub mod query;
pub mod record;
pub mod specification;
pub mod store;

pub use capability::{
    Capability, DataScope, combine_with_not_deleted_filter, combine_with_tenant_filter,
    ensure_multi_tenant, ensure_soft_deletable, is_multi_tenant, is_soft_deletable,
    mark_as_deleted, soft_delete,
};
pub use compile::{CompiledPredicate, PredicateCache};
pub use dynamic::{
    WildcardMatch, apply_order_by_name, classify_wildcard, like, order_by_name,
    predicate_from_filter, wildcard_predicate,
};
pub use error::{FilterError, Result};
pub use expr::{BinaryOp, Expr, Param, StringMethod, UnaryOp};
pub use field::{FieldKind, FieldType, FieldValue};
pub use predicate::{OrderBy, Predicate, Selector, Var};
pub use query::{PageRequest, PaginatedResponse, PaginatedResult, PaginationMeta, paginate};
pub use record::{FieldDescriptor, Record};
pub use specification::{PagedSpecification, Specification};
pub use store::QueryableSource;
