//! # filterkit
//!
//! Composable, inspectable query predicates for repository layers.
//!
//! ## Features
//!
//! - **Predicate Trees**: filters are data (`Expr`), so stores can translate them
//! - **Specification Algebra**: combine business rules with `&`, `|` and `!`
//! - **Dynamic Builders**: orderings, wildcard matches and JSON filters from strings
//! - **Implicit Scoping**: tenant and soft-delete clauses injected by capability
//! - **Pagination**: one count and one windowed fetch per page, cancellable
//! - **Compiled Evaluation**: in-memory checks through cached, literal-parameterized closures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filterkit::prelude::*;
//!
//! impl_record! {
//!     #[derive(Debug, Clone)]
//!     pub struct Invoice as "Invoice" {
//!         pub number: String,
//!         pub amount: f64,
//!         pub tenant_id: String,
//!         pub is_deleted: bool,
//!     }
//! }
//!
//! let large = Specification::new(Predicate::<Invoice>::build(|e| {
//!     Ok(e.member("amount")?.ge(1_000.0))
//! })?);
//! let paged = PagedSpecification::new(
//!     large,
//!     order_by_name::<Invoice>("number", true)?,
//!     Some(1),
//!     20,
//! )?;
//!
//! let page = paginate(store.query(), &paged, &DataScope::for_tenant("acme"), None).await?;
//! println!("{} of {}", page.len(), page.total_count());
//! ```

pub mod config;
pub mod core;
pub mod records;
pub mod storage;

pub use crate::core::error::{FilterError, Result};

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Predicate model ===
    pub use crate::core::{
        expr::{BinaryOp, Expr, Param, StringMethod, UnaryOp},
        field::{FieldKind, FieldType, FieldValue},
        predicate::{OrderBy, Predicate, Selector, Var},
        record::{FieldDescriptor, Record},
    };

    // === Specifications and builders ===
    pub use crate::core::{
        compile::{CompiledPredicate, PredicateCache},
        dynamic::{
            apply_order_by_name, classify_wildcard, like, order_by_name, predicate_from_filter,
            wildcard_predicate,
        },
        specification::{PagedSpecification, Specification},
    };

    // === Capabilities ===
    pub use crate::core::capability::{
        Capability, DataScope, combine_with_not_deleted_filter, combine_with_tenant_filter,
        ensure_multi_tenant, ensure_soft_deletable, is_multi_tenant, is_soft_deletable,
        mark_as_deleted, soft_delete,
    };

    // === Pagination ===
    pub use crate::core::{
        query::{PageRequest, PaginatedResponse, PaginatedResult, PaginationMeta, paginate},
        store::QueryableSource,
    };

    // === Errors and config ===
    pub use crate::config::FilterConfig;
    pub use crate::core::error::{FilterError, Result};

    // === Macros ===
    pub use crate::impl_record;

    // === Storage ===
    pub use crate::storage::{InMemorySource, InMemoryStore, SqlFilter, order_by_clause};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use tokio_util::sync::CancellationToken;
    pub use uuid::Uuid;
}
