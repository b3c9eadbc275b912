//! Reference collaborators: an in-memory queryable store and SQL translation

pub mod in_memory;
pub mod sql;

pub use in_memory::{InMemorySource, InMemoryStore};
pub use sql::{SqlFilter, order_by_clause};
