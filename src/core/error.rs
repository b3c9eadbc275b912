//! Typed error handling for filterkit
//!
//! Every fallible operation in the crate returns [`FilterError`]. Errors are
//! grouped by where they originate:
//!
//! - construction: [`FilterError::MissingPredicate`], [`FilterError::InvalidArgument`]
//! - metadata lookup: [`FilterError::PropertyNotFound`], [`FilterError::UnknownField`]
//! - capability guards: [`FilterError::MissingCapability`]
//! - accessors and evaluation: [`FilterError::FieldTypeMismatch`],
//!   [`FilterError::TypeMismatch`], [`FilterError::UnboundParameter`]
//! - the queryable source: [`FilterError::Source`], [`FilterError::Cancelled`]
//!
//! # Example
//!
//! ```rust,ignore
//! match order_by_name::<Invoice>("amout", true) {
//!     Err(FilterError::PropertyNotFound { property, type_name }) => {
//!         eprintln!("no '{}' on {}", property, type_name);
//!     }
//!     other => { /* ... */ }
//! }
//! ```

use thiserror::Error;

use crate::core::capability::Capability;
use crate::core::field::FieldKind;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, FilterError>;

/// The error type for predicate construction, evaluation and pagination
#[derive(Debug, Error)]
pub enum FilterError {
    /// A specification was constructed without a predicate tree
    #[error("Invalid argument: a specification requires a predicate")]
    MissingPredicate,

    /// An argument violated a documented precondition
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    /// A property name given at runtime does not exist on the record type
    #[error("Property '{property}' not found on type '{type_name}'")]
    PropertyNotFound {
        property: String,
        type_name: &'static str,
    },

    /// An explicit capability-specific operation was requested on a type
    /// that does not declare the capability
    #[error("Type '{type_name}' does not support {capability}")]
    MissingCapability {
        type_name: &'static str,
        capability: Capability,
    },

    /// A write accessor was asked for a field the record does not have
    #[error("Type '{type_name}' has no field '{field}'")]
    UnknownField {
        type_name: &'static str,
        field: String,
    },

    /// A write accessor received a value of the wrong kind
    #[error("Cannot assign {found} to field '{field}' of type '{type_name}' (expected {expected})")]
    FieldTypeMismatch {
        type_name: &'static str,
        field: String,
        expected: FieldKind,
        found: String,
    },

    /// A predicate body references a variable that is not bound by its lambda
    #[error("Parameter '{name}' is not bound by the enclosing predicate")]
    UnboundParameter { name: String },

    /// Evaluation produced a value of an unexpected kind
    #[error("Type mismatch while evaluating '{operation}': {message}")]
    TypeMismatch { operation: String, message: String },

    /// The caller cancelled a pagination request
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the queryable source, passed through unchanged
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl FilterError {
    /// Stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::MissingPredicate => "MISSING_PREDICATE",
            FilterError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            FilterError::PropertyNotFound { .. } => "PROPERTY_NOT_FOUND",
            FilterError::MissingCapability { .. } => "MISSING_CAPABILITY",
            FilterError::UnknownField { .. } => "UNKNOWN_FIELD",
            FilterError::FieldTypeMismatch { .. } => "FIELD_TYPE_MISMATCH",
            FilterError::UnboundParameter { .. } => "UNBOUND_PARAMETER",
            FilterError::TypeMismatch { .. } => "TYPE_MISMATCH",
            FilterError::Cancelled => "CANCELLED",
            FilterError::Config(_) => "CONFIG_ERROR",
            FilterError::Source(_) => "SOURCE_ERROR",
        }
    }

    pub(crate) fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(operation: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::TypeMismatch {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Wrap a source failure, recovering a cancellation the source reported
    /// as `FilterError::Cancelled` inside the `anyhow::Error`.
    pub(crate) fn from_source(err: anyhow::Error) -> Self {
        match err.downcast::<FilterError>() {
            Ok(FilterError::Cancelled) => FilterError::Cancelled,
            Ok(other) => FilterError::Source(anyhow::Error::new(other)),
            Err(err) => FilterError::Source(err),
        }
    }
}
