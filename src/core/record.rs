//! Record trait: the per-type metadata service predicates are built against

use crate::core::error::{FilterError, Result};
use crate::core::field::{FieldKind, FieldValue};

/// Static description of one field of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as it appears in predicates and storage
    pub name: &'static str,

    /// Declared kind of the field
    pub kind: FieldKind,

    /// Whether the field may hold `FieldValue::Null`
    pub nullable: bool,
}

/// Base trait for every type predicates can be built over.
///
/// A record exposes:
/// - type-level metadata: its name and the list of its fields
/// - a read accessor returning a field's current value by name
/// - a write accessor assigning a field by name
///
/// The metadata is fixed for the lifetime of the process, which is what makes
/// capability facts derived from it safe to cache per type. Implement this
/// with [`impl_record!`](crate::impl_record) rather than by hand.
pub trait Record: Send + Sync + 'static {
    /// Human-readable type name used in error messages
    fn type_name() -> &'static str;

    /// All fields declared by this type
    fn fields() -> &'static [FieldDescriptor];

    /// Get the value of a field by name, `None` if the field does not exist
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Assign a field by name
    fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()>;

    /// Find a field descriptor by exact name
    fn field(name: &str) -> Option<&'static FieldDescriptor> {
        Self::fields().iter().find(|f| f.name == name)
    }

    /// Resolve a property name given at runtime.
    ///
    /// Tries an exact match first, then an ASCII case-insensitive one.
    fn resolve_field(property: &str) -> Result<&'static FieldDescriptor> {
        Self::field(property)
            .or_else(|| {
                Self::fields()
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(property))
            })
            .ok_or_else(|| FilterError::PropertyNotFound {
                property: property.to_string(),
                type_name: Self::type_name(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_record;

    impl_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Invoice as "Invoice" {
            number: String,
            amount: f64,
            paid_at: Option<chrono::DateTime<chrono::Utc>>,
        }
    }

    fn invoice() -> Invoice {
        Invoice {
            number: "INV-001".to_string(),
            amount: 120.0,
            paid_at: None,
        }
    }

    #[test]
    fn test_record_metadata() {
        assert_eq!(Invoice::type_name(), "Invoice");
        let names: Vec<_> = Invoice::fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["number", "amount", "paid_at"]);

        let paid_at = Invoice::field("paid_at").unwrap();
        assert_eq!(paid_at.kind, FieldKind::DateTime);
        assert!(paid_at.nullable);
    }

    #[test]
    fn test_resolve_field_is_case_insensitive_fallback() {
        assert_eq!(Invoice::resolve_field("Amount").unwrap().name, "amount");
        let err = Invoice::resolve_field("total").unwrap_err();
        assert!(matches!(err, FilterError::PropertyNotFound { .. }));
    }

    #[test]
    fn test_read_and_write_accessors() {
        let mut inv = invoice();
        assert_eq!(inv.field_value("amount"), Some(FieldValue::Float(120.0)));
        assert_eq!(inv.field_value("missing"), None);

        inv.set_field("amount", FieldValue::Integer(99)).unwrap();
        assert_eq!(inv.amount, 99.0);

        let err = inv
            .set_field("number", FieldValue::Boolean(true))
            .unwrap_err();
        assert!(matches!(err, FilterError::FieldTypeMismatch { .. }));

        let err = inv.set_field("missing", FieldValue::Null).unwrap_err();
        assert!(matches!(err, FilterError::UnknownField { .. }));
    }
}
