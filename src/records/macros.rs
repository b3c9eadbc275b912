//! Macros for reducing boilerplate when declaring records
//!
//! These macros generate the `Record` implementation (field descriptors plus
//! read/write accessors) for each record type, so the per-type metadata table
//! is built by the compiler instead of by runtime inspection.

/// Declare a record type, or implement `Record` for an existing struct.
///
/// Every listed field type must implement
/// [`FieldType`](crate::core::field::FieldType).
///
/// # Example
///
/// ```rust,ignore
/// use filterkit::prelude::*;
///
/// // Define the struct and its Record implementation together
/// impl_record! {
///     #[derive(Debug, Clone)]
///     pub struct Order as "Order" {
///         pub id: Uuid,
///         pub tenant_id: String,
///         pub is_deleted: bool,
///         pub reference: String,
///         pub total: f64,
///     }
/// }
///
/// // Or implement Record for a struct declared elsewhere
/// impl_record!(Customer, "Customer", {
///     id: Uuid,
///     name: String,
/// });
/// ```
#[macro_export]
macro_rules! impl_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $type:ident as $type_name:literal {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $type {
            $( $(#[$field_meta])* $field_vis $field : $field_ty ),*
        }

        $crate::impl_record!($type, $type_name, { $( $field : $field_ty ),* });
    };

    (
        $type:ty,
        $type_name:expr,
        {
            $( $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        impl $crate::core::record::Record for $type {
            fn type_name() -> &'static str {
                $type_name
            }

            fn fields() -> &'static [$crate::core::record::FieldDescriptor] {
                const FIELDS: &[$crate::core::record::FieldDescriptor] = &[
                    $(
                        $crate::core::record::FieldDescriptor {
                            name: stringify!($field),
                            kind: <$field_ty as $crate::core::field::FieldType>::KIND,
                            nullable: <$field_ty as $crate::core::field::FieldType>::NULLABLE,
                        }
                    ),*
                ];
                FIELDS
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                match field {
                    $(
                        stringify!($field) => Some(
                            $crate::core::field::FieldType::to_field_value(&self.$field)
                        ),
                    )*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                field: &str,
                value: $crate::core::field::FieldValue,
            ) -> $crate::core::error::Result<()> {
                match field {
                    $(
                        stringify!($field) => {
                            let found = value.kind_name().to_string();
                            match <$field_ty as $crate::core::field::FieldType>::from_field_value(value) {
                                Some(v) => {
                                    self.$field = v;
                                    Ok(())
                                }
                                None => Err($crate::core::error::FilterError::FieldTypeMismatch {
                                    type_name: <Self as $crate::core::record::Record>::type_name(),
                                    field: field.to_string(),
                                    expected: <$field_ty as $crate::core::field::FieldType>::KIND,
                                    found,
                                }),
                            }
                        }
                    )*
                    _ => Err($crate::core::error::FilterError::UnknownField {
                        type_name: <Self as $crate::core::record::Record>::type_name(),
                        field: field.to_string(),
                    }),
                }
            }
        }
    };
}
