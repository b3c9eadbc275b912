//! Cross-cutting filters: tenant isolation and soft-delete exclusion
//!
//! A record type *has* a capability when its field list declares the accessor
//! the capability relies on:
//!
//! | Capability | Field | Kind |
//! |---|---|---|
//! | [`Capability::MultiTenant`] | `tenant_id` | string or uuid |
//! | [`Capability::SoftDeletable`] | `is_deleted` | boolean, not nullable |
//!
//! The check depends only on the type, never on an instance, so the answer is
//! computed once per type and kept in a process-wide map.
//!
//! The `combine_with_*` functions conjoin the implicit clause onto a caller's
//! predicate with the same rebinding `Predicate::and` uses. When there is
//! nothing to add they hand back the caller's tree itself, which callers can
//! detect with [`Predicate::ptr_eq`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{FilterError, Result};
use crate::core::expr::{Expr, Param};
use crate::core::field::{FieldKind, FieldValue};
use crate::core::predicate::{DEFAULT_PARAM_NAME, Predicate};
use crate::core::record::{FieldDescriptor, Record};

/// Field a multi-tenant record stores its tenant in
pub const TENANT_ID_FIELD: &str = "tenant_id";

/// Flag a soft-deletable record is marked deleted with
pub const DELETED_FLAG_FIELD: &str = "is_deleted";

/// A type-level structural fact about a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    MultiTenant,
    SoftDeletable,
}

impl Capability {
    /// The field this capability is detected by
    pub fn field_name(&self) -> &'static str {
        match self {
            Capability::MultiTenant => TENANT_ID_FIELD,
            Capability::SoftDeletable => DELETED_FLAG_FIELD,
        }
    }

    fn is_declared_by(&self, fields: &[FieldDescriptor]) -> bool {
        let Some(field) = fields.iter().find(|f| f.name == self.field_name()) else {
            return false;
        };
        match self {
            Capability::MultiTenant => matches!(field.kind, FieldKind::String | FieldKind::Uuid),
            Capability::SoftDeletable => field.kind == FieldKind::Boolean && !field.nullable,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::MultiTenant => f.write_str("multi-tenancy"),
            Capability::SoftDeletable => f.write_str("soft-delete"),
        }
    }
}

fn capability_cache() -> &'static RwLock<HashMap<(TypeId, Capability), bool>> {
    static CACHE: OnceLock<RwLock<HashMap<(TypeId, Capability), bool>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Whether `T` declares `capability`
pub fn is_capable<T: Record>(capability: Capability) -> bool {
    let key = (TypeId::of::<T>(), capability);
    if let Some(known) = capability_cache()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&key)
    {
        return *known;
    }

    // Racing threads compute the same answer; the first insert wins.
    let capable = capability.is_declared_by(T::fields());
    *capability_cache()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .entry(key)
        .or_insert(capable)
}

/// Fail unless `T` declares `capability`
pub fn ensure_capable<T: Record>(capability: Capability) -> Result<()> {
    if is_capable::<T>(capability) {
        Ok(())
    } else {
        Err(FilterError::MissingCapability {
            type_name: T::type_name(),
            capability,
        })
    }
}

pub fn is_multi_tenant<T: Record>() -> bool {
    is_capable::<T>(Capability::MultiTenant)
}

pub fn ensure_multi_tenant<T: Record>() -> Result<()> {
    ensure_capable::<T>(Capability::MultiTenant)
}

pub fn is_soft_deletable<T: Record>() -> bool {
    is_capable::<T>(Capability::SoftDeletable)
}

pub fn ensure_soft_deletable<T: Record>() -> Result<()> {
    ensure_capable::<T>(Capability::SoftDeletable)
}

/// Restrict `predicate` to one tenant.
///
/// Returns `predicate(e) && e.tenant_id == tenant_id` when `T` is multi-tenant
/// and `tenant_id` is non-empty; otherwise returns `predicate` itself.
///
/// For a uuid-typed tenant field the id is parsed; an id that does not parse
/// is compared as a string and so matches no record.
pub fn combine_with_tenant_filter<T: Record>(
    predicate: &Predicate<T>,
    tenant_id: Option<&str>,
) -> Predicate<T> {
    let Some(tenant_id) = tenant_id.filter(|t| !t.is_empty()) else {
        return predicate.clone();
    };
    if !is_multi_tenant::<T>() {
        return predicate.clone();
    }

    let literal = match T::field(TENANT_ID_FIELD).map(|f| f.kind) {
        Some(FieldKind::Uuid) => match Uuid::parse_str(tenant_id) {
            Ok(id) => FieldValue::Uuid(id),
            Err(_) => {
                tracing::warn!(
                    record = T::type_name(),
                    tenant_id,
                    "tenant id is not a uuid; filter will match nothing"
                );
                FieldValue::String(tenant_id.to_string())
            }
        },
        _ => FieldValue::String(tenant_id.to_string()),
    };

    let param = Param::new(DEFAULT_PARAM_NAME);
    let clause = Predicate::<T>::new(
        param.clone(),
        Expr::parameter(&param).member(TENANT_ID_FIELD).eq(literal),
    );
    tracing::debug!(record = T::type_name(), tenant_id, "tenant filter applied");
    predicate.and(&clause)
}

/// Exclude soft-deleted records: `predicate(e) && !e.is_deleted`.
///
/// Returns `predicate` itself when `T` is not soft-deletable.
pub fn combine_with_not_deleted_filter<T: Record>(predicate: &Predicate<T>) -> Predicate<T> {
    if !is_soft_deletable::<T>() {
        return predicate.clone();
    }
    let param = Param::new(DEFAULT_PARAM_NAME);
    let clause = Predicate::<T>::new(
        param.clone(),
        Expr::parameter(&param).member(DELETED_FLAG_FIELD).negate(),
    );
    tracing::debug!(record = T::type_name(), "not-deleted filter applied");
    predicate.and(&clause)
}

/// Set the deleted flag on a record.
///
/// Callers are expected to have checked [`ensure_soft_deletable`] (see
/// [`soft_delete`]). On a type without the flag this fails with the write
/// accessor's own `UnknownField` or `FieldTypeMismatch` error.
pub fn mark_as_deleted<T: Record>(value: &mut T) -> Result<()> {
    value.set_field(DELETED_FLAG_FIELD, FieldValue::Boolean(true))
}

/// Guarded soft delete: check the capability, then mark the record
pub fn soft_delete<T: Record>(value: &mut T) -> Result<()> {
    ensure_soft_deletable::<T>()?;
    mark_as_deleted(value)
}

/// Implicit filters applied to one repository call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataScope {
    /// Tenant the caller is acting for, if any
    pub tenant_id: Option<String>,

    /// Include soft-deleted records
    #[serde(default)]
    pub include_deleted: bool,
}

impl DataScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            include_deleted: false,
        }
    }

    /// Ask for soft-deleted records too
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Apply the tenant filter and, unless deleted records were requested,
    /// the not-deleted filter.
    ///
    /// Requesting deleted records on a type that is not soft-deletable is an
    /// explicit soft-delete operation and fails.
    pub fn apply<T: Record>(&self, predicate: &Predicate<T>) -> Result<Predicate<T>> {
        let scoped = combine_with_tenant_filter(predicate, self.tenant_id.as_deref());
        if self.include_deleted {
            ensure_soft_deletable::<T>()?;
            Ok(scoped)
        } else {
            Ok(combine_with_not_deleted_filter(&scoped))
        }
    }
}
