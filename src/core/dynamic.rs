//! Predicates and orderings synthesized from runtime strings
//!
//! - [`order_by_name`]: an ordering from a property name
//! - [`wildcard_predicate`] / [`like`]: a string match from a wildcard pattern
//! - [`predicate_from_filter`]: a conjunction from a JSON filter document

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::FilterConfig;
use crate::core::error::{FilterError, Result};
use crate::core::expr::{BinaryOp, Expr, StringMethod};
use crate::core::field::{FieldKind, FieldValue};
use crate::core::predicate::{OrderBy, Predicate, Selector};
use crate::core::record::{FieldDescriptor, Record};
use crate::core::store::QueryableSource;

/// Wildcard character used when none is configured
pub const DEFAULT_WILDCARD: char = '%';

/// Build an ordering on the member named `property`.
///
/// Fails with [`FilterError::PropertyNotFound`] naming the property and the
/// type when `T` has no such member.
pub fn order_by_name<T: Record>(property: &str, ascending: bool) -> Result<OrderBy<T>> {
    Ok(OrderBy::new(Selector::field(property)?, ascending))
}

/// Order `source` by the member named `property`
pub fn apply_order_by_name<T, S>(source: S, property: &str, ascending: bool) -> Result<S>
where
    T: Record,
    S: QueryableSource<T>,
{
    let order = order_by_name::<T>(property, ascending)?;
    Ok(source.order_by(&order))
}

/// The string operation a wildcard pattern maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardMatch {
    StartsWith,
    EndsWith,
    Contains,
}

impl WildcardMatch {
    pub fn method(&self) -> StringMethod {
        match self {
            WildcardMatch::StartsWith => StringMethod::StartsWith,
            WildcardMatch::EndsWith => StringMethod::EndsWith,
            WildcardMatch::Contains => StringMethod::Contains,
        }
    }
}

/// Classify a pattern by where its wildcards sit.
///
/// | pattern | result |
/// |---|---|
/// | `abc%` | starts-with `abc` |
/// | `%abc` | ends-with `abc` |
/// | `%abc%` | contains `abc` |
/// | `abc` | contains `abc` |
///
/// Only the edges are looked at; the returned literal has wildcards trimmed
/// from both ends and any inner wildcard is kept as an ordinary character.
pub fn classify_wildcard(pattern: &str, wildcard: char) -> (WildcardMatch, String) {
    let leading = pattern.starts_with(wildcard);
    let trailing = pattern.ends_with(wildcard);
    let literal = pattern.trim_matches(wildcard).to_string();

    let kind = match (leading, trailing) {
        (false, true) => WildcardMatch::StartsWith,
        (true, false) => WildcardMatch::EndsWith,
        // No wildcard at either edge falls back to a substring match.
        (true, true) | (false, false) => WildcardMatch::Contains,
    };
    (kind, literal)
}

/// Match the selected string member against a wildcard pattern
pub fn wildcard_predicate<T: Record>(
    selector: &Selector<T>,
    pattern: &str,
    wildcard: char,
) -> Result<Predicate<T>> {
    let descriptor = selector.descriptor();
    if descriptor.kind != FieldKind::String {
        return Err(FilterError::invalid_argument(
            descriptor.name,
            format!(
                "wildcard matching needs a string member, '{}' on {} is {}",
                descriptor.name,
                T::type_name(),
                descriptor.kind
            ),
        ));
    }

    let (kind, literal) = classify_wildcard(pattern, wildcard);
    let body = selector.body().call(kind.method(), literal);
    Ok(Predicate::new(selector.param().clone(), body))
}

/// [`wildcard_predicate`] with the configured wildcard character
pub fn like<T: Record>(selector: &Selector<T>, pattern: &str) -> Result<Predicate<T>> {
    wildcard_predicate(selector, pattern, FilterConfig::current().wildcard)
}

fn filter_key_pattern() -> &'static Regex {
    static FILTER_KEY: OnceLock<Regex> = OnceLock::new();
    FILTER_KEY.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(>=|<=|!=|>|<|=)?\s*$")
            .expect("filter key pattern is valid")
    })
}

/// Build a predicate from a JSON filter document.
///
/// # Format
/// - Match: `{"field": "value"}`. String values on string members go through
///   wildcard matching (`"Acme%"`), everything else is an equality test
/// - Comparison: `{"field>": value, "field<": value, "field>=": value, "field<=": value}`
/// - Exact: `{"field=": value}`, `{"field!=": value}`
///
/// All entries are combined with AND; `{}` accepts every record.
///
/// # Example
/// ```json
/// {"status": "active", "amount>": 100, "customer_name": "Acme%"}
/// ```
pub fn predicate_from_filter<T: Record>(filter: &Value) -> Result<Predicate<T>> {
    let Value::Object(entries) = filter else {
        return Err(FilterError::invalid_argument(
            "filter",
            "a filter document must be a JSON object",
        ));
    };

    let mut combined: Option<Predicate<T>> = None;
    for (key, value) in entries {
        let clause = filter_clause::<T>(key, value)?;
        combined = Some(match combined {
            Some(acc) => acc.and(&clause),
            None => clause,
        });
    }
    Ok(combined.unwrap_or_else(Predicate::always))
}

fn filter_clause<T: Record>(key: &str, value: &Value) -> Result<Predicate<T>> {
    let captures = filter_key_pattern()
        .captures(key)
        .ok_or_else(|| FilterError::invalid_argument("filter", format!("malformed key '{}'", key)))?;
    let property = &captures[1];
    let op = captures.get(2).map(|m| m.as_str());

    let selector = Selector::<T>::field(property)?;
    let descriptor = selector.descriptor();

    if op.is_none()
        && descriptor.kind == FieldKind::String
        && let Value::String(pattern) = value
    {
        return like(&selector, pattern);
    }

    let op = match op {
        None | Some("=") => BinaryOp::Eq,
        Some("!=") => BinaryOp::Ne,
        Some(">") => BinaryOp::Gt,
        Some(">=") => BinaryOp::Ge,
        Some("<") => BinaryOp::Lt,
        Some("<=") => BinaryOp::Le,
        Some(other) => {
            return Err(FilterError::invalid_argument(
                "filter",
                format!("unsupported operator '{}'", other),
            ));
        }
    };
    let literal = json_to_field_value::<T>(descriptor, value)?;
    let body = Expr::binary(op, selector.body(), Expr::Literal(literal));
    Ok(Predicate::new(selector.param().clone(), body))
}

fn json_to_field_value<T: Record>(descriptor: &FieldDescriptor, value: &Value) -> Result<FieldValue> {
    let mismatch = || {
        FilterError::invalid_argument(
            descriptor.name,
            format!(
                "{} is not a valid {} for '{}' on {}",
                value,
                descriptor.kind,
                descriptor.name,
                T::type_name()
            ),
        )
    };

    let converted = match (descriptor.kind, value) {
        (_, Value::Null) => FieldValue::Null,
        (FieldKind::String, Value::String(s)) => FieldValue::String(s.clone()),
        (FieldKind::Integer, Value::Number(n)) => {
            FieldValue::Integer(n.as_i64().ok_or_else(mismatch)?)
        }
        (FieldKind::Float, Value::Number(n)) => FieldValue::Float(n.as_f64().ok_or_else(mismatch)?),
        (FieldKind::Boolean, Value::Bool(b)) => FieldValue::Boolean(*b),
        (FieldKind::Uuid, Value::String(s)) => {
            FieldValue::Uuid(Uuid::parse_str(s).map_err(|_| mismatch())?)
        }
        (FieldKind::DateTime, Value::String(s)) => FieldValue::DateTime(
            DateTime::parse_from_rfc3339(s)
                .map_err(|_| mismatch())?
                .with_timezone(&Utc),
        ),
        _ => return Err(mismatch()),
    };
    Ok(converted)
}
