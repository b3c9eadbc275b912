//! Predicate trees: a bound variable plus a boolean body over one record type

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::error::Result;
use crate::core::expr::{BinaryOp, Expr, Param};
use crate::core::field::FieldValue;
use crate::core::record::{FieldDescriptor, Record};

/// Default name given to the bound variable of a new predicate
pub const DEFAULT_PARAM_NAME: &str = "e";

#[derive(Debug)]
struct Lambda {
    param: Param,
    body: Expr,
}

/// An inspectable boolean expression `e => body` over records of type `T`.
///
/// Predicates are immutable and cheap to clone: clones share the same tree,
/// and [`Predicate::ptr_eq`] reports whether two handles point at it. Every
/// combinator returns a new tree and leaves its operands untouched.
///
/// # Example
/// ```rust,ignore
/// let adults = Predicate::<Person>::build(|e| Ok(e.member("age")?.ge(18)))?;
/// let named = Predicate::<Person>::build(|e| Ok(e.member("name")?.starts_with("A")))?;
///
/// // Both operands have their own `e`; `and` rebinds the right one.
/// let both = adults.and(&named);
/// assert_eq!(both.to_string(), "e => ((e.age >= 18) && e.name.starts_with(\"A\"))");
/// ```
pub struct Predicate<T> {
    inner: Arc<Lambda>,
    _record: PhantomData<fn(&T) -> bool>,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _record: PhantomData,
        }
    }
}

impl<T> Predicate<T> {
    /// Wrap an already built body.
    ///
    /// The body should only reference `param`; anything else is reported as
    /// an unbound parameter when the predicate is evaluated or translated.
    pub fn new(param: Param, body: Expr) -> Self {
        Self {
            inner: Arc::new(Lambda { param, body }),
            _record: PhantomData,
        }
    }

    /// The predicate that accepts every record
    pub fn always() -> Self {
        Self::new(Param::new(DEFAULT_PARAM_NAME), Expr::literal(true))
    }

    /// The bound variable
    pub fn param(&self) -> &Param {
        &self.inner.param
    }

    /// The body expression
    pub fn body(&self) -> &Expr {
        &self.inner.body
    }

    /// True when both handles share the same tree
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Parameters referenced by the body that this predicate does not bind
    pub fn unbound_parameters(&self) -> Vec<Param> {
        self.body()
            .parameters()
            .into_iter()
            .filter(|p| p != self.param())
            .collect()
    }

    /// `self(e) && other(e)`
    pub fn and(&self, other: &Predicate<T>) -> Predicate<T> {
        self.combine(BinaryOp::AndAlso, other)
    }

    /// `self(e) || other(e)`
    pub fn or(&self, other: &Predicate<T>) -> Predicate<T> {
        self.combine(BinaryOp::OrElse, other)
    }

    /// `!self(e)`
    pub fn not(&self) -> Predicate<T> {
        Predicate::new(self.param().clone(), self.body().clone().negate())
    }

    fn combine(&self, op: BinaryOp, other: &Predicate<T>) -> Predicate<T> {
        let param = self.param().clone();
        let right = other.body().rebind(other.param(), &param);
        Predicate::new(param, Expr::binary(op, self.body().clone(), right))
    }
}

impl<T: Record> Predicate<T> {
    /// Build a predicate from a closure receiving the bound variable.
    ///
    /// Member names are checked against `T`'s field list.
    pub fn build<F>(f: F) -> Result<Self>
    where
        F: FnOnce(&Var<T>) -> Result<Expr>,
    {
        let param = Param::new(DEFAULT_PARAM_NAME);
        let body = f(&Var::new(&param))?;
        Ok(Self::new(param, body))
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.param(), self.body())
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.to_string()).finish()
    }
}

/// Handle on a predicate's bound variable, used while building a body
pub struct Var<'a, T> {
    param: &'a Param,
    _record: PhantomData<fn(&T)>,
}

impl<'a, T: Record> Var<'a, T> {
    fn new(param: &'a Param) -> Self {
        Self {
            param,
            _record: PhantomData,
        }
    }

    pub fn param(&self) -> &Param {
        self.param
    }

    /// The variable itself as an expression
    pub fn expr(&self) -> Expr {
        Expr::parameter(self.param)
    }

    /// Access a declared field of the record
    pub fn member(&self, property: &str) -> Result<Expr> {
        let descriptor = T::resolve_field(property)?;
        Ok(self.expr().member(descriptor.name))
    }
}

/// A lambda `e => e.field` selecting one declared member of `T`.
///
/// Used as the key of an ordering and as the target of a wildcard match.
pub struct Selector<T> {
    param: Param,
    field: &'static FieldDescriptor,
    _record: PhantomData<fn(&T)>,
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            param: self.param.clone(),
            field: self.field,
            _record: PhantomData,
        }
    }
}

impl<T: Record> Selector<T> {
    /// Select a field by name (exact, then case-insensitive)
    pub fn field(property: &str) -> Result<Self> {
        Ok(Self {
            param: Param::new(DEFAULT_PARAM_NAME),
            field: T::resolve_field(property)?,
            _record: PhantomData,
        })
    }

    /// Read the selected member from a record
    pub fn get(&self, record: &T) -> FieldValue {
        record
            .field_value(self.field.name)
            .unwrap_or(FieldValue::Null)
    }
}

impl<T> Selector<T> {
    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.field
    }

    pub fn field_name(&self) -> &'static str {
        self.field.name
    }

    /// The body `e.field`
    pub fn body(&self) -> Expr {
        Expr::parameter(&self.param).member(self.field.name)
    }
}

impl<T> fmt::Display for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.param, self.body())
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.to_string()).finish()
    }
}

/// An ordering key plus its direction
pub struct OrderBy<T> {
    selector: Selector<T>,
    ascending: bool,
}

impl<T> Clone for OrderBy<T> {
    fn clone(&self) -> Self {
        Self {
            selector: self.selector.clone(),
            ascending: self.ascending,
        }
    }
}

impl<T> OrderBy<T> {
    pub fn new(selector: Selector<T>, ascending: bool) -> Self {
        Self {
            selector,
            ascending,
        }
    }

    pub fn ascending(selector: Selector<T>) -> Self {
        Self::new(selector, true)
    }

    pub fn descending(selector: Selector<T>) -> Self {
        Self::new(selector, false)
    }

    pub fn selector(&self) -> &Selector<T> {
        &self.selector
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

impl<T: Record> OrderBy<T> {
    /// Compare two records by this key.
    ///
    /// Nulls sort before every other value; values of mismatched kinds are
    /// treated as equal so the sort stays stable.
    pub fn compare(&self, a: &T, b: &T) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        let left = self.selector.get(a);
        let right = self.selector.get(b);
        let ordering = match (&left, &right) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Null, _) => Ordering::Less,
            (_, FieldValue::Null) => Ordering::Greater,
            _ => left.compare(&right).unwrap_or(Ordering::Equal),
        };
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

impl<T> fmt::Debug for OrderBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderBy")
            .field("selector", &self.selector.to_string())
            .field("ascending", &self.ascending)
            .finish()
    }
}
