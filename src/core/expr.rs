//! Inspectable expression IR for predicate bodies
//!
//! An [`Expr`] is a plain tagged union: literals, parameter references, member
//! accesses, unary/binary operators and string method calls. Nothing in it is
//! compiled or opaque, so a collaborator can walk it and translate it into
//! another query language (see [`crate::storage::sql`]).
//!
//! The one rewrite pass the algebra depends on is [`Expr::rebind`], which
//! replaces every reference to one bound variable with another. Combining two
//! predicates without it would leave the result with two free variables.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::field::FieldValue;

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// A bound variable.
///
/// Identity is the process-unique `id`; the name is only for display, so two
/// parameters both named `e` are still distinct variables.
#[derive(Debug, Clone)]
pub struct Param {
    id: u64,
    name: Arc<str>,
}

impl Param {
    /// Create a fresh variable
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Param {}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAlso,
    OrElse,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
        }
    }

    /// True for `AndAlso` and `OrElse`
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }
}

/// String comparisons a predicate can call on a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringMethod {
    StartsWith,
    EndsWith,
    Contains,
}

impl StringMethod {
    pub fn name(&self) -> &'static str {
        match self {
            StringMethod::StartsWith => "starts_with",
            StringMethod::EndsWith => "ends_with",
            StringMethod::Contains => "contains",
        }
    }
}

/// A node of a predicate body
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(FieldValue),
    Parameter(Param),
    Member {
        target: Box<Expr>,
        field: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        method: StringMethod,
        target: Box<Expr>,
        argument: Box<Expr>,
    },
}

/// Values accepted on the right-hand side of a comparison
pub trait IntoOperand {
    fn into_operand(self) -> Expr;
}

impl IntoOperand for Expr {
    fn into_operand(self) -> Expr {
        self
    }
}

impl IntoOperand for FieldValue {
    fn into_operand(self) -> Expr {
        Expr::Literal(self)
    }
}

macro_rules! literal_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOperand for $ty {
                fn into_operand(self) -> Expr {
                    Expr::Literal(FieldValue::from(self))
                }
            }
        )*
    };
}

literal_operand!(
    &str,
    String,
    i64,
    i32,
    f64,
    bool,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
);

impl Expr {
    pub fn literal(value: impl Into<FieldValue>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn parameter(param: &Param) -> Self {
        Expr::Parameter(param.clone())
    }

    /// Access `field` on this expression
    pub fn member(self, field: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            field: field.into(),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Eq, self, rhs.into_operand())
    }

    pub fn ne(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Ne, self, rhs.into_operand())
    }

    pub fn lt(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Lt, self, rhs.into_operand())
    }

    pub fn le(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Le, self, rhs.into_operand())
    }

    pub fn gt(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Gt, self, rhs.into_operand())
    }

    pub fn ge(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Ge, self, rhs.into_operand())
    }

    pub fn and_also(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::AndAlso, self, rhs)
    }

    pub fn or_else(self, rhs: Expr) -> Self {
        Self::binary(BinaryOp::OrElse, self, rhs)
    }

    pub fn negate(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn call(self, method: StringMethod, argument: impl IntoOperand) -> Self {
        Expr::Call {
            method,
            target: Box::new(self),
            argument: Box::new(argument.into_operand()),
        }
    }

    pub fn starts_with(self, argument: impl IntoOperand) -> Self {
        self.call(StringMethod::StartsWith, argument)
    }

    pub fn ends_with(self, argument: impl IntoOperand) -> Self {
        self.call(StringMethod::EndsWith, argument)
    }

    pub fn contains(self, argument: impl IntoOperand) -> Self {
        self.call(StringMethod::Contains, argument)
    }

    /// Replace every reference to `from` with `to`, returning a new tree
    pub fn rebind(&self, from: &Param, to: &Param) -> Expr {
        if from == to {
            return self.clone();
        }
        match self {
            Expr::Literal(value) => Expr::Literal(value.clone()),
            Expr::Parameter(p) if p == from => Expr::Parameter(to.clone()),
            Expr::Parameter(p) => Expr::Parameter(p.clone()),
            Expr::Member { target, field } => Expr::Member {
                target: Box::new(target.rebind(from, to)),
                field: field.clone(),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.rebind(from, to)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.rebind(from, to)),
                right: Box::new(right.rebind(from, to)),
            },
            Expr::Call {
                method,
                target,
                argument,
            } => Expr::Call {
                method: *method,
                target: Box::new(target.rebind(from, to)),
                argument: Box::new(argument.rebind(from, to)),
            },
        }
    }

    /// Visit every node in pre-order, left operand before right
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Parameter(_) => {}
            Expr::Member { target, .. } => target.walk(visit),
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Call {
                target, argument, ..
            } => {
                target.walk(visit);
                argument.walk(visit);
            }
        }
    }

    /// Distinct parameters referenced anywhere in the tree
    pub fn parameters(&self) -> Vec<Param> {
        let mut params: Vec<Param> = Vec::new();
        self.walk(&mut |node| {
            if let Expr::Parameter(p) = node
                && !params.contains(p)
            {
                params.push(p.clone());
            }
        });
        params
    }

    /// Literal values in pre-order, the order compiled slots are numbered in
    pub fn literals(&self) -> Vec<FieldValue> {
        let mut literals = Vec::new();
        self.walk(&mut |node| {
            if let Expr::Literal(value) = node {
                literals.push(value.clone());
            }
        });
        literals
    }

    /// Render the tree with literals replaced by numbered slots.
    ///
    /// Two trees that differ only in their literal values render the same
    /// shape. `bound` renders as `$p`; any other parameter keeps its name and
    /// id so unbound references never collide with bound ones.
    pub fn shape(&self, bound: &Param) -> String {
        let mut out = String::new();
        let mut slot = 0usize;
        self.write_shape(bound, &mut out, &mut slot);
        out
    }

    fn write_shape(&self, bound: &Param, out: &mut String, slot: &mut usize) {
        match self {
            Expr::Literal(_) => {
                out.push_str(&format!("${}", slot));
                *slot += 1;
            }
            Expr::Parameter(p) if p == bound => out.push_str("$p"),
            Expr::Parameter(p) => out.push_str(&format!("{}#{}", p.name(), p.id())),
            Expr::Member { target, field } => {
                target.write_shape(bound, out, slot);
                out.push('.');
                out.push_str(field);
            }
            Expr::Unary { operand, .. } => {
                out.push_str("!(");
                operand.write_shape(bound, out, slot);
                out.push(')');
            }
            Expr::Binary { op, left, right } => {
                out.push('(');
                left.write_shape(bound, out, slot);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                right.write_shape(bound, out, slot);
                out.push(')');
            }
            Expr::Call {
                method,
                target,
                argument,
            } => {
                target.write_shape(bound, out, slot);
                out.push('.');
                out.push_str(method.name());
                out.push('(');
                argument.write_shape(bound, out, slot);
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Parameter(p) => write!(f, "{}", p),
            Expr::Member { target, field } => write!(f, "{}.{}", target, field),
            Expr::Unary { operand, .. } => write!(f, "!({})", operand),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Call {
                method,
                target,
                argument,
            } => write!(f, "{}.{}({})", target, method.name(), argument),
        }
    }
}
