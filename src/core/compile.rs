//! Compilation of predicate trees into evaluable closures
//!
//! A compiled predicate is split in two:
//! - an [`Evaluator`], a closure tree built from the *shape* of the predicate,
//!   in which every literal is read from a numbered slot
//! - the literal table of one particular tree
//!
//! Evaluators never close over literal values, so sharing them between trees
//! of the same shape (e.g. the same tenant filter for two different tenants)
//! cannot leak one call's literal into another call. Sharing goes through
//! [`PredicateCache`] and is enabled by `FilterConfig::cache_compiled_predicates`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::config::FilterConfig;
use crate::core::error::{FilterError, Result};
use crate::core::expr::{BinaryOp, Expr, Param, StringMethod, UnaryOp};
use crate::core::field::FieldValue;
use crate::core::predicate::Predicate;
use crate::core::record::Record;

/// A compiled predicate body: evaluates a record against a literal table
pub type Evaluator<T> = Arc<dyn Fn(&T, &[FieldValue]) -> Result<FieldValue> + Send + Sync>;

/// An evaluator paired with the literals of the tree it was compiled from
pub struct CompiledPredicate<T> {
    evaluator: Evaluator<T>,
    literals: Arc<[FieldValue]>,
}

impl<T> Clone for CompiledPredicate<T> {
    fn clone(&self) -> Self {
        Self {
            evaluator: Arc::clone(&self.evaluator),
            literals: Arc::clone(&self.literals),
        }
    }
}

impl<T: Record> CompiledPredicate<T> {
    /// Compile using the process-wide configuration and cache
    pub fn compile(predicate: &Predicate<T>) -> Self {
        if FilterConfig::current().cache_compiled_predicates {
            Self::compile_with(predicate, Some(PredicateCache::global()))
        } else {
            Self::compile_with(predicate, None)
        }
    }

    /// Compile, sharing the evaluator through `cache` when one is given
    pub fn compile_with(predicate: &Predicate<T>, cache: Option<&PredicateCache>) -> Self {
        let literals: Arc<[FieldValue]> = predicate.body().literals().into();
        let evaluator = match cache {
            Some(cache) => {
                let shape = predicate.body().shape(predicate.param());
                cache.get_or_compile::<T>(shape, || build_evaluator(predicate))
            }
            None => build_evaluator(predicate),
        };
        Self {
            evaluator,
            literals,
        }
    }

    /// Evaluate the body against a record
    pub fn evaluate(&self, record: &T) -> Result<FieldValue> {
        (self.evaluator)(record, &self.literals)
    }

    /// Evaluate the body and require a boolean result
    pub fn matches(&self, record: &T) -> Result<bool> {
        match self.evaluate(record)? {
            FieldValue::Boolean(b) => Ok(b),
            other => Err(FilterError::type_mismatch(
                "predicate",
                format!("expected a boolean result, got {}", other.kind_name()),
            )),
        }
    }

    /// The literal table this compiled form evaluates with
    pub fn literals(&self) -> &[FieldValue] {
        &self.literals
    }

    /// True when both compiled forms run the same evaluator
    pub fn shares_evaluator(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.evaluator, &b.evaluator)
    }
}

/// Process-wide cache of evaluators keyed by record type and tree shape
pub struct PredicateCache {
    entries: RwLock<HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>>,
}

impl PredicateCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The cache used by [`CompiledPredicate::compile`]
    pub fn global() -> &'static PredicateCache {
        static CACHE: OnceLock<PredicateCache> = OnceLock::new();
        CACHE.get_or_init(PredicateCache::new)
    }

    /// Number of cached shapes
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn get_or_compile<T: Record>(
        &self,
        shape: String,
        compile: impl FnOnce() -> Evaluator<T>,
    ) -> Evaluator<T> {
        let key = (TypeId::of::<T>(), shape);

        if let Some(evaluator) = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<Evaluator<T>>())
        {
            tracing::trace!(record = T::type_name(), shape = %key.1, "compiled predicate cache hit");
            return Arc::clone(evaluator);
        }

        tracing::trace!(record = T::type_name(), shape = %key.1, "compiled predicate cache miss");
        // Compiled outside the lock; a racing thread may compile the same
        // shape, and whichever entry lands first is kept.
        let compiled = compile();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry(key)
            .or_insert_with(|| Arc::new(compiled.clone()) as Arc<dyn Any + Send + Sync>);
        entry
            .downcast_ref::<Evaluator<T>>()
            .map(Arc::clone)
            .unwrap_or(compiled)
    }
}

impl Default for PredicateCache {
    fn default() -> Self {
        Self::new()
    }
}

type Node<T> = Evaluator<T>;

fn node<T, F>(f: F) -> Node<T>
where
    F: Fn(&T, &[FieldValue]) -> Result<FieldValue> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn build_evaluator<T: Record>(predicate: &Predicate<T>) -> Evaluator<T> {
    let mut slot = 0usize;
    compile_node::<T>(predicate.body(), predicate.param(), &mut slot)
}

// Slots are numbered in the same pre-order, left-to-right walk that
// `Expr::literals` and `Expr::shape` use.
fn compile_node<T: Record>(expr: &Expr, bound: &Param, slot: &mut usize) -> Node<T> {
    match expr {
        Expr::Literal(_) => {
            let index = *slot;
            *slot += 1;
            node(move |_, literals| {
                literals.get(index).cloned().ok_or_else(|| {
                    FilterError::type_mismatch("literal", format!("missing literal slot {}", index))
                })
            })
        }
        Expr::Parameter(p) if p == bound => node(|_, _| {
            Err(FilterError::type_mismatch(
                "parameter",
                "a record cannot be used as a value; access one of its members",
            ))
        }),
        Expr::Parameter(p) => unbound(p),
        Expr::Member { target, field } => match target.as_ref() {
            Expr::Parameter(p) if p == bound => {
                let field = field.clone();
                node(move |record: &T, _| {
                    record
                        .field_value(&field)
                        .ok_or_else(|| FilterError::UnknownField {
                            type_name: T::type_name(),
                            field: field.clone(),
                        })
                })
            }
            Expr::Parameter(p) => unbound(p),
            _ => {
                let field = field.clone();
                node(move |_, _| {
                    Err(FilterError::type_mismatch(
                        "member access",
                        format!("'{}' must be accessed on the bound record", field),
                    ))
                })
            }
        },
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => {
            let operand = compile_node::<T>(operand, bound, slot);
            node(move |record, literals| {
                let value = operand(record, literals)?;
                Ok(FieldValue::Boolean(!expect_bool("!", value)?))
            })
        }
        Expr::Binary { op, left, right } => {
            let op = *op;
            let left = compile_node::<T>(left, bound, slot);
            let right = compile_node::<T>(right, bound, slot);
            match op {
                BinaryOp::AndAlso => node(move |record, literals| {
                    if !expect_bool("&&", left(record, literals)?)? {
                        return Ok(FieldValue::Boolean(false));
                    }
                    Ok(FieldValue::Boolean(expect_bool("&&", right(record, literals)?)?))
                }),
                BinaryOp::OrElse => node(move |record, literals| {
                    if expect_bool("||", left(record, literals)?)? {
                        return Ok(FieldValue::Boolean(true));
                    }
                    Ok(FieldValue::Boolean(expect_bool("||", right(record, literals)?)?))
                }),
                _ => node(move |record, literals| {
                    let l = left(record, literals)?;
                    let r = right(record, literals)?;
                    Ok(FieldValue::Boolean(compare(op, &l, &r)))
                }),
            }
        }
        Expr::Call {
            method,
            target,
            argument,
        } => {
            let method = *method;
            let target = compile_node::<T>(target, bound, slot);
            let argument = compile_node::<T>(argument, bound, slot);
            node(move |record, literals| {
                let haystack = target(record, literals)?;
                let needle = argument(record, literals)?;
                call(method, &haystack, &needle)
            })
        }
    }
}

fn unbound<T: Record>(param: &Param) -> Node<T> {
    let name = param.name().to_string();
    node(move |_, _| Err(FilterError::UnboundParameter { name: name.clone() }))
}

fn expect_bool(operation: &str, value: FieldValue) -> Result<bool> {
    match value {
        FieldValue::Boolean(b) => Ok(b),
        other => Err(FilterError::type_mismatch(
            operation,
            format!("expected a boolean operand, got {}", other.kind_name()),
        )),
    }
}

// Ordering comparisons between incompatible kinds (or against null) are false.
fn compare(op: BinaryOp, left: &FieldValue, right: &FieldValue) -> bool {
    use std::cmp::Ordering;

    match op {
        BinaryOp::Eq => left.loose_eq(right),
        BinaryOp::Ne => !left.loose_eq(right),
        BinaryOp::Lt => left.compare(right) == Some(Ordering::Less),
        BinaryOp::Le => matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => left.compare(right) == Some(Ordering::Greater),
        BinaryOp::Ge => matches!(
            left.compare(right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        BinaryOp::AndAlso | BinaryOp::OrElse => false,
    }
}

fn call(method: StringMethod, haystack: &FieldValue, needle: &FieldValue) -> Result<FieldValue> {
    let needle = match needle {
        FieldValue::String(s) => s,
        other => {
            return Err(FilterError::type_mismatch(
                method.name(),
                format!("expected a string argument, got {}", other.kind_name()),
            ));
        }
    };
    let matched = match haystack {
        FieldValue::String(s) => match method {
            StringMethod::StartsWith => s.starts_with(needle.as_str()),
            StringMethod::EndsWith => s.ends_with(needle.as_str()),
            StringMethod::Contains => s.contains(needle.as_str()),
        },
        FieldValue::Null => false,
        other => {
            return Err(FilterError::type_mismatch(
                method.name(),
                format!("expected a string target, got {}", other.kind_name()),
            ));
        }
    };
    Ok(FieldValue::Boolean(matched))
}
