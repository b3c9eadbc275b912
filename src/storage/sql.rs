//! Translation of predicate trees into parameterized SQL
//!
//! The output is a `WHERE` fragment using numbered `?N` placeholders plus the
//! values to bind, in placeholder order:
//!
//! ```rust,ignore
//! let filter = SqlFilter::translate(&scoped)?;
//! // filter.clause  == r#"("status" = ?1 AND "tenant_id" = ?2)"#
//! // filter.params  == [FieldValue::String("open"), FieldValue::String("acme")]
//! let sql = format!("SELECT * FROM invoices WHERE {} ORDER BY {}", filter.clause, order_by_clause(&order));
//! ```

use crate::core::error::{FilterError, Result};
use crate::core::expr::{BinaryOp, Expr, Param, StringMethod, UnaryOp};
use crate::core::field::FieldValue;
use crate::core::predicate::{OrderBy, Predicate};
use crate::core::record::Record;

/// A translated `WHERE` clause and its bind values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<FieldValue>,
}

impl SqlFilter {
    /// Translate a predicate over `T`.
    ///
    /// Only members of the predicate's own parameter are translatable, and
    /// string calls need a literal argument.
    pub fn translate<T: Record>(predicate: &Predicate<T>) -> Result<Self> {
        let mut translator = Translator::<T> {
            param: predicate.param(),
            params: Vec::new(),
            _record: std::marker::PhantomData,
        };
        let clause = translator.condition(predicate.body())?;
        Ok(Self {
            clause,
            params: translator.params,
        })
    }
}

/// `"column" ASC` / `"column" DESC`
///
/// Nullable columns place NULL first when ascending and last when
/// descending, the same placement [`OrderBy::compare`] gives in memory.
pub fn order_by_clause<T>(order: &OrderBy<T>) -> String {
    let selector = order.selector();
    let column = quote_identifier(selector.field_name());
    let nullable = selector.descriptor().nullable;
    match (order.is_ascending(), nullable) {
        (true, false) => format!("{} ASC", column),
        (false, false) => format!("{} DESC", column),
        (true, true) => format!("{} ASC NULLS FIRST", column),
        (false, true) => format!("{} DESC NULLS LAST", column),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape LIKE metacharacters with a backslash
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

struct Translator<'a, T> {
    param: &'a Param,
    params: Vec<FieldValue>,
    _record: std::marker::PhantomData<fn(&T)>,
}

/// A translated operand and whether it can evaluate to NULL
struct Operand {
    sql: String,
    nullable: bool,
}

impl Operand {
    fn value(sql: String) -> Self {
        Self {
            sql,
            nullable: false,
        }
    }
}

// Every condition emitted here is two-valued: a NULL column makes the
// condition false, never unknown, so NOT/AND/OR agree with in-memory
// evaluation.
impl<T: Record> Translator<'_, T> {
    fn bind(&mut self, value: FieldValue) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn column(&self, target: &Expr, field: &str) -> Result<Operand> {
        match target {
            Expr::Parameter(p) if p == self.param => {}
            Expr::Parameter(p) => {
                return Err(FilterError::UnboundParameter {
                    name: p.name().to_string(),
                });
            }
            _ => {
                return Err(FilterError::type_mismatch(
                    format!(".{}", field),
                    "only members of the predicate parameter map to columns",
                ));
            }
        }
        let descriptor = T::field(field).ok_or_else(|| FilterError::UnknownField {
            type_name: T::type_name(),
            field: field.to_string(),
        })?;
        Ok(Operand {
            sql: quote_identifier(descriptor.name),
            nullable: descriptor.nullable,
        })
    }

    /// An expression in boolean position
    fn condition(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Literal(FieldValue::Boolean(true)) => Ok("1 = 1".to_string()),
            Expr::Literal(FieldValue::Boolean(false)) => Ok("1 = 0".to_string()),
            Expr::Literal(other) => Err(FilterError::type_mismatch(
                "where",
                format!("{} is not a condition", other),
            )),
            Expr::Parameter(p) => Err(FilterError::type_mismatch(
                "where",
                format!("parameter '{}' is not a condition", p),
            )),
            Expr::Member { target, field } => {
                let column = self.column(target, field)?;
                if column.nullable {
                    Ok(format!("({} IS NOT NULL AND {})", column.sql, column.sql))
                } else {
                    Ok(column.sql)
                }
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(format!("NOT ({})", self.condition(operand)?)),
            Expr::Binary { op, left, right } if op.is_logical() => {
                let left = self.condition(left)?;
                let right = self.condition(right)?;
                let keyword = if *op == BinaryOp::AndAlso { "AND" } else { "OR" };
                Ok(format!("({} {} {})", left, keyword, right))
            }
            Expr::Binary { op, left, right } => self.comparison(*op, left, right),
            Expr::Call {
                method,
                target,
                argument,
            } => self.like(*method, target, argument),
        }
    }

    fn comparison(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<String> {
        let null_test = match (left, right) {
            (operand, Expr::Literal(FieldValue::Null)) | (Expr::Literal(FieldValue::Null), operand) => {
                Some(operand)
            }
            _ => None,
        };
        if let Some(operand) = null_test {
            let operand = self.operand(operand)?;
            return match op {
                BinaryOp::Eq => Ok(format!("{} IS NULL", operand.sql)),
                BinaryOp::Ne => Ok(format!("{} IS NOT NULL", operand.sql)),
                // Ordering against NULL never holds.
                _ => Ok("1 = 0".to_string()),
            };
        }

        let left = self.operand(left)?;
        let right = self.operand(right)?;
        let nullable: Vec<&str> = [&left, &right]
            .into_iter()
            .filter(|operand| operand.nullable)
            .map(|operand| operand.sql.as_str())
            .collect();

        let symbol = match op {
            BinaryOp::Eq | BinaryOp::Ne => "=",
            other => other.symbol(),
        };
        let test = format!("{} {} {}", left.sql, symbol, right.sql);

        let clause = match (op, nullable.as_slice()) {
            (BinaryOp::Ne, []) => format!("{} <> {}", left.sql, right.sql),
            (_, []) => test,
            // NULL equals NULL in memory.
            (BinaryOp::Eq, [l, r]) => format!(
                "(({l} IS NULL AND {r} IS NULL) OR ({l} IS NOT NULL AND {r} IS NOT NULL AND {test}))"
            ),
            (BinaryOp::Ne, [l, r]) => format!(
                "NOT (({l} IS NULL AND {r} IS NULL) OR ({l} IS NOT NULL AND {r} IS NOT NULL AND {test}))"
            ),
            (BinaryOp::Ne, [column]) => {
                format!("({} IS NULL OR {} <> {})", column, left.sql, right.sql)
            }
            (_, columns) => {
                let guards: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{} IS NOT NULL", column))
                    .collect();
                format!("({} AND {})", guards.join(" AND "), test)
            }
        };
        Ok(clause)
    }

    fn operand(&mut self, expr: &Expr) -> Result<Operand> {
        match expr {
            Expr::Literal(value) => Ok(Operand::value(self.bind(value.clone()))),
            Expr::Member { target, field } => self.column(target, field),
            other => Ok(Operand::value(format!("({})", self.condition(other)?))),
        }
    }

    fn like(&mut self, method: StringMethod, target: &Expr, argument: &Expr) -> Result<String> {
        let column = self.operand(target)?;
        let Expr::Literal(FieldValue::String(needle)) = argument else {
            return Err(FilterError::type_mismatch(
                method.name(),
                "LIKE translation needs a string literal argument",
            ));
        };
        let needle = escape_like(needle);
        let pattern = match method {
            StringMethod::StartsWith => format!("{}%", needle),
            StringMethod::EndsWith => format!("%{}", needle),
            StringMethod::Contains => format!("%{}%", needle),
        };
        let placeholder = self.bind(FieldValue::String(pattern));
        let like = format!("{} LIKE {} ESCAPE '\\'", column.sql, placeholder);
        if column.nullable {
            Ok(format!("({} IS NOT NULL AND {})", column.sql, like))
        } else {
            Ok(like)
        }
    }
}
