//! Compiled rule predicates and their evaluation
//!
//! A [`Predicate`] keeps its source text next to the parsed [`Expr`] so it
//! can be written back out unchanged and so errors quote what the template
//! author wrote. Predicates deserialize from either a string or a YAML
//! boolean.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{CompareOp, Expr, ListItem, Literal, Spanned};
use crate::error::GeneratorError;
use crate::options::{OptionSchema, OptionSet, OptionValue, YEAR_VARIABLE};
use crate::parser::PredicateParser;

/// Values a predicate can evaluate to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value<'a> {
    Bool(bool),
    Int(i64),
    Text(&'a str),
    Open,
}

impl Value<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Text(_) => "string",
            Self::Open => "open",
        }
    }
}

impl<'a> From<&'a Literal> for Value<'a> {
    fn from(literal: &'a Literal) -> Self {
        match literal {
            Literal::Bool(b) => Self::Bool(*b),
            Literal::Int(i) => Self::Int(*i),
            Literal::Text(s) => Self::Text(s),
        }
    }
}

impl<'a> From<&'a OptionValue> for Value<'a> {
    fn from(value: &'a OptionValue) -> Self {
        match value {
            OptionValue::Bool(b) => Self::Bool(*b),
            OptionValue::Int(i) => Self::Int(*i),
            OptionValue::Text(s) => Self::Text(s),
            OptionValue::Open => Self::Open,
        }
    }
}

/// Bindings visible to a predicate
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Resolved options of the instance being generated
    pub options: &'a OptionSet,
    /// Current year, when evaluating inside the year sweep
    pub year: Option<i32>,
}

impl<'a> EvalContext<'a> {
    /// Context without a current year
    pub fn new(options: &'a OptionSet) -> Self {
        Self {
            options,
            year: None,
        }
    }

    /// Same options, bound to `year`
    #[must_use]
    pub fn at_year(self, year: i32) -> Self {
        Self {
            year: Some(year),
            ..self
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PredicateSource {
    Text(String),
    Bool(bool),
}

/// Boolean expression over options and the current year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredicateSource", into = "String")]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Parse predicate source text
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidRule` on syntax errors.
    pub fn parse(source: impl Into<String>) -> Result<Self, GeneratorError> {
        let source = source.into();
        let expr = PredicateParser::parse_predicate(&source)?;
        Ok(Self { source, expr })
    }

    /// Predicate that always holds
    pub fn always() -> Self {
        Self {
            source: "true".to_string(),
            expr: Expr::Literal(Literal::Bool(true)),
        }
    }

    /// Source text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed expression
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Whether this predicate is the literal `true`
    pub fn is_always(&self) -> bool {
        self.expr == Expr::Literal(Literal::Bool(true))
    }

    /// Whether the expression reads the current year
    pub fn uses_year(&self) -> bool {
        self.expr
            .variables()
            .iter()
            .any(|v| v.value == YEAR_VARIABLE)
    }

    /// Evaluate against a context
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidRule` when the predicate references an
    /// unknown option, reads `year` outside the year sweep, mixes value
    /// kinds, or does not produce a boolean.
    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<bool, GeneratorError> {
        match self.eval_expr(&self.expr, ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.error(format!(
                "expected a boolean result, got {}",
                other.kind()
            ))),
        }
    }

    /// Check every variable against an option schema
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidRule` for undeclared options, and for
    /// `year` when `year_in_scope` is false.
    pub fn check(&self, schema: &OptionSchema, year_in_scope: bool) -> Result<(), GeneratorError> {
        for var in self.expr.variables() {
            if var.value == YEAR_VARIABLE {
                if !year_in_scope {
                    return Err(self.error_at(var, "'year' is only available inside the year sweep"));
                }
            } else if !schema.contains(&var.value) {
                return Err(self.error_at(var, format!("unknown option '{}'", var.value)));
            }
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> GeneratorError {
        GeneratorError::invalid_rule(&self.source, message)
    }

    fn error_at(&self, var: &Spanned<String>, message: impl Into<String>) -> GeneratorError {
        GeneratorError::invalid_rule_at(&self.source, message, var.span.line, var.span.column)
    }

    fn eval_bool<'a>(&'a self, expr: &'a Expr, ctx: &EvalContext<'a>) -> Result<bool, GeneratorError> {
        match self.eval_expr(expr, ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.error(format!("expected a boolean operand, got {}", other.kind()))),
        }
    }

    fn eval_expr<'a>(&'a self, expr: &'a Expr, ctx: &EvalContext<'a>) -> Result<Value<'a>, GeneratorError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::Var(name) => {
                if name.value == YEAR_VARIABLE {
                    return ctx.year.map(|y| Value::Int(i64::from(y))).ok_or_else(|| {
                        self.error_at(name, "'year' is only available inside the year sweep")
                    });
                }
                ctx.options
                    .get(&name.value)
                    .map(Value::from)
                    .ok_or_else(|| self.error_at(name, format!("unknown option '{}'", name.value)))
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval_bool(inner, ctx)?)),
            Expr::And(terms) => {
                for term in terms {
                    if !self.eval_bool(term, ctx)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expr::Or(terms) => {
                for term in terms {
                    if self.eval_bool(term, ctx)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval_expr(lhs, ctx)?;
                let rhs = self.eval_expr(rhs, ctx)?;
                self.compare(*op, &lhs, &rhs).map(Value::Bool)
            }
            Expr::In {
                value,
                items,
                negated,
            } => {
                let value = self.eval_expr(value, ctx)?;
                let mut found = false;
                for item in items {
                    let hit = match item {
                        ListItem::Value(literal) => {
                            self.compare(CompareOp::Eq, &value, &Value::from(literal))?
                        }
                        ListItem::Range { lo, hi } => match value {
                            Value::Int(v) => (*lo..=*hi).contains(&v),
                            ref other => {
                                return Err(self.error(format!(
                                    "range membership needs an integer, got {}",
                                    other.kind()
                                )));
                            }
                        },
                    };
                    if hit {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Bool(found != *negated))
            }
        }
    }

    fn compare(&self, op: CompareOp, lhs: &Value<'_>, rhs: &Value<'_>) -> Result<bool, GeneratorError> {
        if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
            return Ok(match op {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
            });
        }
        if lhs.kind() != rhs.kind() {
            return Err(self.error(format!(
                "cannot compare {} with {}",
                lhs.kind(),
                rhs.kind()
            )));
        }
        match op {
            CompareOp::Eq => Ok(lhs == rhs),
            CompareOp::Ne => Ok(lhs != rhs),
            _ => Err(self.error(format!(
                "operator {} needs integers, got {}",
                op.symbol(),
                lhs.kind()
            ))),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<PredicateSource> for Predicate {
    type Error = GeneratorError;

    fn try_from(source: PredicateSource) -> Result<Self, Self::Error> {
        match source {
            PredicateSource::Text(text) => Self::parse(text),
            PredicateSource::Bool(true) => Ok(Self::always()),
            PredicateSource::Bool(false) => Ok(Self {
                source: "false".to_string(),
                expr: Expr::Literal(Literal::Bool(false)),
            }),
        }
    }
}

impl From<Predicate> for String {
    fn from(predicate: Predicate) -> Self {
        predicate.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionDecl;
    use indexmap::IndexMap;

    fn options() -> OptionSet {
        let mut schema = OptionSchema::new();
        schema.declare("include_p", OptionDecl::boolean(true)).unwrap();
        schema.declare("include_d", OptionDecl::boolean(false)).unwrap();
        schema
            .declare("stop_year", OptionDecl::integer(OptionValue::Open).open_ended())
            .unwrap();
        schema.resolve(&IndexMap::new()).unwrap()
    }

    fn eval(source: &str, year: Option<i32>) -> Result<bool, GeneratorError> {
        let options = options();
        let ctx = EvalContext {
            options: &options,
            year,
        };
        Predicate::parse(source)?.eval(&ctx)
    }

    #[test]
    fn test_boolean_options() {
        assert_eq!(eval("include_p && !include_d", None), Ok(true));
        assert_eq!(eval("include_d || false", None), Ok(false));
    }

    #[test]
    fn test_year_comparisons() {
        assert_eq!(eval("year >= 1980 && year != 1995", Some(1990)), Ok(true));
        assert_eq!(eval("year not in [1965..=1967]", Some(1966)), Ok(false));
        assert_eq!(eval("year in [1950, 1955..=1957]", Some(1950)), Ok(true));
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        assert_eq!(eval("include_d && year > 1900", None), Ok(false));
    }

    #[test]
    fn test_year_outside_sweep_is_an_error() {
        assert!(matches!(
            eval("year > 1900", None),
            Err(GeneratorError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_unknown_option_is_an_error() {
        assert!(eval("include_w", None).is_err());
    }

    #[test]
    fn test_non_boolean_result_is_an_error() {
        assert!(eval("1909", None).is_err());
        assert!(eval("include_p < 3", None).is_err());
    }

    #[test]
    fn test_check_against_schema() {
        let mut schema = OptionSchema::new();
        schema.declare("include_p", OptionDecl::boolean(true)).unwrap();
        let p = Predicate::parse("include_p && year > 2000").unwrap();
        assert!(p.check(&schema, true).is_ok());
        assert!(p.check(&schema, false).is_err());
        assert!(p.uses_year());
        let q = Predicate::parse("include_s").unwrap();
        assert!(q.check(&schema, true).is_err());
    }

    #[test]
    fn test_deserialize_from_bool_and_string() {
        let p: Predicate = serde_yaml::from_str("true").unwrap();
        assert!(p.is_always());
        let q: Predicate = serde_yaml::from_str("\"year < 1980\"").unwrap();
        assert_eq!(q.source(), "year < 1980");
        assert!(serde_yaml::from_str::<Predicate>("\"year <\"").is_err());
    }
}
