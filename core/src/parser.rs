//! Pest-based parser for rule predicates
//!
//! This module converts predicate source text into [`Expr`] trees. The parser
//! uses the Pest parsing library with a grammar defined in
//! `../grammar/predicate.pest`.

// Allow missing docs for Pest-generated code
#![allow(missing_docs)]

use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::GeneratorError;

/// Pest parser for predicate syntax
#[allow(missing_docs)]
#[derive(Parser)]
#[grammar = "../grammar/predicate.pest"]
pub struct PredicateParser;

/// Type alias for Pest parsing pairs
type Pair<'i> = pest::iterators::Pair<'i, Rule>;

type Result<T> = std::result::Result<T, GeneratorError>;

impl PredicateParser {
    /// Parse a complete predicate expression
    ///
    /// # Arguments
    ///
    /// * `input` - The predicate source text
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidRule` with the line and column of the
    /// first syntax error.
    pub fn parse_predicate(input: &str) -> Result<Expr> {
        let pairs = Self::parse(Rule::predicate, input).map_err(|e| {
            let (line, column) = match e.line_col {
                pest::error::LineColLocation::Pos(pos) => pos,
                pest::error::LineColLocation::Span(start, _) => start,
            };
            GeneratorError::invalid_rule_at(input, "syntax error", line, column)
        })?;

        for pair in pairs {
            if pair.as_rule() == Rule::predicate {
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::disjunction => return Self::build_disjunction(input, inner),
                        Rule::EOI => break,
                        other => {
                            return Err(Self::unexpected(input, &inner, other));
                        }
                    }
                }
            }
        }

        Err(GeneratorError::invalid_rule(input, "empty predicate"))
    }

    /// Helper function to create a `Spanned<T>` from a Pest pair
    fn create_spanned<T>(pair: &Pair<'_>, value: T) -> Spanned<T> {
        let span_info = pair.as_span();
        let (line, column) = span_info.start_pos().line_col();
        let span = Span::new(span_info.start(), span_info.end(), line, column);
        Spanned::new(value, span)
    }

    fn unexpected(input: &str, pair: &Pair<'_>, rule: Rule) -> GeneratorError {
        let (line, column) = pair.as_span().start_pos().line_col();
        GeneratorError::invalid_rule_at(input, format!("unexpected {rule:?}"), line, column)
    }

    fn build_disjunction(input: &str, pair: Pair<'_>) -> Result<Expr> {
        let mut terms = pair
            .into_inner()
            .map(|p| Self::build_conjunction(input, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn build_conjunction(input: &str, pair: Pair<'_>) -> Result<Expr> {
        let mut terms = pair
            .into_inner()
            .map(|p| Self::build_negation(input, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn build_negation(input: &str, pair: Pair<'_>) -> Result<Expr> {
        let mut negations = 0usize;
        let mut expr = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::not_op => negations += 1,
                Rule::relation => expr = Some(Self::build_relation(input, inner)?),
                other => return Err(Self::unexpected(input, &inner, other)),
            }
        }
        let mut expr = expr.ok_or_else(|| GeneratorError::invalid_rule(input, "missing operand"))?;
        for _ in 0..negations {
            expr = Expr::Not(Box::new(expr));
        }
        Ok(expr)
    }

    fn build_relation(input: &str, pair: Pair<'_>) -> Result<Expr> {
        let mut parts = pair.into_inner();
        let lhs = match parts.next() {
            Some(p) => Self::build_operand(input, p)?,
            None => return Err(GeneratorError::invalid_rule(input, "missing operand")),
        };

        let Some(tail) = parts.next() else {
            return Ok(lhs);
        };

        match tail.as_rule() {
            Rule::comparison => {
                let mut inner = tail.into_inner();
                let (Some(op_pair), Some(rhs_pair)) = (inner.next(), inner.next()) else {
                    return Err(GeneratorError::invalid_rule(input, "incomplete comparison"));
                };
                let op = match op_pair.as_str() {
                    "==" => CompareOp::Eq,
                    "!=" => CompareOp::Ne,
                    "<" => CompareOp::Lt,
                    "<=" => CompareOp::Le,
                    ">" => CompareOp::Gt,
                    ">=" => CompareOp::Ge,
                    other => {
                        return Err(GeneratorError::invalid_rule(
                            input,
                            format!("unknown operator '{other}'"),
                        ));
                    }
                };
                Ok(Expr::Compare {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(Self::build_operand(input, rhs_pair)?),
                })
            }
            Rule::membership => {
                let mut negated = false;
                let mut items = Vec::new();
                for inner in tail.into_inner() {
                    match inner.as_rule() {
                        Rule::negated => negated = true,
                        Rule::kw_in => {}
                        Rule::list => items = Self::build_list(input, inner)?,
                        other => return Err(Self::unexpected(input, &inner, other)),
                    }
                }
                Ok(Expr::In {
                    value: Box::new(lhs),
                    items,
                    negated,
                })
            }
            other => Err(Self::unexpected(input, &tail, other)),
        }
    }

    fn build_operand(input: &str, pair: Pair<'_>) -> Result<Expr> {
        let Some(inner) = pair.into_inner().next() else {
            return Err(GeneratorError::invalid_rule(input, "missing operand"));
        };
        match inner.as_rule() {
            Rule::literal => Ok(Expr::Literal(Self::build_literal(input, inner)?)),
            Rule::identifier => Ok(Expr::Var(Self::create_spanned(
                &inner,
                inner.as_str().to_string(),
            ))),
            Rule::disjunction => Self::build_disjunction(input, inner),
            other => Err(Self::unexpected(input, &inner, other)),
        }
    }

    fn build_literal(input: &str, pair: Pair<'_>) -> Result<Literal> {
        let Some(inner) = pair.into_inner().next() else {
            return Err(GeneratorError::invalid_rule(input, "missing literal"));
        };
        match inner.as_rule() {
            Rule::boolean => Ok(Literal::Bool(inner.as_str() == "true")),
            Rule::integer => Ok(Literal::Int(Self::parse_integer(input, &inner)?)),
            Rule::string => Ok(Literal::Text(
                inner
                    .into_inner()
                    .next()
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
            )),
            other => Err(Self::unexpected(input, &inner, other)),
        }
    }

    fn build_list(input: &str, pair: Pair<'_>) -> Result<Vec<ListItem>> {
        let mut items = Vec::new();
        for item in pair.into_inner() {
            let Some(inner) = item.into_inner().next() else {
                continue;
            };
            match inner.as_rule() {
                Rule::range => {
                    let mut bounds = inner.into_inner();
                    let (Some(lo), Some(hi)) = (bounds.next(), bounds.next()) else {
                        return Err(GeneratorError::invalid_rule(input, "incomplete range"));
                    };
                    let lo_value = Self::parse_integer(input, &lo)?;
                    let hi_value = Self::parse_integer(input, &hi)?;
                    if hi_value < lo_value {
                        let (line, column) = lo.as_span().start_pos().line_col();
                        return Err(GeneratorError::invalid_rule_at(
                            input,
                            format!("empty range {lo_value}..={hi_value}"),
                            line,
                            column,
                        ));
                    }
                    items.push(ListItem::Range {
                        lo: lo_value,
                        hi: hi_value,
                    });
                }
                Rule::literal => items.push(ListItem::Value(Self::build_literal(input, inner)?)),
                other => return Err(Self::unexpected(input, &inner, other)),
            }
        }
        Ok(items)
    }

    fn parse_integer(input: &str, pair: &Pair<'_>) -> Result<i64> {
        pair.as_str().parse::<i64>().map_err(|_| {
            let (line, column) = pair.as_span().start_pos().line_col();
            GeneratorError::invalid_rule_at(input, "integer out of range", line, column)
        })
    }
}
