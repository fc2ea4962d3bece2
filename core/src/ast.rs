//! Abstract Syntax Tree (AST) for rule predicates
//!
//! This module defines the AST structures generated directly from Pest parsing
//! of predicate expressions such as `include_d && year not in [1965..=1967]`.
//! Variables keep their span so evaluation errors can point at the offending
//! name.

use serde::{Deserialize, Serialize};

/// Span information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start position (byte offset)
    pub start: usize,
    /// End position (byte offset)
    pub end: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// AST node with span information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    /// The actual node value
    pub value: T,
    /// Location in source
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Create a new spanned node
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Double-quoted string
    Text(String),
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Operator as written in source
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Member of an `in` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListItem {
    /// Single value
    Value(Literal),
    /// Inclusive integer range `lo..=hi`
    Range {
        /// Lower bound
        lo: i64,
        /// Upper bound
        hi: i64,
    },
}

/// Predicate expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Option name or `year`
    Var(Spanned<String>),
    /// Logical negation
    Not(Box<Expr>),
    /// Conjunction of two or more terms
    And(Vec<Expr>),
    /// Disjunction of two or more terms
    Or(Vec<Expr>),
    /// Binary comparison
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// List membership, `x in [..]` or `x not in [..]`
    In {
        /// Tested value
        value: Box<Expr>,
        /// Candidate values and ranges
        items: Vec<ListItem>,
        /// Whether the test is `not in`
        negated: bool,
    },
}

impl Expr {
    /// Collect every variable referenced by this expression
    pub fn variables(&self) -> Vec<&Spanned<String>> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a Spanned<String>>) {
        match self {
            Self::Literal(_) => {}
            Self::Var(name) => out.push(name),
            Self::Not(inner) => inner.collect_variables(out),
            Self::And(terms) | Self::Or(terms) => {
                for term in terms {
                    term.collect_variables(out);
                }
            }
            Self::Compare { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Self::In { value, .. } => value.collect_variables(out),
        }
    }
}
