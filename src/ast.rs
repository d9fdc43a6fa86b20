// File: src/ast.rs
//
// Abstract Syntax Tree (AST) definitions for the parseq language.
//
// Expressions (Expr) compute values, statements (Stmt) are the top-level
// actions of a program. Interior expression nodes hold their children
// behind `Arc` so evaluation tasks can share read-only subtrees; the tree
// is never mutated after parsing.

use std::fmt;
use std::sync::Arc;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply | BinaryOperator::Divide => 2,
            BinaryOperator::Power => 3,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOperator::Power)
    }

    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOperator::Add => left + right,
            BinaryOperator::Subtract => left - right,
            BinaryOperator::Multiply => left * right,
            BinaryOperator::Divide => left / right,
            BinaryOperator::Power => left.powf(right),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Identifier(String),
    UnaryMinus(Arc<Expr>),
    BinaryOp {
        left: Arc<Expr>,
        op: BinaryOperator,
        right: Arc<Expr>,
    },
    /// `{start, end}` inclusive integer range
    Sequence {
        start: Arc<Expr>,
        end: Arc<Expr>,
    },
    /// `map(sequence, param -> body)`
    Map {
        sequence: Arc<Expr>,
        param: String,
        body: Arc<Expr>,
    },
    /// `reduce(sequence, neutral, accumulator element -> body)`
    Reduce {
        sequence: Arc<Expr>,
        neutral: Arc<Expr>,
        params: (String, String),
        body: Arc<Expr>,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp { left: Arc::new(left), op, right: Arc::new(right) }
    }

    /// Nodes that evaluate without recursing into children
    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Number(_) | Expr::Identifier(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl { name: String, value: Arc<Expr> },
    Out(Arc<Expr>),
    Print(String),
}

/// Renders source text that parses back to the same tree. Operands are
/// parenthesized only where precedence or associativity require it, so the
/// text nests no deeper than the tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Identifier(name) => f.write_str(name),
            Expr::UnaryMinus(operand) => write!(f, "-({})", operand),
            Expr::BinaryOp { left, op, right } => {
                write_operand(f, left, *op, false)?;
                write!(f, " {} ", op)?;
                write_operand(f, right, *op, true)
            }
            Expr::Sequence { start, end } => write!(f, "{{{}, {}}}", start, end),
            Expr::Map { sequence, param, body } => write!(f, "map({}, {} -> {})", sequence, param, body),
            Expr::Reduce { sequence, neutral, params, body } => {
                write!(f, "reduce({}, {}, {} {} -> {})", sequence, neutral, params.0, params.1, body)
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::VarDecl { name, value } => write!(f, "var {} = {}", name, value),
            Stmt::Out(expr) => write!(f, "out {}", expr),
            Stmt::Print(text) => {
                f.write_str("print \"")?;
                for c in text.chars() {
                    match c {
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '"' | '\\' => write!(f, "\\{}", c)?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter, operand: &Expr, parent: BinaryOperator, is_right: bool) -> fmt::Result {
    let needs_parens = match operand {
        Expr::BinaryOp { op, .. } => {
            op.precedence() < parent.precedence()
                || (op.precedence() == parent.precedence() && is_right != parent.is_right_associative())
        }
        _ => false,
    };
    if needs_parens {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}
