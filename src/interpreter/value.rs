// File: src/interpreter/value.rs
//
// Runtime value types for the parseq language.

use std::fmt;
use std::sync::Arc;

use crate::errors::RuntimeError;

/// A runtime value.
///
/// Sequences are fully materialized lists of integer-valued floats, shared
/// behind an `Arc` so concurrent tasks can read them without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    Sequence(Arc<Vec<f64>>),
}

impl Value {
    pub fn sequence(elements: Vec<f64>) -> Self {
        Value::Sequence(Arc::new(elements))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Sequence(_) => "sequence",
        }
    }

    /// Extract a number or fail with a TypeMismatch naming `context`
    pub fn expect_number(&self, context: &str) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::type_mismatch(context, "a number", other.type_name())),
        }
    }

    pub fn expect_sequence(&self, context: &str) -> Result<Arc<Vec<f64>>, RuntimeError> {
        match self {
            Value::Sequence(elements) => Ok(Arc::clone(elements)),
            other => Err(RuntimeError::type_mismatch(context, "a sequence", other.type_name())),
        }
    }

    /// Unary minus. Strings only get a textual prefix.
    pub fn negate(&self) -> Value {
        match self {
            Value::Number(n) => Value::Number(-n),
            Value::Str(s) => Value::Str(format!("-{}", s)),
            Value::Sequence(elements) => Value::sequence(elements.iter().map(|e| -e).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Sequence(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("]")
            }
        }
    }
}
