// File: src/interpreter/environment.rs
//
// Variable storage for the parseq interpreter.
//
// Environment owns the global bindings of one run and is only written by the
// top-level statement loop. Scope is the read-only view handed to expression
// evaluation: a snapshot of the globals, optionally overlaid with lambda
// parameter frames. Overlays never touch the frames underneath them.

use std::collections::HashMap;
use std::sync::Arc;

use super::value::Value;

/// Global bindings of a single run
#[derive(Clone, Debug, Default)]
pub struct Environment {
    globals: Arc<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine a global variable
    ///
    /// Scopes handed out earlier keep seeing the old bindings.
    pub fn define(&mut self, name: String, value: Value) {
        Arc::make_mut(&mut self.globals).insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    /// Global variable names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read-only scope over the current globals
    pub fn scope(&self) -> Scope {
        Scope { frame: Arc::clone(&self.globals), parent: None }
    }
}

/// Lexical scope used during expression evaluation
///
/// Lookups search from the innermost frame outward, so lambda parameters
/// shadow globals of the same name for the duration of the body only.
///
/// ```ignore
/// let mut env = Environment::new();
/// env.define("x".to_string(), Value::Number(10.0));
///
/// let inner = env.scope().overlay([("x".to_string(), Value::Number(1.0))]);
/// assert_eq!(inner.get("x"), Some(Value::Number(1.0)));
/// assert_eq!(env.scope().get("x"), Some(Value::Number(10.0)));
/// ```
#[derive(Clone, Debug)]
pub struct Scope {
    frame: Arc<HashMap<String, Value>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// New scope whose innermost frame holds `bindings`
    pub fn overlay<I>(&self, bindings: I) -> Scope
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Scope {
            frame: Arc::new(bindings.into_iter().collect()),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = self;
        loop {
            if let Some(value) = scope.frame.get(name) {
                return Some(value.clone());
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return None,
            }
        }
    }

    /// Every visible name, sorted and deduplicated
    pub fn visible_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            names.extend(current.frame.keys().cloned());
            scope = current.parent.as_deref();
        }
        names.sort();
        names.dedup();
        names
    }
}
