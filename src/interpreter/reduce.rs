// File: src/interpreter/reduce.rs
//
// Evaluation strategies for `reduce(sequence, neutral, a b -> body)`.
//
// A lambda whose body is a single binary operation over exactly its two
// parameters is treated as associative. It is combined by divide-and-conquer:
// the neutral value is prepended to the elements, both halves are reduced
// concurrently and their results merged with the lambda. Every other lambda
// is applied as a sequential left fold starting from the neutral value.
//
// The check is purely syntactic. A flagged non-associative operator such as
// `a b -> a - b` gives a tree-shaped result that differs from the left fold.

use futures::future::FutureExt;
use log::debug;
use std::sync::Arc;

use super::environment::Scope;
use super::evaluator::{join_ordered, EvalFuture, EvalResult, Evaluator};
use super::value::Value;
use crate::ast::Expr;

/// Two-parameter reduce lambda
pub(crate) struct Lambda {
    params: (String, String),
    body: Arc<Expr>,
}

impl Lambda {
    pub fn new(params: (String, String), body: Arc<Expr>) -> Self {
        Lambda { params, body }
    }

    /// Body is `p1 op p2` or `p2 op p1` for distinct parameters
    pub fn is_associative(&self) -> bool {
        let (first, second) = &self.params;
        if first == second {
            return false;
        }
        match self.body.as_ref() {
            Expr::BinaryOp { left, right, .. } => match (left.as_ref(), right.as_ref()) {
                (Expr::Identifier(l), Expr::Identifier(r)) => {
                    (l == first && r == second) || (l == second && r == first)
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Bind the parameters to `(left, right)` and evaluate the body.
    /// With identical parameter names the second binding wins.
    fn apply(&self, evaluator: &Arc<Evaluator>, scope: &Scope, left: f64, right: f64) -> EvalFuture<f64> {
        let inner = scope.overlay([
            (self.params.0.clone(), Value::Number(left)),
            (self.params.1.clone(), Value::Number(right)),
        ]);
        let result = evaluator.eval(&self.body, &inner);
        async move { result.await?.expect_number("reduce lambda result") }.boxed()
    }
}

pub(crate) async fn reduce(
    evaluator: &Arc<Evaluator>,
    elements: Arc<Vec<f64>>,
    neutral: f64,
    lambda: Arc<Lambda>,
    scope: &Scope,
) -> EvalResult<f64> {
    if lambda.is_associative() {
        debug!("reduce: divide-and-conquer over {} elements", elements.len());
        let mut values = Vec::with_capacity(elements.len() + 1);
        values.push(neutral);
        values.extend_from_slice(&elements);
        let len = values.len();
        combine(Arc::clone(evaluator), Arc::new(values), 0, len, lambda, scope.clone()).await
    } else {
        debug!("reduce: sequential fold over {} elements", elements.len());
        fold(evaluator, &elements, neutral, &lambda, scope).await
    }
}

async fn fold(
    evaluator: &Arc<Evaluator>,
    elements: &[f64],
    neutral: f64,
    lambda: &Lambda,
    scope: &Scope,
) -> EvalResult<f64> {
    let mut accumulator = neutral;
    for element in elements {
        accumulator = lambda.apply(evaluator, scope, accumulator, *element).await?;
    }
    Ok(accumulator)
}

/// Reduce `values[lo..hi]`, which is never empty
fn combine(
    evaluator: Arc<Evaluator>,
    values: Arc<Vec<f64>>,
    lo: usize,
    hi: usize,
    lambda: Arc<Lambda>,
    scope: Scope,
) -> EvalFuture<f64> {
    async move {
        evaluator.checkpoint()?;
        if hi - lo == 1 {
            return Ok(values[lo]);
        }

        let mid = lo + (hi - lo) / 2;
        let halves = vec![
            combine(Arc::clone(&evaluator), Arc::clone(&values), lo, mid, Arc::clone(&lambda), scope.clone()),
            combine(Arc::clone(&evaluator), Arc::clone(&values), mid, hi, Arc::clone(&lambda), scope.clone()),
        ];
        let merged = join_ordered(halves).await?;
        lambda.apply(&evaluator, &scope, merged[0], merged[1]).await
    }
    .boxed()
}
