// File: src/interpreter/evaluator.rs
//
// Concurrent tree-walking expression evaluator.
//
// Every node that has independent children fans them out as tasks on the
// runtime's worker pool and joins them before producing its own value:
// - BinaryOp: left and right operands
// - Sequence: start and end bounds
// - Map: one task per element
// - Reduce: source and neutral value (strategies live in reduce.rs)
//
// Tasks of one fan-out live in a JoinSet owned by the evaluating future, so
// dropping that future aborts them. Each task carries its own Scope; the
// global bindings are only ever read here.

use futures::future::{BoxFuture, FutureExt};
use log::trace;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::environment::Scope;
use super::value::Value;
use crate::ast::{BinaryOperator, Expr};
use crate::errors::{find_closest_match, RuntimeError};

pub(crate) type EvalResult<T> = Result<T, RuntimeError>;
pub(crate) type EvalFuture<T> = BoxFuture<'static, EvalResult<T>>;

/// Shared, read-only evaluation context of one run
pub(crate) struct Evaluator {
    cancel: CancellationToken,
    max_sequence_len: usize,
}

impl Evaluator {
    pub fn new(cancel: CancellationToken, max_sequence_len: usize) -> Arc<Self> {
        Arc::new(Evaluator { cancel, max_sequence_len })
    }

    /// Suspension point: fails with Cancelled once the run is cancelled
    pub fn checkpoint(&self) -> EvalResult<()> {
        if self.cancel.is_cancelled() {
            Err(RuntimeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Evaluate `expr` in `scope` as an owned future that can be spawned
    pub fn eval(self: &Arc<Self>, expr: &Arc<Expr>, scope: &Scope) -> EvalFuture<Value> {
        let this = Arc::clone(self);
        let expr = Arc::clone(expr);
        let scope = scope.clone();
        async move { this.eval_node(&expr, &scope).await }.boxed()
    }

    async fn eval_node(self: &Arc<Self>, expr: &Expr, scope: &Scope) -> EvalResult<Value> {
        self.checkpoint()?;

        match expr {
            Expr::Number(_) | Expr::Identifier(_) => eval_leaf(expr, scope),
            Expr::UnaryMinus(operand) => Ok(self.eval(operand, scope).await?.negate()),
            Expr::BinaryOp { left, op, right } => {
                let (left, right) = self.eval_pair(left, right, scope).await?;
                binary_op(*op, &left, &right)
            }
            Expr::Sequence { start, end } => {
                let (start, end) = self.eval_pair(start, end, scope).await?;
                let start = start.expect_number("sequence start")?;
                let end = end.expect_number("sequence end")?;
                self.materialize(start, end)
            }
            Expr::Map { sequence, param, body } => {
                let source = self.eval(sequence, scope).await?;
                let elements = source.expect_sequence("map source")?;
                self.map(&elements, param, body, scope).await
            }
            Expr::Reduce { sequence, neutral, params, body } => {
                let (source, neutral) = self.eval_pair(sequence, neutral, scope).await?;
                let elements = source.expect_sequence("reduce source")?;
                let neutral = neutral.expect_number("reduce neutral value")?;
                let lambda = super::reduce::Lambda::new(params.clone(), Arc::clone(body));
                let result = super::reduce::reduce(self, elements, neutral, Arc::new(lambda), scope).await?;
                Ok(Value::Number(result))
            }
        }
    }

    /// Evaluate two sibling expressions concurrently
    async fn eval_pair(
        self: &Arc<Self>,
        left: &Arc<Expr>,
        right: &Arc<Expr>,
        scope: &Scope,
    ) -> EvalResult<(Value, Value)> {
        // Leaves are evaluated inline
        if left.is_leaf() && right.is_leaf() {
            return Ok((eval_leaf(left, scope)?, eval_leaf(right, scope)?));
        }

        let mut values = join_ordered(vec![self.eval(left, scope), self.eval(right, scope)]).await?;
        let right = values.pop();
        let left = values.pop();
        match (left, right) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(RuntimeError::TaskFailed("missing operand result".to_string())),
        }
    }

    fn materialize(&self, start: f64, end: f64) -> EvalResult<Value> {
        if start.fract() != 0.0 || end.fract() != 0.0 {
            return Err(RuntimeError::InvalidSequenceBounds { start, end, reason: "bounds must be integers" });
        }
        if start > end {
            return Err(RuntimeError::InvalidSequenceBounds { start, end, reason: "start must not exceed end" });
        }

        let len = end - start + 1.0;
        if len > self.max_sequence_len as f64 {
            return Err(RuntimeError::SequenceTooLong {
                start,
                end,
                len: len as u64,
                limit: self.max_sequence_len,
            });
        }

        let elements = (0..len as usize).map(|offset| start + offset as f64).collect();
        Ok(Value::sequence(elements))
    }

    async fn map(
        self: &Arc<Self>,
        elements: &[f64],
        param: &str,
        body: &Arc<Expr>,
        scope: &Scope,
    ) -> EvalResult<Value> {
        trace!("map: fanning out {} element tasks", elements.len());

        let tasks = elements
            .iter()
            .map(|element| {
                let inner = scope.overlay([(param.to_string(), Value::Number(*element))]);
                self.eval(body, &inner)
            })
            .collect();

        let results = join_ordered(tasks).await?;
        let numbers = results
            .iter()
            .map(|value| value.expect_number("map lambda result"))
            .collect::<EvalResult<Vec<f64>>>()?;

        Ok(Value::sequence(numbers))
    }
}

fn eval_leaf(expr: &Expr, scope: &Scope) -> EvalResult<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Identifier(name) => lookup(scope, name),
        other => Err(RuntimeError::TaskFailed(format!("not a leaf expression: {}", other))),
    }
}

fn lookup(scope: &Scope, name: &str) -> EvalResult<Value> {
    scope.get(name).ok_or_else(|| {
        let candidates = scope.visible_names();
        RuntimeError::UndefinedVariable {
            name: name.to_string(),
            suggestion: find_closest_match(name, &candidates).map(str::to_string),
        }
    })
}

fn binary_op(op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok(Value::Number(op.apply(*l, *r))),
        (Value::Number(_), other) | (other, _) => Err(RuntimeError::type_mismatch(
            format!("operator '{}'", op),
            "a number",
            other.type_name(),
        )),
    }
}

/// Spawn every task on the worker pool and wait for all of them.
///
/// Results come back in task order, not completion order. If any task
/// fails, the failure of the lowest-index task is returned so the reported
/// error does not depend on scheduling.
pub(crate) async fn join_ordered<T>(tasks: Vec<EvalFuture<T>>) -> EvalResult<Vec<T>>
where
    T: Send + 'static,
{
    let count = tasks.len();
    let mut set = JoinSet::new();
    for (index, task) in tasks.into_iter().enumerate() {
        set.spawn(async move { (index, task.await) });
    }

    let mut slots: Vec<Option<EvalResult<T>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(err) if err.is_cancelled() => return Err(RuntimeError::Cancelled),
            Err(err) => return Err(RuntimeError::TaskFailed(err.to_string())),
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(RuntimeError::TaskFailed("task produced no result".to_string()))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{AsyncRuntime, Environment};
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::ast::Stmt;

    fn expr(source: &str) -> Arc<Expr> {
        let stmts = Parser::new(tokenize(&format!("out {}", source))).parse().expect("parse failed");
        match stmts.into_iter().next() {
            Some(Stmt::Out(expr)) => expr,
            other => panic!("expected out statement, got {:?}", other),
        }
    }

    fn eval_in(env: &Environment, source: &str) -> EvalResult<Value> {
        let evaluator = Evaluator::new(CancellationToken::new(), 1_000);
        let expr = expr(source);
        AsyncRuntime::block_on(evaluator.eval(&expr, &env.scope()))
    }

    fn eval(source: &str) -> EvalResult<Value> {
        eval_in(&Environment::new(), source)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3 ^ 2"), Ok(Value::Number(19.0)));
        assert_eq!(eval("5 ^ 2 ^ 3"), Ok(Value::Number(390625.0)));
        assert_eq!(eval("(5 ^ 2) ^ 3"), Ok(Value::Number(15625.0)));
        assert_eq!(eval("7 / 2"), Ok(Value::Number(3.5)));
        assert_eq!(eval("1 / 0"), Ok(Value::Number(f64::INFINITY)));
    }

    #[test]
    fn test_sequences() {
        assert_eq!(eval("{1, 4}"), Ok(Value::sequence(vec![1.0, 2.0, 3.0, 4.0])));
        assert_eq!(eval("{-1, 1}"), Ok(Value::sequence(vec![-1.0, 0.0, 1.0])));
        assert_eq!(eval("{3, 3}"), Ok(Value::sequence(vec![3.0])));
        assert_eq!(eval("-({1, 2})"), Ok(Value::sequence(vec![-1.0, -2.0])));
    }

    #[test]
    fn test_invalid_bounds() {
        assert_eq!(
            eval("{5, 2}"),
            Err(RuntimeError::InvalidSequenceBounds { start: 5.0, end: 2.0, reason: "start must not exceed end" })
        );
        assert_eq!(
            eval("{1.5, 3}"),
            Err(RuntimeError::InvalidSequenceBounds { start: 1.5, end: 3.0, reason: "bounds must be integers" })
        );
        assert!(matches!(eval("{1, 5000}"), Err(RuntimeError::SequenceTooLong { limit: 1_000, .. })));
        assert!(matches!(eval("{{1, 2}, 3}"), Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_type_mismatch() {
        let err = eval("{1, 2} + 1").unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch: operator '+' expects a number, found sequence");
        let err = eval("map(3, i -> i)").unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch: map source expects a sequence, found number");
        let err = eval("map({1, 2}, i -> {i, i})").unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch: map lambda result expects a number, found sequence");
    }

    #[test]
    fn test_map_preserves_order() {
        assert_eq!(eval("map({1, 3}, i -> i ^ 2)"), Ok(Value::sequence(vec![1.0, 4.0, 9.0])));
        let expected: Vec<f64> = (1..=200).map(|i| (i * 2) as f64).collect();
        assert_eq!(eval("map({1, 200}, i -> i * 2)"), Ok(Value::sequence(expected)));
    }

    #[test]
    fn test_lambda_sees_globals() {
        let mut env = Environment::new();
        env.define("k".to_string(), Value::Number(10.0));
        assert_eq!(eval_in(&env, "map({1, 2}, i -> i + k)"), Ok(Value::sequence(vec![11.0, 12.0])));
        assert_eq!(eval_in(&env, "map({1, 2}, k -> k)"), Ok(Value::sequence(vec![1.0, 2.0])));
    }

    #[test]
    fn test_undefined_variable_with_suggestion() {
        let mut env = Environment::new();
        env.define("total".to_string(), Value::Number(1.0));
        assert_eq!(
            eval_in(&env, "totl + 1"),
            Err(RuntimeError::UndefinedVariable { name: "totl".into(), suggestion: Some("total".into()) })
        );
        assert_eq!(
            eval("zzz"),
            Err(RuntimeError::UndefinedVariable { name: "zzz".into(), suggestion: None })
        );
    }

    #[test]
    fn test_lowest_index_error_wins() {
        for _ in 0..20 {
            let err = eval("a + b").unwrap_err();
            assert_eq!(err, RuntimeError::UndefinedVariable { name: "a".into(), suggestion: None });
        }
    }

    #[test]
    fn test_cancelled_token_stops_evaluation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let evaluator = Evaluator::new(cancel, 1_000);
        let result = AsyncRuntime::block_on(evaluator.eval(&expr("1 + 2"), &Environment::new().scope()));
        assert_eq!(result, Err(RuntimeError::Cancelled));
    }
}
