// File: src/interpreter/mod.rs
//
// Run controller for the parseq interpreter.
// Executes one program per call to `run_once` and reports everything it
// does as events on the interpreter's EventBus.
//
// A run always publishes, in order:
// - Started
// - Output events, one per `out`/`print` statement that finished
// - at most one Error event for a syntax or runtime failure
// - exactly one terminal event: Completed, or Cancelled if the run was
//   cancelled (in which case no Error is published)
//
// The terminal event is published by a drop guard, so it is delivered even
// when the caller drops the run future before it finishes.

mod async_runtime;
mod environment;
mod evaluator;
mod reduce;
mod value;

pub use async_runtime::AsyncRuntime;
pub use environment::{Environment, Scope};
pub use value::Value;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::ast::Stmt;
use crate::config::Config;
use crate::errors::{InterpreterError, RuntimeError};
use crate::events::{EventBus, InterpreterEvent};
use crate::lexer;
use crate::parser::Parser;
use evaluator::Evaluator;

/// How a single run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Failed(InterpreterError),
    Cancelled,
}

impl RunOutcome {
    /// Process exit code the CLI reports for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Failed(_) => 1,
            RunOutcome::Cancelled => 130,
        }
    }
}

/// Publishes Cancelled on drop unless a terminal event was already sent
struct TerminalGuard {
    events: EventBus,
    armed: bool,
}

impl TerminalGuard {
    fn new(events: &EventBus) -> Self {
        TerminalGuard { events: events.clone(), armed: true }
    }

    fn finish(mut self, event: InterpreterEvent) {
        self.armed = false;
        self.events.emit(event);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("run dropped before finishing; publishing Cancelled");
            self.events.emit(InterpreterEvent::Cancelled);
        }
    }
}

/// Interpreter owns the event bus and runs programs one at a time
pub struct Interpreter {
    config: Config,
    events: EventBus,
    globals: Environment,
}

impl Interpreter {
    /// Creates an interpreter with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let events = EventBus::new(config.event_replay_capacity);
        Interpreter { config, events, globals: Environment::new() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the event bus. Subscribe before running to see every event.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Global bindings left by the most recent run
    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// Tokenize, parse and execute `source`, publishing events as it goes.
    ///
    /// `&mut self` keeps runs on one interpreter strictly sequential; cancel
    /// and await a run before starting the next one.
    pub async fn run_once(&mut self, source: &str, cancel: CancellationToken) -> RunOutcome {
        debug!("run started ({} bytes of source)", source.len());
        self.events.emit(InterpreterEvent::Started);
        let guard = TerminalGuard::new(&self.events);

        let mut env = Environment::new();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InterpreterError::from(RuntimeError::Cancelled)),
            result = self.execute(source, &cancel, &mut env) => result,
        };
        self.globals = env;

        match result {
            Ok(()) => {
                debug!("run completed");
                guard.finish(InterpreterEvent::Completed);
                RunOutcome::Completed
            }
            Err(err) if err.is_cancelled() => {
                debug!("run cancelled");
                guard.finish(InterpreterEvent::Cancelled);
                RunOutcome::Cancelled
            }
            Err(err) => {
                debug!("run failed: {}", err);
                self.events.emit(InterpreterEvent::Error(err.to_string()));
                guard.finish(InterpreterEvent::Completed);
                RunOutcome::Failed(err)
            }
        }
    }

    /// Run to completion on the shared runtime, blocking the calling thread
    pub fn run_blocking(&mut self, source: &str, cancel: CancellationToken) -> RunOutcome {
        AsyncRuntime::block_on(self.run_once(source, cancel))
    }

    async fn execute(
        &self,
        source: &str,
        cancel: &CancellationToken,
        env: &mut Environment,
    ) -> Result<(), InterpreterError> {
        let tokens = lexer::tokenize(source);
        let token_count = tokens.len();
        let statements = Parser::new(tokens).with_max_depth(self.config.max_nesting_depth).parse()?;
        debug!("parsed {} statements from {} tokens", statements.len(), token_count);

        let evaluator = Evaluator::new(cancel.clone(), self.config.max_sequence_len);

        for stmt in &statements {
            evaluator.checkpoint()?;

            match stmt {
                Stmt::VarDecl { name, value } => {
                    let value = evaluator.eval(value, &env.scope()).await?;
                    env.define(name.clone(), value);
                }
                Stmt::Out(expr) => {
                    let value = evaluator.eval(expr, &env.scope()).await?;
                    self.events.emit(InterpreterEvent::Output(value.to_string()));
                }
                Stmt::Print(text) => {
                    let value = Value::Str(text.clone());
                    self.events.emit(InterpreterEvent::Output(value.to_string()));
                }
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
