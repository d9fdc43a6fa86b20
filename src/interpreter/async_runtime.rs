// File: src/interpreter/async_runtime.rs
//
// Tokio runtime wrapper for the parseq evaluator.
// Provides a process-wide, lazily built multi-threaded runtime whose worker
// pool runs the evaluation tasks.
//
// The runtime can be configured once with `init` before first use (the CLI
// does this from its flags); otherwise it is built from `Config::from_env()`
// the first time it is needed.

use log::{debug, warn};
use once_cell::sync::OnceCell;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

use crate::config::Config;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

fn build(config: &Config) -> std::io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.enable_all().thread_name("parseq-worker");
    if let Some(workers) = config.worker_threads {
        builder.worker_threads(workers);
    }
    debug!("building evaluation runtime (worker_threads: {:?})", config.worker_threads);
    builder.build()
}

/// Async runtime wrapper providing task execution capabilities
pub struct AsyncRuntime;

impl AsyncRuntime {
    /// Configure the global runtime. Returns false if it was already built.
    pub fn init(config: &Config) -> std::io::Result<bool> {
        if RUNTIME.get().is_some() {
            warn!("evaluation runtime already initialized; ignoring new configuration");
            return Ok(false);
        }
        let runtime = build(config)?;
        Ok(RUNTIME.set(runtime).is_ok())
    }

    /// Get reference to the global tokio runtime
    pub fn runtime() -> &'static Runtime {
        RUNTIME.get_or_init(|| {
            // Building a default runtime only fails if the OS refuses threads
            build(&Config::from_env()).expect("failed to create tokio runtime")
        })
    }

    /// Block the current thread until the future completes
    ///
    /// Must not be called from inside the runtime's own worker threads.
    pub fn block_on<F>(future: F) -> F::Output
    where
        F: Future,
    {
        Self::runtime().block_on(future)
    }
}
