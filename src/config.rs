// File: src/config.rs
//
// Runtime configuration for the parseq interpreter.
//
// Defaults can be overridden through environment variables, and the CLI
// overrides both with explicit flags:
// - PARSEQ_WORKER_THREADS   worker threads of the async runtime
// - PARSEQ_EVENT_REPLAY     events kept for late subscribers
// - PARSEQ_MAX_SEQUENCE_LEN largest sequence a `{a, b}` literal may build
// - PARSEQ_MAX_NESTING_DEPTH deepest expression nesting the parser accepts

use log::warn;
use std::str::FromStr;

pub const DEFAULT_EVENT_REPLAY_CAPACITY: usize = 256;
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 10_000_000;
/// Deepest expression tree accepted; fits a 2 MiB thread stack
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` lets tokio pick one worker per core
    pub worker_threads: Option<usize>,
    pub event_replay_capacity: usize,
    pub max_sequence_len: usize,
    pub max_nesting_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            worker_threads: None,
            event_replay_capacity: DEFAULT_EVENT_REPLAY_CAPACITY,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl Config {
    /// Defaults overridden by `PARSEQ_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(workers) = parse_positive::<usize>(&lookup, "PARSEQ_WORKER_THREADS") {
            config.worker_threads = Some(workers);
        }
        if let Some(capacity) = parse_positive(&lookup, "PARSEQ_EVENT_REPLAY") {
            config.event_replay_capacity = capacity;
        }
        if let Some(limit) = parse_positive(&lookup, "PARSEQ_MAX_SEQUENCE_LEN") {
            config.max_sequence_len = limit;
        }
        if let Some(depth) = parse_positive(&lookup, "PARSEQ_MAX_NESTING_DEPTH") {
            config.max_nesting_depth = depth;
        }

        config
    }
}

fn parse_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            warn!("ignoring {}={:?}: expected a positive integer", key, raw);
            None
        }
    }
}
