// File: src/errors.rs
//
// Error types for the parseq language.
//
// SyntaxError is produced by the parser before any evaluation starts.
// RuntimeError covers everything the evaluator can reject, plus the
// cancellation signal. InterpreterError is what a single run can fail with.
// The Display output of each is exactly the message carried by the Error
// event of a failed run.

use thiserror::Error;

/// Parser failure with an "expected X, found Y" style message
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Syntax error: {message}{}", hint_suffix(.hint))]
pub struct SyntaxError {
    pub message: String,
    pub hint: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        SyntaxError { message: message.into(), hint: None }
    }

    pub fn expected(expected: &str, found: &str) -> Self {
        Self::new(format!("expected {}, found {}", expected, found))
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" (hint: {})", hint),
        None => String::new(),
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

/// Evaluation failures. Each aborts the current run only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'{}", suggestion_suffix(.suggestion))]
    UndefinedVariable { name: String, suggestion: Option<String> },

    #[error("Type mismatch: {context} expects {expected}, found {found}")]
    TypeMismatch { context: String, expected: &'static str, found: &'static str },

    #[error("Invalid sequence bounds {{{start}, {end}}}: {reason}")]
    InvalidSequenceBounds { start: f64, end: f64, reason: &'static str },

    #[error("Sequence {{{start}, {end}}} has {len} elements, more than the limit of {limit}")]
    SequenceTooLong { start: f64, end: f64, len: u64, limit: usize },

    #[error("Evaluation task failed: {0}")]
    TaskFailed(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl RuntimeError {
    pub fn type_mismatch(context: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        RuntimeError::TypeMismatch { context: context.into(), expected, found }
    }
}

/// Anything a single run can fail with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl InterpreterError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InterpreterError::Runtime(RuntimeError::Cancelled))
    }
}

/// Computes the Levenshtein distance between two strings
/// Used for "Did you mean?" suggestions
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    // Single rolling row of the edit matrix
    let mut previous: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut current = vec![0; s2_chars.len() + 1];

    for (i, c1) in s1_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1).min(current[j] + 1).min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[s2_chars.len()]
}

/// Find the closest match from a list of candidates using Levenshtein distance
/// Returns None if no good match is found (distance > 3)
pub fn find_closest_match<'a>(target: &str, candidates: &'a [String]) -> Option<&'a str> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = levenshtein_distance(target, candidate);

        // Ties keep the alphabetically first candidate so messages are stable
        let better = distance < best_distance
            || (distance == best_distance && best_match.map_or(false, |best: &str| candidate.as_str() < best));
        if distance <= 3 && better {
            best_distance = distance;
            best_match = Some(candidate.as_str());
        }
    }

    best_match
}
