// File: src/lib.rs
//
// Library interface for the parseq interpreter.
// Exposes modules for integration testing and external use.

pub mod ast;
pub mod config;
pub mod console;
pub mod errors;
pub mod events;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod snapshots;
