// File: src/snapshots.rs
//
// Snapshot test runner for parseq programs.
//
// Every `<name>.pq` file in a directory is run with a fresh interpreter and
// its text output compared with `<name>.out` next to it. With `update` set,
// the `.out` files are rewritten from the actual output instead.

use colored::Colorize;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::console::{collect_until_terminal, plain_line};
use crate::interpreter::{AsyncRuntime, Interpreter};

pub const PROGRAM_EXTENSION: &str = "pq";
pub const EXPECTED_EXTENSION: &str = "out";

/// Result from checking a single program
#[derive(Clone, Debug)]
pub struct SnapshotResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
    pub duration_ms: u128,
}

/// Summary report of a snapshot run
#[derive(Debug)]
pub struct SnapshotReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub updated: usize,
    pub duration_ms: u128,
    pub results: Vec<SnapshotResult>,
}

/// Run `source` and render its events the way `.out` files store them
pub fn render_output(source: &str, config: &Config) -> String {
    let mut interpreter = Interpreter::with_config(config.clone());
    let stream = interpreter.events().subscribe_live();

    let events = AsyncRuntime::block_on(async {
        let collector = tokio::spawn(collect_until_terminal(stream));
        interpreter.run_once(source, CancellationToken::new()).await;
        collector.await.unwrap_or_default()
    });

    let mut output = String::new();
    for line in events.iter().filter_map(plain_line) {
        output.push_str(&line);
        output.push('\n');
    }
    output
}

fn program_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == PROGRAM_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}

/// Check (or with `update`, regenerate) every snapshot in `dir`
pub fn run_snapshots(dir: &Path, update: bool, config: &Config) -> io::Result<SnapshotReport> {
    let start_time = Instant::now();
    let mut results = Vec::new();
    let mut updated = 0;

    for program in program_files(dir)? {
        let started = Instant::now();
        let name = program.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let expected_path = program.with_extension(EXPECTED_EXTENSION);
        debug!("snapshot {}: running {}", name, program.display());

        let source = fs::read_to_string(&program)?;
        let actual = render_output(&source, config);

        let (passed, message) = if update {
            fs::write(&expected_path, &actual)?;
            updated += 1;
            (true, None)
        } else {
            match fs::read_to_string(&expected_path) {
                Ok(expected) if expected == actual => (true, None),
                Ok(expected) => (false, Some(describe_mismatch(&expected, &actual))),
                Err(_) => (false, Some(format!("missing {} (run with --update)", expected_path.display()))),
            }
        };

        results.push(SnapshotResult { name, passed, message, duration_ms: started.elapsed().as_millis() });
    }

    let passed = results.iter().filter(|r| r.passed).count();
    Ok(SnapshotReport {
        total: results.len(),
        passed,
        failed: results.len() - passed,
        updated,
        duration_ms: start_time.elapsed().as_millis(),
        results,
    })
}

/// First differing line, 1-based
fn describe_mismatch(expected: &str, actual: &str) -> String {
    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line = 1;
    loop {
        match (expected_lines.next(), actual_lines.next()) {
            (Some(e), Some(a)) if e == a => line += 1,
            (e, a) => {
                return format!(
                    "line {}: expected {:?}, got {:?}",
                    line,
                    e.unwrap_or("<end of output>"),
                    a.unwrap_or("<end of output>")
                )
            }
        }
    }
}

impl SnapshotReport {
    /// Print the report to stdout with colored output
    pub fn print(&self, verbose: bool) {
        println!("\n{}", "=".repeat(60));
        println!("{}", "Snapshot Results".bold());
        println!("{}", "=".repeat(60));

        for result in &self.results {
            if result.passed {
                if verbose {
                    println!("  {} {} ({}ms)", "✓".green().bold(), result.name.green(), result.duration_ms);
                }
            } else {
                println!("  {} {} ({}ms)", "✗".red().bold(), result.name.red(), result.duration_ms);
                if let Some(msg) = &result.message {
                    println!("    {}: {}", "Error".red().bold(), msg.dimmed());
                }
            }
        }

        println!(
            "Programs: {} total, {} passed, {} failed",
            self.total,
            self.passed.to_string().green().bold(),
            self.failed.to_string().red().bold()
        );
        if self.updated > 0 {
            println!("Updated: {} expected output file(s)", self.updated);
        }
        println!("Time:  {}ms", self.duration_ms);
        println!("{}", "=".repeat(60));
    }

    /// 0 when every program matched, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }
}
