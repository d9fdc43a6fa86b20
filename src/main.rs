// File: src/main.rs
//
// Main entry point for the parseq interpreter.
// Handles command-line argument parsing and dispatches to the appropriate
// subcommand (run, eval, repl, or test).

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process;

use parseq::config::Config;
use parseq::console::{run_with_console, OutputFormat};
use parseq::interpreter::{AsyncRuntime, Interpreter};
use parseq::repl::Repl;
use parseq::snapshots;

#[derive(ClapParser)]
#[command(
    name = "parseq",
    about = "parseq: a small language for parallel sequence arithmetic",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Worker threads of the evaluation runtime (default: one per core)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Events kept for late subscribers
    #[arg(long, global = true)]
    replay: Option<usize>,

    /// Largest sequence a `{a, b}` literal may build
    #[arg(long, global = true)]
    max_sequence_len: Option<usize>,

    /// Deepest expression nesting the parser accepts
    #[arg(long, global = true)]
    max_nesting_depth: Option<usize>,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Run a parseq program file
    Run {
        /// Path to the .pq file
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run a program given on the command line
    Eval {
        source: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Launch interactive parseq REPL
    Repl,

    /// Check every .pq program in a directory against its .out file
    Test {
        #[arg(default_value = "tests/programs")]
        dir: PathBuf,

        /// Regenerate all .out files based on actual output
        #[arg(long)]
        update: bool,

        /// List passing programs too
        #[arg(long, short)]
        verbose: bool,
    },
}

impl Cli {
    /// Environment configuration overridden by explicit flags
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(workers) = self.workers.filter(|&n| n > 0) {
            config.worker_threads = Some(workers);
        }
        if let Some(replay) = self.replay.filter(|&n| n > 0) {
            config.event_replay_capacity = replay;
        }
        if let Some(limit) = self.max_sequence_len.filter(|&n| n > 0) {
            config.max_sequence_len = limit;
        }
        if let Some(depth) = self.max_nesting_depth.filter(|&n| n > 0) {
            config.max_nesting_depth = depth;
        }
        config
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".bright_red().bold(), message);
    process::exit(1);
}

fn run_source(source: &str, format: OutputFormat, config: Config) -> i32 {
    let mut interpreter = Interpreter::with_config(config);
    let outcome = AsyncRuntime::block_on(run_with_console(&mut interpreter, source, format));
    outcome.exit_code()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.config();
    if let Err(err) = AsyncRuntime::init(&config) {
        fail(format!("failed to start evaluation runtime: {}", err));
    }

    let code = match cli.command {
        Commands::Run { file, format } => {
            let source = fs::read_to_string(&file)
                .unwrap_or_else(|err| fail(format!("cannot read {}: {}", file.display(), err)));
            run_source(&source, format, config)
        }

        Commands::Eval { source, format } => run_source(&source, format, config),

        Commands::Repl => {
            let result = Repl::new(config).and_then(|mut repl| repl.run());
            match result {
                Ok(()) => 0,
                Err(err) => fail(err),
            }
        }

        Commands::Test { dir, update, verbose } => match snapshots::run_snapshots(&dir, update, &config) {
            Ok(report) => {
                report.print(verbose);
                report.exit_code()
            }
            Err(err) => fail(format!("cannot read {}: {}", dir.display(), err)),
        },
    };

    process::exit(code);
}
