// File: src/repl.rs
//
// Interactive REPL (Read-Eval-Print Loop) for the parseq language.
// Provides an interactive shell with:
// - Multi-line input while parentheses or braces are unclosed
// - Command history with up/down arrow navigation
// - Special commands (:help, :clear, :quit, :vars, :reset)
// - Variables that persist across inputs
//
// Each run starts from an empty global scope, so persistence is done by
// replaying: every submission runs as a program prefixed with the `var`
// declarations accepted so far. Only submissions that complete are
// accepted, and `:vars` lists the bindings of the last accepted run.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::ast::Stmt;
use crate::config::Config;
use crate::console::{run_with_console, OutputFormat};
use crate::interpreter::{AsyncRuntime, Environment, Interpreter, RunOutcome};
use crate::lexer;
use crate::parser::Parser;

/// Declarations replayed before each submission, with the bindings they
/// produced in the last accepted run
#[derive(Debug, Default)]
pub struct Prelude {
    declarations: Vec<String>,
    bindings: Environment,
}

impl Prelude {
    /// Source actually run for `input`
    pub fn program(&self, input: &str) -> String {
        let mut program = self.declarations.join("\n");
        if !program.is_empty() {
            program.push('\n');
        }
        program.push_str(input);
        program
    }

    /// Keep the `var` declarations of a submission if its run completed.
    /// `globals` are the bindings that run left behind.
    pub fn accept(&mut self, statements: &[Stmt], outcome: &RunOutcome, globals: &Environment) -> bool {
        if *outcome != RunOutcome::Completed {
            return false;
        }
        self.declarations.extend(
            statements
                .iter()
                .filter(|stmt| matches!(stmt, Stmt::VarDecl { .. }))
                .map(|stmt| stmt.to_string()),
        );
        self.bindings = globals.clone();
        true
    }

    pub fn bindings(&self) -> &Environment {
        &self.bindings
    }

    pub fn clear(&mut self) {
        *self = Prelude::default();
    }
}

/// REPL session that maintains interpreter state and handles user interaction
pub struct Repl {
    interpreter: Interpreter,
    editor: DefaultEditor,
    prelude: Prelude,
}

impl Repl {
    pub fn new(config: Config) -> Result<Self, ReadlineError> {
        let editor = DefaultEditor::new()?;
        let interpreter = Interpreter::with_config(config);
        Ok(Repl { interpreter, editor, prelude: Prelude::default() })
    }

    fn show_banner(&self) {
        println!("{}", "╔══════════════════════════════════════════════════════╗".bright_cyan());
        println!(
            "{}",
            format!("║          parseq REPL v{:<8} - Interactive Shell     ║", env!("CARGO_PKG_VERSION"))
                .bright_cyan()
        );
        println!("{}", "╚══════════════════════════════════════════════════════╝".bright_cyan());
        println!();
        println!(
            "  {} Use {}{}{}{}",
            "Welcome!".bright_green(),
            ":".bright_blue(),
            "help".bright_yellow(),
            " for commands or ".bright_blue(),
            ":quit".bright_yellow()
        );
        println!("  {} Multi-line input: leave '(' or '{{' unclosed", "Tip:".bright_magenta());
        println!();
    }

    /// Starts the REPL loop
    pub fn run(&mut self) -> Result<(), ReadlineError> {
        self.show_banner();

        let mut buffer = String::new();

        loop {
            let prompt = if buffer.is_empty() {
                "parseq> ".bright_green().to_string()
            } else {
                "......> ".bright_blue().to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());

                    // Commands are only recognized outside multi-line input
                    if buffer.is_empty() && line.trim().starts_with(':') {
                        if self.handle_command(line.trim()) {
                            continue;
                        } else {
                            break;
                        }
                    }

                    buffer.push_str(&line);
                    buffer.push('\n');

                    if is_input_complete(&buffer) {
                        self.eval_input(&buffer);
                        buffer.clear();
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C (Ctrl+C to interrupt, :quit to exit)".bright_yellow());
                    buffer.clear();
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "\nGoodbye!".bright_cyan());
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Handles special REPL commands starting with ':'
    /// Returns true to continue REPL, false to quit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":help" | ":h" => {
                self.show_help();
                true
            }
            ":quit" | ":q" | ":exit" => {
                println!("{}", "Goodbye!".bright_cyan());
                false
            }
            ":clear" | ":c" => {
                print!("\x1B[2J\x1B[1;1H");
                self.show_banner();
                true
            }
            ":vars" | ":v" => {
                self.show_variables();
                true
            }
            ":reset" | ":r" => {
                self.interpreter = Interpreter::with_config(self.interpreter.config().clone());
                self.prelude.clear();
                println!("{}", "✓ Environment reset".bright_green());
                true
            }
            _ => {
                println!(
                    "{} Unknown command: {}. Type {}{}{}",
                    "Error:".bright_red(),
                    cmd.bright_yellow(),
                    ":".bright_blue(),
                    "help".bright_yellow(),
                    " for available commands.".bright_blue()
                );
                true
            }
        }
    }

    fn show_help(&self) {
        println!();
        println!("{}", "REPL Commands:".bright_cyan().bold());
        println!();
        println!("  {}{}  Display this help message", ":help".bright_yellow(), " or :h     ".dimmed());
        println!("  {}{}  Exit the REPL", ":quit".bright_yellow(), " or :q     ".dimmed());
        println!("  {}{}  Clear the screen", ":clear".bright_yellow(), " or :c    ".dimmed());
        println!("  {}{}  Show defined variables", ":vars".bright_yellow(), " or :v    ".dimmed());
        println!("  {}{}  Forget all variables", ":reset".bright_yellow(), " or :r   ".dimmed());
        println!();
        println!("{}", "Navigation:".bright_cyan().bold());
        println!();
        println!("  {}  Navigate command history", "↑/↓ arrows".bright_blue());
        println!("  {}  Discard input, or cancel a running program", "Ctrl+C    ".bright_blue());
        println!("  {}  Exit REPL", "Ctrl+D    ".bright_blue());
        println!();
        println!("{}", "Examples:".bright_cyan().bold());
        println!();
        println!("  {}", "parseq> var n = 10".dimmed());
        println!("  {}", "parseq> out reduce(map({1, n}, i -> i ^ 2), 0, a b -> a + b)".dimmed());
        println!("  {}", "385".dimmed());
        println!("  {}", "parseq> out map({1, 3},".dimmed());
        println!("  {}", "......>     i -> i * n)".dimmed());
        println!("  {}", "[10, 20, 30]".dimmed());
        println!();
    }

    fn show_variables(&self) {
        println!();
        println!("{}", "Defined Variables:".bright_cyan().bold());
        println!();

        let globals = self.prelude.bindings();
        let names = globals.names();
        if names.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for name in names {
            if let Some(value) = globals.get(&name) {
                println!("  {} = {}", name.bright_yellow(), value.to_string().bright_white());
            }
        }
        println!();
    }

    fn eval_input(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        // Syntax errors are reported without running the prelude again
        let max_depth = self.interpreter.config().max_nesting_depth;
        let statements = match Parser::new(lexer::tokenize(input)).with_max_depth(max_depth).parse() {
            Ok(statements) => statements,
            Err(err) => {
                println!("{} {}", "Error:".bright_red().bold(), err.to_string().bright_red());
                return;
            }
        };

        let program = self.prelude.program(input);
        let outcome = AsyncRuntime::block_on(run_with_console(&mut self.interpreter, &program, OutputFormat::Text));
        self.prelude.accept(&statements, &outcome, self.interpreter.globals());
    }
}

/// True once every '(' and '{' outside string literals is closed
pub fn is_input_complete(input: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in input.trim().chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '(' | '{' if !in_string => depth += 1,
            ')' | '}' if !in_string => depth -= 1,
            _ => {}
        }
    }

    // Surplus closers are complete too; the parser reports them
    !in_string && depth <= 0
}
