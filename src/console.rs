// File: src/console.rs
//
// Terminal rendering of interpreter events for the CLI and the REPL.
//
// Text format prints program output on stdout and errors on stderr, colored
// the same way as the rest of the CLI. JSON format prints every event,
// lifecycle events included, as one JSON object per line on stdout.

use clap::ValueEnum;
use colored::Colorize;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::events::{EventStream, InterpreterEvent};
use crate::interpreter::{Interpreter, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Uncolored text line for an event, as written to snapshot files.
/// Lifecycle events other than Cancelled have no text form.
pub fn plain_line(event: &InterpreterEvent) -> Option<String> {
    match event {
        InterpreterEvent::Output(message) => Some(message.clone()),
        InterpreterEvent::Error(message) => Some(format!("Error: {}", message)),
        InterpreterEvent::Cancelled => Some("Cancelled".to_string()),
        InterpreterEvent::Started | InterpreterEvent::Completed => None,
    }
}

pub fn print_event(event: &InterpreterEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(err) => eprintln!("{} {}", "Error:".bright_red(), err),
        },
        OutputFormat::Text => match event {
            InterpreterEvent::Output(message) => println!("{}", message),
            InterpreterEvent::Error(message) => {
                eprintln!("{} {}", "Error:".bright_red().bold(), message.bright_red())
            }
            InterpreterEvent::Cancelled => eprintln!("{}", "Cancelled".bright_yellow()),
            InterpreterEvent::Started | InterpreterEvent::Completed => {}
        },
    }
}

/// Consume `stream` up to and including the first terminal event
pub async fn collect_until_terminal(mut stream: EventStream) -> Vec<InterpreterEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

async fn print_until_terminal(mut stream: EventStream, format: OutputFormat) {
    while let Some(event) = stream.next().await {
        print_event(&event, format);
        if event.is_terminal() {
            break;
        }
    }
}

/// Run `source` while printing its events as they arrive.
///
/// Ctrl-C cancels the run. Must be awaited on the shared runtime.
pub async fn run_with_console(interpreter: &mut Interpreter, source: &str, format: OutputFormat) -> RunOutcome {
    let cancel = CancellationToken::new();
    let printer = tokio::spawn(print_until_terminal(interpreter.events().subscribe_live(), format));

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::debug!("interrupt received; cancelling run");
                cancel.cancel();
            }
        })
    };

    let outcome = interpreter.run_once(source, cancel).await;
    interrupt.abort();
    // The terminal event is already published, so the printer finishes
    let _ = printer.await;
    outcome
}
