// Integration tests for the parseq interpreter
//
// These tests run complete programs and check the events they publish.
// Tests cover:
// - Operator precedence and associativity
// - Sequences, map and reduce
// - Lambda scoping and shadowing
// - Error reporting
// - Repeatability and cancellation

use parseq::config::Config;
use parseq::events::InterpreterEvent;
use parseq::interpreter::{AsyncRuntime, Interpreter, RunOutcome};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

fn run_code(code: &str) -> Vec<InterpreterEvent> {
    let mut interp = Interpreter::new();
    interp.run_blocking(code, CancellationToken::new());
    interp.events().history()
}

/// Output messages of a program, failing the test if it reported an error
fn outputs(code: &str) -> Vec<String> {
    run_code(code)
        .into_iter()
        .filter_map(|event| match event {
            InterpreterEvent::Output(message) => Some(message),
            InterpreterEvent::Error(message) => panic!("unexpected error: {}", message),
            _ => None,
        })
        .collect()
}

fn error_of(code: &str) -> String {
    run_code(code)
        .into_iter()
        .find_map(|event| match event {
            InterpreterEvent::Error(message) => Some(message),
            _ => None,
        })
        .unwrap_or_else(|| panic!("expected an error from {:?}", code))
}

#[test]
fn test_precedence() {
    assert_eq!(outputs("out 1 + 2 * 3 ^ 2"), vec!["19"]);
    assert_eq!(outputs("out (1 + 2) * 3"), vec!["9"]);
    assert_eq!(outputs("out 10 - 4 - 3"), vec!["3"]);
    assert_eq!(outputs("out 8 / 4 / 2"), vec!["1"]);
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(outputs("out 5 ^ 2 ^ 3"), vec!["390625"]);
    assert_eq!(outputs("out (5 ^ 2) ^ 3"), vec!["15625"]);
}

#[test]
fn test_signed_literals() {
    assert_eq!(outputs("out 5-3"), vec!["2"]);
    assert_eq!(outputs("out -3 + 1"), vec!["-2"]);
    assert_eq!(outputs("var x = 4\nout -x * 2"), vec!["-8"]);
    assert_eq!(outputs("out 2 * -0.5"), vec!["-1"]);
}

#[test]
fn test_sequence_literal() {
    assert_eq!(outputs("out {1, 4}"), vec!["[1, 2, 3, 4]"]);
    assert_eq!(outputs("out {0, 0}"), vec!["[0]"]);
    assert_eq!(outputs("var n = 3\nout {n - 1, n + 1}"), vec!["[2, 3, 4]"]);
}

#[test]
fn test_reversed_bounds_name_both_ends() {
    let message = error_of("out {5, 2}");
    assert!(message.contains('5') && message.contains('2'), "{}", message);
    assert_eq!(message, "Invalid sequence bounds {5, 2}: start must not exceed end");
}

#[test]
fn test_non_integer_bounds() {
    assert_eq!(error_of("out {1, 2.5}"), "Invalid sequence bounds {1, 2.5}: bounds must be integers");
}

#[test]
fn test_sequence_length_limit() {
    let config = Config { max_sequence_len: 100, ..Config::default() };
    let mut interp = Interpreter::with_config(config);
    let outcome = interp.run_blocking("out {1, 101}", CancellationToken::new());
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(
        interp.events().history()[1],
        InterpreterEvent::Error("Sequence {1, 101} has 101 elements, more than the limit of 100".into())
    );
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let levels = 3000;
    let source = format!("out {}1{}", "-(".repeat(levels), ")".repeat(levels));
    let mut interp = Interpreter::new();
    let outcome = interp.run_blocking(&source, CancellationToken::new());

    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(
        interp.events().history(),
        vec![
            InterpreterEvent::Started,
            InterpreterEvent::Error("Syntax error: expression nested too deeply (more than 256 levels)".into()),
            InterpreterEvent::Completed,
        ]
    );
}

#[test]
fn test_nesting_within_the_limit_evaluates() {
    let nested = |levels: usize| format!("out {}1{}", "-(".repeat(levels), ")".repeat(levels));
    assert_eq!(outputs(&nested(200)), vec!["1"]);
    assert_eq!(outputs(&nested(201)), vec!["-1"]);

    let config = Config { max_nesting_depth: 8, ..Config::default() };
    let mut interp = Interpreter::with_config(config);
    let outcome = interp.run_blocking(&nested(20), CancellationToken::new());
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(interp.run_blocking(&nested(5), CancellationToken::new()), RunOutcome::Completed);
}

#[test]
fn test_map() {
    assert_eq!(outputs("out map({1, 3}, i -> i ^ 2)"), vec!["[1, 4, 9]"]);
    assert_eq!(outputs("out map(map({1, 3}, i -> i * 2), j -> j + 1)"), vec!["[3, 5, 7]"]);
    assert_eq!(outputs("out map({1, 4}, i -> i / 2)"), vec!["[0.5, 1, 1.5, 2]"]);
}

#[test]
fn test_reduce() {
    assert_eq!(outputs("out reduce({2, 4}, 1, x y -> x * y)"), vec!["24"]);
    assert_eq!(outputs("out reduce({1, 100}, 0, a b -> a + b)"), vec!["5050"]);
    assert_eq!(outputs("out reduce(map({1, 3}, i -> i ^ 2), 0, a b -> a + b)"), vec!["14"]);
}

#[test]
fn test_sequential_fold_matches_manual_left_fold() {
    // ((((0 - 1) - 2) - 3) - 4)
    assert_eq!(outputs("out reduce({1, 4}, 0, a b -> a - b + 0)"), vec!["-10"]);
    assert_eq!(outputs("out reduce({1, 3}, 1, acc e -> acc * 10 + e)"), vec!["1123"]);
}

#[test]
fn test_tree_reduction_of_non_associative_body() {
    assert_eq!(outputs("out reduce({1, 4}, 0, a b -> a - b)"), vec!["-4"]);
}

#[test]
fn test_lambda_shadows_global_only_inside_body() {
    assert_eq!(outputs("var x = 10\nout map({1, 2}, x -> x + 1)\nout x"), vec!["[2, 3]", "10"]);
}

#[test]
fn test_lambda_parameter_is_not_visible_afterwards() {
    let message = error_of("out map({1, 2}, i -> i)\nout i");
    assert!(message.starts_with("Undefined variable 'i'"), "{}", message);
}

#[test]
fn test_undefined_variable_suggestion() {
    assert_eq!(error_of("var total = 1\nout totl"), "Undefined variable 'totl' (did you mean 'total'?)");
}

#[test]
fn test_type_mismatch() {
    assert_eq!(error_of("out {1, 2} * 2"), "Type mismatch: operator '*' expects a number, found sequence");
    assert_eq!(
        error_of("out reduce(5, 0, a b -> a + b)"),
        "Type mismatch: reduce source expects a sequence, found number"
    );
}

#[test]
fn test_syntax_errors() {
    assert_eq!(error_of("out 1 +"), "Syntax error: expected expression, found end of input");
    assert_eq!(
        error_of("val x = 1"),
        "Syntax error: unknown statement 'val' (hint: variables are declared with 'var')"
    );
}

#[test]
fn test_syntax_error_runs_nothing() {
    assert_eq!(
        run_code("out 1\nout (2"),
        vec![
            InterpreterEvent::Started,
            InterpreterEvent::Error("Syntax error: unmatched '(': expected ')', found end of input".into()),
            InterpreterEvent::Completed,
        ]
    );
}

#[test]
fn test_output_before_error_is_kept() {
    assert_eq!(
        run_code("print \"begin\"\nout 1\nout {3, 1}\nout 2"),
        vec![
            InterpreterEvent::Started,
            InterpreterEvent::Output("begin".into()),
            InterpreterEvent::Output("1".into()),
            InterpreterEvent::Error("Invalid sequence bounds {3, 1}: start must not exceed end".into()),
            InterpreterEvent::Completed,
        ]
    );
}

#[test]
fn test_repeated_runs_are_identical() {
    let program = "var n = 50\nvar s = map({1, n}, i -> i * i)\nout reduce(s, 0, a b -> a + b)\nout s";
    assert_eq!(run_code(program), run_code(program));

    let mut interp = Interpreter::new();
    interp.run_blocking(program, CancellationToken::new());
    interp.run_blocking(program, CancellationToken::new());
    let history = interp.events().history();
    let (first, second) = history.split_at(history.len() / 2);
    assert_eq!(first, second);
}

#[test]
fn test_every_run_ends_with_one_terminal_event() {
    for program in ["out 1", "out x", "out (", "print \"hi\""] {
        let events = run_code(program);
        assert_eq!(events.first(), Some(&InterpreterEvent::Started));
        assert!(events.last().map_or(false, InterpreterEvent::is_terminal));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.iter().filter(|e| matches!(e, InterpreterEvent::Error(_))).count() <= 1);
    }
}

#[test]
fn test_cancel_mid_run_stops_all_events() {
    let mut interp = Interpreter::new();
    let events = interp.events();
    let mut stream = events.subscribe();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let source = "print \"go\"\nout reduce({1, 2000000}, 0, a b -> a + b - 0)\nprint \"unreachable\"";
    let outcome = AsyncRuntime::block_on(async move {
        let watcher = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if event == InterpreterEvent::Output("go".into()) {
                    trigger.cancel();
                    break;
                }
            }
        });
        let outcome = interp.run_once(source, cancel).await;
        let _ = watcher.await;
        outcome
    });

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(
        events.history(),
        vec![InterpreterEvent::Started, InterpreterEvent::Output("go".into()), InterpreterEvent::Cancelled]
    );
}

#[test]
fn test_run_after_cancellation_starts_clean() {
    let mut interp = Interpreter::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(interp.run_blocking("out 1", cancel), RunOutcome::Cancelled);
    assert_eq!(interp.run_blocking("out 1", CancellationToken::new()), RunOutcome::Completed);

    assert_eq!(
        interp.events().history(),
        vec![
            InterpreterEvent::Started,
            InterpreterEvent::Cancelled,
            InterpreterEvent::Started,
            InterpreterEvent::Output("1".into()),
            InterpreterEvent::Completed,
        ]
    );
}
