//! End-to-end tests driving the public interpreter API one line at a time.

#![expect(clippy::unwrap_used)] // test code OK

use arilisp::{Error, Interpreter, InterpreterConfig, MAX_EVAL_DEPTH};
use std::thread;

#[derive(Debug, Clone, Copy)]
enum Expect {
    Output(&'static str),
    Syntax,
    Name,
    Runtime,
}
use Expect::*;

fn check(interpreter: &mut Interpreter, input: &str, expected: Expect, test_id: &str) {
    let result = interpreter.run(input);
    match (&result, expected) {
        (Ok(actual), Output(text)) => assert_eq!(actual, text, "{test_id}: '{input}'"),
        (Err(Error::SyntaxError(_)), Syntax)
        | (Err(Error::NameError(_)), Name)
        | (Err(Error::RuntimeError(_)), Runtime) => {}
        _ => panic!("{test_id}: '{input}' expected {expected:?}, got {result:?}"),
    }
}

/// Run one session of lines sharing a single interpreter
fn run_session(lines: &[(&str, Expect)]) {
    let mut interpreter = Interpreter::new();
    for (i, (input, expected)) in lines.iter().enumerate() {
        check(&mut interpreter, input, *expected, &format!("line #{}", i + 1));
    }
}

fn run_with_large_stack<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    let handle = thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(f)
        .expect("failed to spawn test thread with larger stack");
    handle.join().expect("test thread panicked");
}

#[test]
fn test_quoted_lists_print_as_written() {
    let test_cases = [
        "(1 2 3)",
        "()",
        "(1 (2 3) 4)",
        "((1) (2))",
        "(1 . 2)",
        "(a b c)",
        "(-5 0 7)",
    ];

    for (i, text) in test_cases.into_iter().enumerate() {
        let mut interpreter = Interpreter::new();
        let quoted = interpreter.run(&format!("(quote {text})")).unwrap();
        assert_eq!(quoted, text, "case #{}: (quote {text})", i + 1);
        let abbreviated = interpreter.run(&format!("'{text}")).unwrap();
        assert_eq!(abbreviated, text, "case #{}: '{text}", i + 1);
    }
}

#[test]
fn test_arithmetic_and_comparisons() {
    run_session(&[
        ("(+ 1 2 3)", Output("6")),
        ("(- 10 1 2)", Output("7")),
        ("(/ 7 2)", Output("3")),
        ("(/ -7 2)", Output("-3")),
        ("(* )", Output("1")),
        ("(- 5)", Output("5")),
        ("(< 1 2 3)", Output("#t")),
        ("(< 1 3 2)", Output("#f")),
        ("(= 1 1 1)", Output("#t")),
        ("(<)", Output("#t")),
        ("(* 2 (+ 1 2) (- 10 6))", Output("24")),
        ("(+ 9223372036854775807 1)", Output("-9223372036854775808")),
    ]);
}

#[test]
fn test_closures_capture_lexically() {
    run_session(&[
        (
            "(define make-adder (lambda (n) (lambda (x) (+ x n))))",
            Output("#t"),
        ),
        ("(define add5 (make-adder 5))", Output("#t")),
        ("(add5 3)", Output("8")),
        ("(define n 1000)", Output("#t")),
        ("(add5 3)", Output("8")),
        ("(define add1 (make-adder 1))", Output("#t")),
        ("(add1 (add5 1))", Output("7")),
    ]);
}

#[test]
fn test_mutation_visibility() {
    run_session(&[
        ("(define x 1)", Output("#t")),
        ("(set! x 2)", Output("#t")),
        ("x", Output("2")),
        ("(set! y 1)", Name),
        ("y", Name),
        ("x", Output("2")),
    ]);
}

#[test]
fn test_pair_mutation() {
    run_session(&[
        ("(define p (cons 1 2))", Output("#t")),
        ("(set-car! p 9)", Output("#t")),
        ("(car p)", Output("9")),
        ("p", Output("(9 . 2)")),
        ("(define l (list 1 2 3))", Output("#t")),
        ("(set-car! l 7)", Output("#t")),
        ("l", Output("(7 2 3)")),
        ("(set-cdr! p 4)", Output("#t")),
        ("(cdr p)", Output("4")),
        ("(pair? p)", Output("#t")),
        ("(list? p)", Output("#f")),
    ]);
}

#[test]
fn test_recursive_definitions() {
    run_session(&[
        (
            "(define (fact n) (if (< n 2) 1 (* n (fact (- n 1)))))",
            Output("#t"),
        ),
        ("(fact 6)", Output("720")),
        (
            "(define (fib n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))",
            Output("#t"),
        ),
        ("(fib 15)", Output("610")),
        ("(define (len l) (if (null? l) 0 (+ 1 (len (cdr l)))))", Output("#t")),
        ("(len '(4 5 6 7))", Output("4")),
    ]);
}

#[test]
fn test_error_categories() {
    let test_cases = [
        ("", Syntax),
        ("(+ 1", Syntax),
        (")", Syntax),
        ("(+ 1 2) 3", Syntax),
        ("1 2", Syntax),
        ("(1 . 2 3)", Syntax),
        ("@", Syntax),
        ("99999999999999999999", Syntax),
        ("(lambda)", Syntax),
        ("(define)", Syntax),
        ("nope", Name),
        ("(nope 1)", Name),
        ("(set! nope 1)", Name),
        ("()", Runtime),
        ("(1 2)", Runtime),
        ("(car 1 2)", Runtime),
        ("(abs)", Runtime),
        ("(list-ref (list 1) 5)", Runtime),
        ("(/ 1 0)", Runtime),
        ("(list #t)", Runtime),
        // name errors while collecting arguments surface as runtime errors
        ("(+ 1 nope)", Runtime),
    ];

    for (i, (input, expected)) in test_cases.into_iter().enumerate() {
        let mut interpreter = Interpreter::new();
        check(&mut interpreter, input, expected, &format!("case #{}", i + 1));
    }
}

#[test]
fn test_errors_print_with_category() {
    let mut interpreter = Interpreter::new();
    let test_cases = [
        ("(+ 1", "SyntaxError: "),
        ("nope", "NameError: no such name: nope"),
        ("(car '())", "RuntimeError: car: expected a non-empty list"),
        ("()", "RuntimeError: no operations"),
    ];

    for (input, expected) in test_cases {
        let err = interpreter.run(input).unwrap_err();
        assert!(
            err.to_string().starts_with(expected),
            "'{input}': expected '{expected}', got '{err}'"
        );
    }
}

#[test]
fn test_failed_lines_leave_bindings_unchanged() {
    let mut interpreter = Interpreter::new();
    interpreter.run("(define x 1)").unwrap();
    interpreter.run("(define (sq v) (* v v))").unwrap();
    interpreter.run("(define l '(1 2))").unwrap();
    let bindings = interpreter.bindings();
    let live = interpreter.heap().live_count();

    for input in [
        "(+ 1",
        "(define x 2) 3",
        "(set! x",
        "undefined",
        "(sq 1 2 3)",
        "(car 5)",
        "(list-tail l 9)",
        "(set! missing 4)",
    ] {
        assert!(interpreter.run(input).is_err(), "'{input}' should fail");
        assert_eq!(interpreter.bindings(), bindings, "after '{input}'");
        assert_eq!(interpreter.heap().live_count(), live, "after '{input}'");
    }

    assert_eq!(interpreter.run("(sq x)").unwrap(), "1");
}

#[test]
fn test_unreachable_values_are_swept() {
    let mut interpreter = Interpreter::new();
    interpreter
        .run("(define (churn n) (if (= n 0) 0 (+ (car (list n n n)) (churn (- n 1)))))")
        .unwrap();

    let mut live_counts = Vec::new();
    let mut freed = Vec::new();
    for _ in 0..4 {
        assert_eq!(interpreter.run("(churn 20)").unwrap(), "210");
        live_counts.push(interpreter.heap().live_count());
        freed.push(interpreter.stats().freed);
    }

    assert!(
        live_counts.windows(2).all(|w| w[0] == w[1]),
        "live values should not grow across runs: {live_counts:?}"
    );
    assert!(
        freed.windows(2).all(|w| w[1] > w[0]),
        "every run should free its temporaries: {freed:?}"
    );
    let stats = interpreter.stats();
    assert_eq!(stats.collections, 5);
    assert_eq!(
        stats.allocated - stats.freed,
        interpreter.heap().live_count() as u64
    );
}

#[test]
fn test_cyclic_environment_collection_terminates() {
    let mut interpreter = Interpreter::new();
    // the closure captures the root frame, which binds the closure
    interpreter.run("(define (self) self)").unwrap();
    interpreter.run("(define (loop n) (if (= n 0) 0 (loop (- n 1))))").unwrap();
    let live = interpreter.heap().live_count();

    assert_eq!(interpreter.collect(&[]), 0);
    assert_eq!(interpreter.collect(&[]), 0);
    assert_eq!(interpreter.heap().live_count(), live);
    assert_eq!(interpreter.run("(loop 5)").unwrap(), "0");
    assert_eq!(interpreter.heap().live_count(), live);
}

#[test]
fn test_disabled_collection_keeps_garbage() {
    let mut interpreter = Interpreter::with_config(InterpreterConfig {
        collect_garbage: false,
    });
    interpreter.run("(define x (list 1 2))").unwrap();
    let before = interpreter.heap().live_count();
    interpreter.run("(car x)").unwrap();
    assert!(interpreter.heap().live_count() > before);
    assert_eq!(interpreter.stats().collections, 0);
    assert_eq!(interpreter.stats().freed, 0);
}

#[test]
fn test_evaluate_exposes_result_until_next_line() {
    let mut interpreter = Interpreter::new();
    let value = interpreter.evaluate("(cons 4 5)").unwrap();
    assert!(interpreter.heap().is_live(value));
    assert_eq!(interpreter.heap().get(value).kind_name(), "list");

    interpreter.evaluate("1").unwrap();
    assert!(!interpreter.heap().is_live(value));
}

#[test]
fn test_unbounded_recursion_is_a_runtime_error() {
    run_with_large_stack(|| {
        let mut interpreter = Interpreter::new();
        interpreter.run("(define (down n) (down (+ n 1)))").unwrap();
        let live = interpreter.heap().live_count();

        let err = interpreter.run("(down 0)").unwrap_err();
        assert!(matches!(err, Error::RuntimeError(_)), "got {err:?}");
        assert!(
            err.message().contains(&MAX_EVAL_DEPTH.to_string()),
            "got {err}"
        );
        assert_eq!(interpreter.heap().live_count(), live);
        assert_eq!(interpreter.run("(+ 1 1)").unwrap(), "2");
    });
}

#[test]
fn test_nesting_beyond_parse_limit_is_a_syntax_error() {
    let mut interpreter = Interpreter::new();
    let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    let err = interpreter.run(&deep).unwrap_err();
    assert!(matches!(err, Error::SyntaxError(_)), "got {err:?}");
    assert!(err.message().contains("too deeply nested"), "got {err}");
}

#[test]
fn test_drop_after_cycles() {
    let mut interpreter = Interpreter::new();
    // a bare procedure name is the procedure itself, so g aliases f
    interpreter.run("(define (f x) f)").unwrap();
    interpreter.run("(define g f)").unwrap();
    assert_eq!(
        interpreter.bindings(),
        vec![
            ("f".to_owned(), "<procedure>".to_owned()),
            ("g".to_owned(), "<procedure>".to_owned()),
        ]
    );
    assert!(interpreter.heap().live_count() > 1);
    drop(interpreter);
}
