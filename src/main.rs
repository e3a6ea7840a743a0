use anyhow::Context;
use arilisp::{Interpreter, InterpreterConfig};
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, IsTerminal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Interactive interpreter for a small Lisp dialect
#[derive(Debug, Parser)]
#[command(name = "arilisp", version, about)]
struct Args {
    /// Log interpreter internals (heap sweeps, failed evaluations) to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Never sweep the heap between evaluations
    #[arg(long)]
    no_gc: bool,

    /// Print heap statistics to stderr after every line
    #[arg(long)]
    stats: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut interpreter = Interpreter::with_config(InterpreterConfig {
        collect_garbage: !args.no_gc,
    });

    if std::io::stdin().is_terminal() {
        run_repl(&mut interpreter, args.stats)
    } else {
        run_piped(&mut interpreter, args.stats)
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn heap_summary(interpreter: &Interpreter) -> String {
    let stats = interpreter.stats();
    format!(
        "allocated: {}, freed: {}, collections: {}, live: {}",
        stats.allocated,
        stats.freed,
        stats.collections,
        interpreter.heap().live_count()
    )
}

fn run_line(interpreter: &mut Interpreter, line: &str, stats: bool) {
    match interpreter.run(line) {
        Ok(output) => println!("{output}"),
        Err(err) => println!("{err}"),
    }
    if stats {
        eprintln!("{}", heap_summary(interpreter));
    }
}

/// One result or error per input line, no prompt
fn run_piped(interpreter: &mut Interpreter, stats: bool) -> anyhow::Result<()> {
    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read standard input")?;
        if line.trim().is_empty() {
            continue;
        }
        run_line(interpreter, &line, stats);
    }
    Ok(())
}

fn run_repl(interpreter: &mut Interpreter, stats: bool) -> anyhow::Result<()> {
    println!("arilisp - enter expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+D to exit.");
    println!();

    let mut rl = DefaultEditor::new().context("could not initialize line editor")?;

    loop {
        match rl.readline("arilisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => print_help(),
                    ":env" => print_environment(interpreter),
                    ":gc" => {
                        let freed = interpreter.collect(&[]);
                        println!("freed {freed} values");
                        println!("{}", heap_summary(interpreter));
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => run_line(interpreter, line, stats),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(err).context("failed to read input"),
        }
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help        show this help");
    println!("  :env         list global bindings");
    println!("  :gc          sweep the heap now");
    println!("  :quit :exit  leave the interpreter");
    println!();
    println!("Special forms: quote ' if and or define set! lambda");
    println!("Numbers:       + - * / max min abs = < > <= >= number?");
    println!("Booleans:      not boolean?");
    println!("Lists:         cons car cdr list list-ref list-tail set-car! set-cdr!");
    println!("               pair? null? list? symbol?");
}

fn print_environment(interpreter: &Interpreter) {
    let bindings = interpreter.bindings();
    if bindings.is_empty() {
        println!("No global bindings.");
        return;
    }
    for (name, value) in bindings {
        println!("  {name} = {value}");
    }
}
