use minischeme::ast::Value;
use minischeme::evaluator;
use minischeme::reader::parse;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("Minischeme - a minimal Scheme interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let env = evaluator::create_global_env();

    loop {
        match rl.readline("minischeme> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                let result = match parse(line) {
                    Ok(expr) => evaluator::eval(&expr, &env),
                    Err(e) => Err(e),
                };

                match result {
                    Ok(result) => {
                        // Don't print Unspecified values (e.g., from define)
                        if !matches!(result, Value::Unspecified) {
                            println!("{result}");
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Minischeme commands:");
    println!("  :help - Show this help message");
    println!("  :env  - Show current environment bindings");
    println!("  :quit - Exit the interpreter");
    println!("  :exit - Exit the interpreter");
    println!("  Ctrl+C - Exit the interpreter");
    println!();
    println!("Supported syntax:");
    println!("  Numbers: 42, -5, 3.5");
    println!("  Booleans: #t / #f (only #f is false)");
    println!("  Strings: \"hello\" (no escape sequences)");
    println!("  Quoting: 'expr, (quote expr)");
    println!("  Special forms: quote, if, define, set!, lambda, cond, let");
    println!("  call/cc: one-shot escape only");
    println!();
    println!("Examples:");
    println!("  (+ 1 2 3)");
    println!("  (define square (lambda (x) (* x x)))");
    println!("  (square 7)");
    println!("  (call/cc (lambda (k) (+ 1 (k 5))))");
    println!();
}

fn print_environment(env: &evaluator::Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate primitives from user-defined values
    let mut primitives = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Primitive { .. } => primitives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !primitives.is_empty() {
        println!("Primitives ({}):", primitives.len());
        // Print in columns for readability
        let mut col = 0;
        for name in primitives {
            print!("  {name:<12}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
