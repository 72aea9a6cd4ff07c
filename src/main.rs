// tau - Command-line interface for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tau_embed::{Engine, EngineConfig, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tau", version)]
#[command(about = "The tau programming language", long_about = None)]
struct Cli {
    /// Source (.tau) or bytecode (.tauc) files to run; starts a REPL if none
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Compile each file to <FILE>.tauc instead of running it
    #[arg(short, long)]
    compile: bool,

    /// Print each file's bytecode listing instead of running it
    #[arg(short, long, conflicts_with = "compile")]
    disassemble: bool,

    /// Library root searched by import before those in TAU_PATH (repeatable)
    #[arg(short = 'I', long = "lib", value_name = "DIR")]
    lib: Vec<PathBuf>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut config = EngineConfig::from_env();
    for dir in cli.lib.iter().rev() {
        config = config.with_lib_path(dir);
    }
    debug!(lib_paths = ?config.lib_paths, "configured");
    let mut engine = Engine::with_config(config);

    if cli.files.is_empty() {
        if cli.compile || cli.disassemble {
            eprintln!("tau: --compile and --disassemble need at least one file");
            process::exit(2);
        }
        run_repl(&mut engine);
        return;
    }

    for file in &cli.files {
        let result = if cli.compile {
            engine.compile_file(file).map(|out| debug!(file = %out.display(), "compiled"))
        } else if cli.disassemble {
            engine.disassemble_file(file).map(|listing| print!("{}", listing))
        } else {
            engine.run_file(file).map(drop)
        };
        if let Err(e) = result {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Net count of opening brackets, ignoring those inside string literals.
fn open_brackets(src: &str) -> i64 {
    let mut depth = 0;
    let mut quote = None;
    let mut escaped = false;
    for c in src.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q == '"' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '`' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

/// Run the interactive REPL. Input with unclosed brackets continues on the
/// next line.
fn run_repl(engine: &mut Engine) {
    println!("tau v{}", env!("CARGO_PKG_VERSION"));

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();
    loop {
        print!("{}", if buffer.is_empty() { ">>> " } else { "... " });
        if io::stdout().flush().is_err() {
            break;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Read error: {}", e);
                break;
            }
            None => {
                println!();
                break;
            }
        };
        buffer.push_str(&line);
        buffer.push('\n');
        if open_brackets(&buffer) > 0 {
            continue;
        }

        let input = std::mem::take(&mut buffer);
        if input.trim().is_empty() {
            continue;
        }
        match engine.eval(&input) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("{}", e),
        }
    }
}
