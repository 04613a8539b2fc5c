mod cli;

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use cocor_compiler::Compiler;

fn main() -> ExitCode {
    let matches = cli::build_cli().get_matches();
    let Some(grammar) = matches.get_one::<PathBuf>("grammar") else {
        unreachable!("clap enforces the positional");
    };
    let quiet = matches.get_flag("quiet");
    let colored = match matches.get_one::<String>("color").map(String::as_str) {
        Some("always") => true,
        Some("never") => false,
        _ => std::io::stderr().is_terminal(),
    };

    if !quiet {
        println!("cocor - recursive descent parser generator");
    }

    let mut compiler = Compiler::new(grammar).verbose(!quiet);
    if let Some(dir) = matches.get_one::<PathBuf>("frames") {
        compiler = compiler.frames_dir(dir);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("output") {
        compiler = compiler.out_dir(dir);
    }
    if let Some(ns) = matches.get_one::<String>("namespace") {
        compiler = compiler.namespace(ns.clone());
    }
    if let Some(switches) = matches.get_one::<String>("trace") {
        compiler = compiler.trace_switches(switches.clone());
    }

    let outcome = match compiler.run() {
        Ok(outcome) => outcome,
        Err(fatal) => {
            eprintln!("-- fatal error: {fatal}");
            return ExitCode::FAILURE;
        }
    };

    if !outcome.diagnostics.is_empty() {
        let source = fs::read_to_string(grammar).ok();
        let grammar_path = grammar.to_string_lossy();
        let mut printer = outcome.diagnostics.printer().colored(colored);
        if let Some(source) = &source {
            printer = printer.source(source).path(grammar_path.as_ref());
        }
        eprint!("{}", printer.render());
    }

    if let Some(path) = &outcome.trace_path {
        println!("trace output is in {}", path.display());
    }
    let errors = outcome.error_count();
    if !quiet {
        println!("{errors} errors detected");
    }
    ExitCode::from(errors.min(255) as u8)
}
