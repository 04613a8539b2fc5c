//! Argument builders for the `coco` command.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, value_parser};

/// Attributed grammar file (positional).
fn grammar_arg() -> Arg {
    Arg::new("grammar")
        .value_name("GRAMMAR")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Attributed grammar file")
}

/// Directory holding the frame files (--frames).
fn frames_arg() -> Arg {
    Arg::new("frames")
        .long("frames")
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Directory holding Scanner.frame and Parser.frame")
}

/// Output directory (-o/--output).
fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Output directory (defaults to the grammar's directory)")
}

/// Namespace or package for the emitted code (--namespace).
fn namespace_arg() -> Arg {
    Arg::new("namespace")
        .long("namespace")
        .value_name("ID")
        .help("Namespace for the generated scanner and parser")
}

/// Trace switches (--trace).
fn trace_arg() -> Arg {
    Arg::new("trace")
        .long("trace")
        .value_name("SWITCHES")
        .help(
            "Trace switches, digits or letters: 0/A automaton, 1/F first & follow, \
             2/G syntax graph, 3/I FIRST trace, 4/J ANY & SYNC, 6/S symbol table, \
             7/X cross reference, 8/P statistics",
        )
}

/// Color output control (--color).
fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize diagnostics")
}

/// Quiet mode (-q/--quiet).
fn quiet_arg() -> Arg {
    Arg::new("quiet")
        .short('q')
        .long("quiet")
        .action(ArgAction::SetTrue)
        .help("Suppress progress output")
}

pub fn build_cli() -> Command {
    Command::new("coco")
        .about("Generates a recursive-descent parser and scanner from an attributed grammar")
        .arg(grammar_arg())
        .arg(frames_arg())
        .arg(output_arg())
        .arg(namespace_arg())
        .arg(trace_arg())
        .arg(color_arg())
        .arg(quiet_arg())
}
