//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` so every subcommand declares the
//! script input, environment and output flags the same way.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Script file (positional, "-" for stdin).
pub fn script_path_arg() -> Arg {
    Arg::new("script_path")
        .value_name("SCRIPT")
        .value_parser(value_parser!(PathBuf))
        .conflicts_with("script_text")
        .help("Script file (use \"-\" for stdin)")
}

/// Inline script text (-e/--expr).
pub fn script_text_arg() -> Arg {
    Arg::new("script_text")
        .short('e')
        .long("expr")
        .value_name("TEXT")
        .help("Inline script text")
}

/// Type provider file (--types).
pub fn types_file_arg() -> Arg {
    Arg::new("types_file")
        .long("types")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("JSON file with kernel structs, types, functions and probe arguments")
}

/// Upper bound for string builtins (--max-strlen).
pub fn max_strlen_arg() -> Arg {
    Arg::new("max_strlen")
        .long("max-strlen")
        .value_name("N")
        .value_parser(value_parser!(usize))
        .help("Maximum length of str() and path() results (default: 64)")
}

/// Stack mode for kstack/ustack (--stack-mode).
pub fn stack_mode_arg() -> Arg {
    Arg::new("stack_mode")
        .long("stack-mode")
        .value_name("MODE")
        .value_parser(["bpftrace", "perf", "raw"])
        .help("Default stack mode of kstack and ustack (default: raw)")
}

/// Resolution round cap (--max-rounds).
pub fn max_rounds_arg() -> Arg {
    Arg::new("max_rounds")
        .long("max-rounds")
        .value_name("N")
        .value_parser(value_parser!(u32))
        .help("Give up after this many resolution rounds (default: 50)")
}

/// Color output control (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

/// Treat warnings as errors (--strict).
pub fn strict_arg() -> Arg {
    Arg::new("strict")
        .long("strict")
        .action(ArgAction::SetTrue)
        .help("Treat warnings as errors")
}

/// Machine-readable output (--json).
pub fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print the type table as JSON")
}

/// Annotate AST nodes with their types (--typed).
pub fn typed_arg() -> Arg {
    Arg::new("typed")
        .long("typed")
        .action(ArgAction::SetTrue)
        .help("Resolve types and show them next to each node")
}

/// Verbosity level (-v, -vv).
pub fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .help("Log resolution rounds (-v) or every propagation (-vv); TRACELET_LOG overrides")
}
