//! Command builders for the CLI.
//!
//! All commands read a script the same way and accept the same environment
//! flags, so they are added in one place.

use clap::Command;

use super::args::*;

/// Script input, environment and logging flags shared by every command.
fn with_common_args(cmd: Command) -> Command {
    cmd.arg(script_path_arg())
        .arg(script_text_arg())
        .arg(types_file_arg())
        .arg(max_strlen_arg())
        .arg(stack_mode_arg())
        .arg(max_rounds_arg())
        .arg(color_arg())
        .arg(verbose_arg())
}

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("tracelet")
        .about("Type checker for tracelet tracing scripts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(check_command())
        .subcommand(types_command())
        .subcommand(ast_command())
}

/// Parse and resolve a script, reporting diagnostics.
pub fn check_command() -> Command {
    let cmd = Command::new("check")
        .about("Type-check a script")
        .override_usage(
            "\
  tracelet check <SCRIPT>
  tracelet check -e <TEXT>",
        )
        .after_help(
            r#"EXAMPLES:
  tracelet check script.bt                      # diagnostics only
  tracelet check script.bt --strict             # fail on warnings too
  tracelet check -e 'BEGIN { @a = count(); }'   # inline script
  tracelet check script.bt --types kernel.json  # with kernel types"#,
        )
        .arg(strict_arg());

    with_common_args(cmd)
}

/// Print the resolved map and variable types.
pub fn types_command() -> Command {
    let cmd = Command::new("types")
        .about("Show resolved map and variable types")
        .override_usage(
            "\
  tracelet types <SCRIPT> [--json]
  tracelet types -e <TEXT> [--json]",
        )
        .after_help(
            r#"EXAMPLES:
  tracelet types script.bt
  tracelet types -e 'BEGIN { @m[1, "a"] = 2; }' --json"#,
        )
        .arg(json_arg());

    with_common_args(cmd)
}

/// Dump the script AST.
pub fn ast_command() -> Command {
    let cmd = Command::new("ast")
        .about("Show the AST of a script")
        .override_usage(
            "\
  tracelet ast <SCRIPT> [--typed]
  tracelet ast -e <TEXT> [--typed]",
        )
        .after_help(
            r#"EXAMPLES:
  tracelet ast script.bt             # as parsed
  tracelet ast script.bt --typed     # after resolution, with types
  tracelet ast -e 'BEGIN { $a = 1; }'"#,
        )
        .arg(typed_arg());

    with_common_args(cmd)
}
