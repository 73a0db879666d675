use super::env_loader::EnvArgs;
use super::run_common::{analyze_or_exit, render};
use super::script_loader::ScriptArgs;

pub struct CheckArgs {
    pub script: ScriptArgs,
    pub env: EnvArgs,
    pub strict: bool,
    pub color: bool,
}

pub fn run(args: CheckArgs) {
    let (script, analysis, warnings) = analyze_or_exit(&args.script, &args.env, args.color);
    tracing::debug!(rounds = analysis.resolve.rounds, "script resolved");

    if !warnings.is_empty() {
        eprint!("{}", render(&warnings, &script, args.color));
    }
    if args.strict && warnings.has_warnings() {
        std::process::exit(1);
    }

    // Silent on success (like cargo check)
}
