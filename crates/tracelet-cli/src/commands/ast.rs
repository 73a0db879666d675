use tracelet_compiler::ast::dump;
use tracelet_compiler::parser::parse;
use tracelet_core::Colors;

use super::env_loader::EnvArgs;
use super::run_common::{analyze_or_exit, exit_with, render};
use super::script_loader::{ScriptArgs, load_script};

pub struct AstArgs {
    pub script: ScriptArgs,
    pub env: EnvArgs,
    pub typed: bool,
    pub color: bool,
}

pub fn run(args: AstArgs) {
    let colors = Colors::new(args.color);

    if args.typed {
        let (_, analysis, _) = analyze_or_exit(&args.script, &args.env, args.color);
        print!("{}", dump(&analysis.ast, true, colors));
        return;
    }

    let script = load_script(&args.script).unwrap_or_else(|msg| exit_with(&msg));
    let (ast, diagnostics) = parse(&script.text).unwrap_or_else(|e| exit_with(&e.to_string()));
    if diagnostics.has_errors() {
        eprint!("{}", render(&diagnostics, &script, args.color));
        std::process::exit(1);
    }
    print!("{}", dump(&ast, false, colors));
}
