//! Loading and analysis steps shared by the commands.

use tracelet_compiler::{Analysis, Diagnostics, Env, Error, analyze};

use super::env_loader::{EnvArgs, load_env};
use super::script_loader::{Script, ScriptArgs, load_script};

/// Load the script and environment, or exit with an error.
pub fn load_or_exit(script: &ScriptArgs, env: &EnvArgs) -> (Script, Env) {
    let script = load_script(script).unwrap_or_else(|msg| exit_with(&msg));
    let env = load_env(env).unwrap_or_else(|msg| exit_with(&msg));
    (script, env)
}

/// Analyze the script; on failure print what went wrong and exit.
pub fn analyze_or_exit(
    script: &ScriptArgs,
    env: &EnvArgs,
    color: bool,
) -> (Script, Analysis, Diagnostics) {
    let (script, mut env) = load_or_exit(script, env);
    match analyze(&script.text, &mut env) {
        Ok((analysis, warnings)) => (script, analysis, warnings),
        Err(Error::ParseFailed(diagnostics) | Error::ResolveFailed(diagnostics)) => {
            eprint!("{}", render(&diagnostics, &script, color));
            std::process::exit(1);
        }
        Err(e) => exit_with(&e.to_string()),
    }
}

pub fn render(diagnostics: &Diagnostics, script: &Script, color: bool) -> String {
    diagnostics
        .printer()
        .source(&script.text)
        .path(&script.name)
        .colored(color)
        .render()
}

pub fn exit_with(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    std::process::exit(1);
}
