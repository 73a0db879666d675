mod cli;
mod commands;

use tracing_subscriber::EnvFilter;

use cli::{AstParams, CheckParams, CommonParams, TypesParams, build_cli};

/// Variable that overrides the `-v` level with a full filter directive.
const LOG_ENV: &str = "TRACELET_LOG";

fn main() {
    let matches = build_cli().get_matches();

    if let Some((_, m)) = matches.subcommand() {
        init_tracing(CommonParams::from_matches(m).verbose);
    }

    match matches.subcommand() {
        Some(("check", m)) => {
            let params = CheckParams::from_matches(m);
            commands::check::run(params.into());
        }
        Some(("types", m)) => {
            let params = TypesParams::from_matches(m);
            commands::types::run(params.into());
        }
        Some(("ast", m)) => {
            let params = AstParams::from_matches(m);
            commands::ast::run(params.into());
        }
        _ => unreachable!("clap should have caught this"),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "tracelet_compiler=debug",
        _ => "tracelet_compiler=trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
