//! Dispatch logic: extract params from ArgMatches and convert to command args.
//!
//! `*Params` structs mirror the command `*Args` but keep the raw color
//! choice; the `Into<*Args>` impls resolve it against the terminal.

use std::path::PathBuf;

use clap::ArgMatches;
use tracelet_core::StackMode;

use super::ColorChoice;
use crate::commands::ast::AstArgs;
use crate::commands::check::CheckArgs;
use crate::commands::env_loader::EnvArgs;
use crate::commands::script_loader::ScriptArgs;
use crate::commands::types::TypesArgs;

/// Flags every command accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonParams {
    pub script_path: Option<PathBuf>,
    pub script_text: Option<String>,
    pub types_file: Option<PathBuf>,
    pub max_strlen: Option<usize>,
    pub stack_mode: Option<StackMode>,
    pub max_rounds: Option<u32>,
    pub color: ColorChoice,
    pub verbose: u8,
}

impl CommonParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            script_path: m.get_one::<PathBuf>("script_path").cloned(),
            script_text: m.get_one::<String>("script_text").cloned(),
            types_file: m.get_one::<PathBuf>("types_file").cloned(),
            max_strlen: m.get_one::<usize>("max_strlen").copied(),
            // The value parser only admits known modes.
            stack_mode: m
                .get_one::<String>("stack_mode")
                .and_then(|mode| StackMode::parse(mode)),
            max_rounds: m.get_one::<u32>("max_rounds").copied(),
            color: parse_color(m),
            verbose: m.get_count("verbose"),
        }
    }

    fn script(&self) -> ScriptArgs {
        ScriptArgs {
            path: self.script_path.clone(),
            text: self.script_text.clone(),
        }
    }

    fn env(&self) -> EnvArgs {
        EnvArgs {
            types_file: self.types_file.clone(),
            max_strlen: self.max_strlen,
            stack_mode: self.stack_mode,
            max_rounds: self.max_rounds,
        }
    }
}

pub struct CheckParams {
    pub common: CommonParams,
    pub strict: bool,
}

impl CheckParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            common: CommonParams::from_matches(m),
            strict: m.get_flag("strict"),
        }
    }
}

impl From<CheckParams> for CheckArgs {
    fn from(p: CheckParams) -> Self {
        Self {
            script: p.common.script(),
            env: p.common.env(),
            strict: p.strict,
            color: p.common.color.should_colorize(),
        }
    }
}

pub struct TypesParams {
    pub common: CommonParams,
    pub json: bool,
}

impl TypesParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            common: CommonParams::from_matches(m),
            json: m.get_flag("json"),
        }
    }
}

impl From<TypesParams> for TypesArgs {
    fn from(p: TypesParams) -> Self {
        Self {
            script: p.common.script(),
            env: p.common.env(),
            json: p.json,
            color: p.common.color.should_colorize(),
        }
    }
}

pub struct AstParams {
    pub common: CommonParams,
    pub typed: bool,
}

impl AstParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            common: CommonParams::from_matches(m),
            typed: m.get_flag("typed"),
        }
    }
}

impl From<AstParams> for AstArgs {
    fn from(p: AstParams) -> Self {
        Self {
            script: p.common.script(),
            env: p.common.env(),
            typed: p.typed,
            color: p.common.color.should_colorize(),
        }
    }
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(|s| s.as_str()) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
