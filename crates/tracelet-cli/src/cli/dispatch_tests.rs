//! Tests for CLI dispatch logic.
//!
//! These tests verify that every command accepts the shared flags, that
//! conflicting inputs are rejected, and that params are extracted from
//! ArgMatches correctly.

use std::path::PathBuf;

use tracelet_core::StackMode;

use super::*;
use crate::cli::commands::{ast_command, check_command, types_command};

#[test]
fn check_extracts_script_and_strict() {
    let m = check_command()
        .try_get_matches_from(["check", "script.bt", "--strict"])
        .unwrap();
    let params = CheckParams::from_matches(&m);

    assert_eq!(params.common.script_path, Some(PathBuf::from("script.bt")));
    assert_eq!(params.common.script_text, None);
    assert!(params.strict);
}

#[test]
fn inline_script() {
    let m = check_command()
        .try_get_matches_from(["check", "-e", "BEGIN { $a = 1; }"])
        .unwrap();
    let params = CheckParams::from_matches(&m);

    assert_eq!(params.common.script_path, None);
    assert_eq!(
        params.common.script_text.as_deref(),
        Some("BEGIN { $a = 1; }")
    );
    assert!(!params.strict);
}

#[test]
fn script_path_and_text_conflict() {
    let result = check_command().try_get_matches_from(["check", "script.bt", "-e", "BEGIN {}"]);
    assert!(result.is_err());
}

#[test]
fn environment_flags() {
    let m = types_command()
        .try_get_matches_from([
            "types",
            "script.bt",
            "--types",
            "kernel.json",
            "--max-strlen",
            "128",
            "--stack-mode",
            "perf",
            "--max-rounds",
            "5",
        ])
        .unwrap();
    let params = TypesParams::from_matches(&m);

    assert_eq!(params.common.types_file, Some(PathBuf::from("kernel.json")));
    assert_eq!(params.common.max_strlen, Some(128));
    assert_eq!(params.common.stack_mode, Some(StackMode::Perf));
    assert_eq!(params.common.max_rounds, Some(5));
    assert!(!params.json);
}

#[test]
fn environment_flags_default_to_unset() {
    let m = types_command()
        .try_get_matches_from(["types", "script.bt", "--json"])
        .unwrap();
    let params = TypesParams::from_matches(&m);

    assert_eq!(params.common.types_file, None);
    assert_eq!(params.common.max_strlen, None);
    assert_eq!(params.common.stack_mode, None);
    assert_eq!(params.common.max_rounds, None);
    assert_eq!(params.common.color, ColorChoice::Auto);
    assert!(params.json);
}

#[test]
fn unknown_stack_mode_is_rejected() {
    let result = check_command().try_get_matches_from(["check", "s.bt", "--stack-mode", "fancy"]);
    assert!(result.is_err());
}

#[test]
fn invalid_round_cap_is_rejected() {
    let result = check_command().try_get_matches_from(["check", "s.bt", "--max-rounds", "many"]);
    assert!(result.is_err());
}

#[test]
fn ast_typed_and_color() {
    let m = ast_command()
        .try_get_matches_from(["ast", "script.bt", "--typed", "--color", "never"])
        .unwrap();
    let params = AstParams::from_matches(&m);

    assert!(params.typed);
    assert_eq!(params.common.color, ColorChoice::Never);
}

#[test]
fn verbosity_is_counted() {
    let m = ast_command()
        .try_get_matches_from(["ast", "script.bt", "-vv"])
        .unwrap();
    assert_eq!(CommonParams::from_matches(&m).verbose, 2);

    let m = ast_command().try_get_matches_from(["ast", "script.bt"]).unwrap();
    assert_eq!(CommonParams::from_matches(&m).verbose, 0);
}

#[test]
fn command_specific_flags_stay_local() {
    let result = ast_command().try_get_matches_from(["ast", "script.bt", "--strict"]);
    assert!(result.is_err());

    let result = check_command().try_get_matches_from(["check", "script.bt", "--json"]);
    assert!(result.is_err());
}

#[test]
fn subcommand_is_required() {
    let result = build_cli().try_get_matches_from(["tracelet"]);
    assert!(result.is_err());
}

#[test]
fn help_lists_shared_flags() {
    let help = check_command().render_help().to_string();
    for flag in ["--expr", "--types", "--max-strlen", "--stack-mode", "--max-rounds", "--strict"] {
        assert!(help.contains(flag), "missing {flag} in:\n{help}");
    }
}

#[test]
fn color_choice() {
    assert!(ColorChoice::Always.should_colorize());
    assert!(!ColorChoice::Never.should_colorize());
}
