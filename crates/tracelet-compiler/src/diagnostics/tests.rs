use rowan::TextRange;

use super::*;

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn severity_display() {
    insta::assert_snapshot!(format!("{}", Severity::Error), @"error");
    insta::assert_snapshot!(format!("{}", Severity::Warning), @"warning");
}

#[test]
fn report_with_default_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnresolvedComptime, range(0, 5))
        .emit();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.has_errors());
    insta::assert_snapshot!(diagnostics.printer().render(), @"error at 0..5: Unable to resolve comptime expression");
}

#[test]
fn report_with_custom_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnknownFunction, range(0, 3))
        .message("foo")
        .emit();

    insta::assert_snapshot!(diagnostics.printer().render(), @"error at 0..3: Unknown function: 'foo'");
}

#[test]
fn warnings_are_counted_separately() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::SignMismatch, range(0, 1))
        .message("arithmetic on integers of different signs")
        .emit();

    assert!(!diagnostics.has_errors());
    assert!(diagnostics.has_warnings());
    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(diagnostics.error_count(), 0);
}

#[test]
fn identical_reports_are_deduplicated() {
    let mut diagnostics = Diagnostics::new();
    for _ in 0..3 {
        diagnostics
            .report(DiagnosticKind::TypeMismatch, range(4, 9))
            .message("Type mismatch for $a")
            .emit();
    }
    diagnostics
        .report(DiagnosticKind::TypeMismatch, range(10, 12))
        .message("Type mismatch for $a")
        .emit();

    assert_eq!(diagnostics.len(), 2);
}

#[test]
fn related_and_hints_in_plain_output() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::AggregateAssignment, range(0, 2))
        .message("primary")
        .related_to("declared here", range(5, 7))
        .hint("try this")
        .emit();

    insta::assert_snapshot!(diagnostics.printer().render(), @"error at 0..2: primary (related: declared here at 5..7) (hint: try this)");
}

#[test]
fn default_hint_is_attached() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::SignedDivision, range(0, 1))
        .message("signed operands for '/' can lead to undefined behavior")
        .emit();

    let msg = diagnostics.iter().next().unwrap();
    assert_eq!(msg.hints(), ["cast to unsigned to silence this warning"]);
}

#[test]
fn render_with_source() {
    let source = "$a = 1;";
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnresolvedVariable, range(0, 2))
        .emit();

    let rendered = diagnostics.printer().source(source).path("t.bt").render();
    assert!(rendered.contains("Could not resolve the type of this variable"));
    assert!(rendered.contains("t.bt"));
}

#[test]
fn render_empty_range_points_at_one_char() {
    let source = "x";
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::ExpectedExpression, range(1, 1))
        .emit();

    let rendered = diagnostics.render(source);
    assert!(rendered.contains("expected an expression"));
}
