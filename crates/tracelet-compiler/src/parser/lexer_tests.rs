use super::lexer::{SyntaxKind, lex, token_text};

fn kinds(source: &str) -> Vec<(SyntaxKind, &str)> {
    lex(source)
        .iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| (t.kind, token_text(source, t)))
        .collect()
}

#[test]
fn sigils_and_keywords() {
    let tokens = kinds("let $x = @m[pid]; if comptime");
    assert_eq!(
        tokens,
        vec![
            (SyntaxKind::KwLet, "let"),
            (SyntaxKind::Variable, "$x"),
            (SyntaxKind::Assign, "="),
            (SyntaxKind::Map, "@m"),
            (SyntaxKind::BracketOpen, "["),
            (SyntaxKind::Ident, "pid"),
            (SyntaxKind::BracketClose, "]"),
            (SyntaxKind::Semicolon, ";"),
            (SyntaxKind::KwIf, "if"),
            (SyntaxKind::KwComptime, "comptime"),
        ]
    );
}

#[test]
fn longest_operator_wins() {
    let tokens: Vec<_> = kinds("<<= >>= << <= && & ++ += .. . ->")
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(
        tokens,
        vec![
            SyntaxKind::ShlEq,
            SyntaxKind::ShrEq,
            SyntaxKind::Shl,
            SyntaxKind::Le,
            SyntaxKind::AmpAmp,
            SyntaxKind::Amp,
            SyntaxKind::PlusPlus,
            SyntaxKind::PlusEq,
            SyntaxKind::DotDot,
            SyntaxKind::Dot,
            SyntaxKind::Arrow,
        ]
    );
}

#[test]
fn range_is_not_a_float() {
    let tokens = kinds("0..10");
    assert_eq!(
        tokens,
        vec![
            (SyntaxKind::Integer, "0"),
            (SyntaxKind::DotDot, ".."),
            (SyntaxKind::Integer, "10"),
        ]
    );
}

#[test]
fn comments_are_trivia() {
    let source = "// line\n/* block */ 0x1f";
    let all = lex(source);
    assert_eq!(all.len(), 5);
    assert_eq!(kinds(source), vec![(SyntaxKind::Integer, "0x1f")]);
}

#[test]
fn string_with_escapes() {
    let tokens = kinds(r#""a \"b\" c""#);
    assert_eq!(tokens, vec![(SyntaxKind::StringLiteral, r#""a \"b\" c""#)]);
}

#[test]
fn anonymous_map() {
    assert_eq!(kinds("@ = 1")[0], (SyntaxKind::Map, "@"));
}

#[test]
fn garbage_is_coalesced() {
    let tokens = kinds("$x ##` 1");
    assert_eq!(
        tokens,
        vec![
            (SyntaxKind::Variable, "$x"),
            (SyntaxKind::Garbage, "##`"),
            (SyntaxKind::Integer, "1"),
        ]
    );
}
