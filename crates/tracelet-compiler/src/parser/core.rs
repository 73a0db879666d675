//! Parser state and low-level token operations.

use rowan::{TextRange, TextSize};

use super::lexer::{SyntaxKind, Token, token_text};
use crate::Error;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

const DEFAULT_RECURSION_FUEL: u32 = 256;

/// Trivia tokens are dropped up front; positions index into the
/// significant tokens only.
pub struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) ast: Ast,
    pub(super) diagnostics: Diagnostics,
    pub(super) depth: u32,
    /// Inside `/pred/`, a bare `/` ends the predicate instead of dividing.
    pub(super) in_predicate: bool,
    recursion_fuel_limit: u32,
    fatal_error: Option<Error>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens: tokens.into_iter().filter(|t| !t.kind.is_trivia()).collect(),
            pos: 0,
            ast: Ast::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            in_predicate: false,
            recursion_fuel_limit: DEFAULT_RECURSION_FUEL,
            fatal_error: None,
        }
    }

    pub fn with_recursion_fuel(mut self, limit: u32) -> Self {
        self.recursion_fuel_limit = limit;
        self
    }

    pub fn parse_root(&mut self) {
        let root = self.parse_program();
        self.ast.set_root(root);
    }

    pub fn finish(self) -> Result<(Ast, Diagnostics), Error> {
        if let Some(err) = self.fatal_error {
            return Err(err);
        }
        Ok((self.ast, self.diagnostics))
    }

    pub(super) fn has_fatal_error(&self) -> bool {
        self.fatal_error.is_some()
    }

    pub(super) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(super) fn nth(&self, lookahead: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::Eof, |t| t.kind)
    }

    pub(super) fn nth_text(&self, lookahead: usize) -> &'src str {
        self.tokens
            .get(self.pos + lookahead)
            .map_or("", |t| token_text(self.source, t))
    }

    pub(super) fn current_text(&self) -> &'src str {
        self.nth_text(0)
    }

    pub(super) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    /// End of the last consumed token.
    pub(super) fn prev_end(&self) -> TextSize {
        match self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)) {
            Some(t) => t.span.end(),
            None => TextSize::from(0),
        }
    }

    pub(super) fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn should_stop(&self) -> bool {
        self.eof() || self.has_fatal_error()
    }

    pub(super) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(super) fn bump(&mut self) {
        if !self.eof() {
            self.pos += 1;
        }
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// On mismatch: emit diagnostic but don't consume.
    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error_at_current(DiagnosticKind::UnexpectedToken, format!("expected {}", what));
        false
    }

    pub(super) fn error_at_current(&mut self, kind: DiagnosticKind, msg: impl Into<String>) {
        let range = self.current_span();
        self.diagnostics.report(kind, range).message(msg).emit();
    }

    pub(super) fn error_at(&mut self, kind: DiagnosticKind, range: TextRange, msg: impl Into<String>) {
        self.diagnostics.report(kind, range).message(msg).emit();
    }

    /// Skip to the end of the current statement without consuming a closing brace.
    pub(super) fn recover_statement(&mut self) {
        let mut depth = 0u32;
        while !self.eof() {
            match self.current() {
                SyntaxKind::Semicolon if depth == 0 => {
                    self.bump();
                    return;
                }
                SyntaxKind::BraceClose if depth == 0 => return,
                SyntaxKind::BraceOpen | SyntaxKind::ParenOpen | SyntaxKind::BracketOpen => {
                    depth += 1
                }
                SyntaxKind::BraceClose | SyntaxKind::ParenClose | SyntaxKind::BracketClose => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if self.depth >= self.recursion_fuel_limit {
            if self.fatal_error.is_none() {
                self.fatal_error = Some(Error::RecursionLimitExceeded);
            }
            return false;
        }
        self.depth += 1;
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(super) fn alloc(&mut self, kind: NodeKind, start: TextSize) -> NodeId {
        let end = self.prev_end().max(start);
        self.ast.alloc(kind, TextRange::new(start, end))
    }

    pub(super) fn alloc_at(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        self.ast.alloc(kind, range)
    }

    /// Placeholder for an expression that failed to parse.
    pub(super) fn error_node(&mut self) -> NodeId {
        let range = TextRange::empty(self.current_span().start());
        self.ast.alloc(NodeKind::Integer { value: 0, negative: false }, range)
    }
}
