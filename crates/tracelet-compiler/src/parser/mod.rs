//! Lexer and recursive-descent parser producing the script [`Ast`].
//!
//! The parser is resilient: it always produces a tree, reporting syntax
//! problems as diagnostics and substituting placeholder nodes. Only
//! recursion fuel exhaustion is a hard error.

pub mod lexer;

mod core;
mod grammar;

#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod parser_tests;

pub use core::Parser;
pub use lexer::{SyntaxKind, Token, lex};

use crate::PassResult;
use crate::ast::Ast;

/// Main entry point. Returns Err on fuel exhaustion.
pub fn parse(source: &str) -> PassResult<Ast> {
    parse_with_parser(Parser::new(source, lex(source)))
}

/// Parse with a pre-configured parser (for custom fuel limits).
pub(crate) fn parse_with_parser(mut parser: Parser) -> PassResult<Ast> {
    parser.parse_root();
    parser.finish()
}
