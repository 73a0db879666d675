//! Grammar productions.
//!
//! Statements and items are parsed with simple lookahead; expressions use
//! precedence climbing over [`binop_info`]. Every production that recurses
//! spends recursion fuel so pathological inputs fail with
//! `Error::RecursionLimitExceeded` instead of overflowing the stack.

use rowan::{TextRange, TextSize};
use tracelet_core::{SizedType, StructRef};

use super::core::Parser;
use super::lexer::SyntaxKind;
use crate::ast::{
    AttachPoint, BinOp, Iterable, JumpKind, NodeId, NodeKind, RecordField, TypeofArg, UnOp,
};
use crate::diagnostics::DiagnosticKind;

const TERNARY_PREC: u8 = 1;

fn binop_info(kind: SyntaxKind) -> Option<(BinOp, u8)> {
    use SyntaxKind::*;
    Some(match kind {
        PipePipe => (BinOp::LOr, 2),
        AmpAmp => (BinOp::LAnd, 3),
        Pipe => (BinOp::BOr, 4),
        Caret => (BinOp::BXor, 5),
        Amp => (BinOp::BAnd, 6),
        EqEq => (BinOp::Eq, 7),
        NotEq => (BinOp::Ne, 7),
        Lt => (BinOp::Lt, 8),
        Le => (BinOp::Le, 8),
        Gt => (BinOp::Gt, 8),
        Ge => (BinOp::Ge, 8),
        Shl => (BinOp::Shl, 9),
        Shr => (BinOp::Shr, 9),
        Plus => (BinOp::Plus, 10),
        Minus => (BinOp::Minus, 10),
        Star => (BinOp::Mul, 11),
        Slash => (BinOp::Div, 11),
        Percent => (BinOp::Mod, 11),
        _ => return None,
    })
}

fn compound_op(kind: SyntaxKind) -> Option<BinOp> {
    use SyntaxKind::*;
    Some(match kind {
        PlusEq => BinOp::Plus,
        MinusEq => BinOp::Minus,
        StarEq => BinOp::Mul,
        SlashEq => BinOp::Div,
        PercentEq => BinOp::Mod,
        AmpEq => BinOp::BAnd,
        PipeEq => BinOp::BOr,
        CaretEq => BinOp::BXor,
        ShlEq => BinOp::Shl,
        ShrEq => BinOp::Shr,
        _ => return None,
    })
}

/// Builtin identifiers; anything else without a call is an `Identifier`.
fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "pid"
            | "tid"
            | "nsecs"
            | "elapsed"
            | "cgroup"
            | "uid"
            | "gid"
            | "cpu"
            | "rand"
            | "jiffies"
            | "ncpus"
            | "cpid"
            | "comm"
            | "usermode"
            | "kstack"
            | "ustack"
            | "curtask"
            | "ctx"
            | "args"
            | "retval"
            | "func"
            | "probe"
            | "username"
    ) || name
        .strip_prefix("arg")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn unescape(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn parse_int_literal(text: &str) -> Option<u64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    match clean
        .strip_prefix("0x")
        .or_else(|| clean.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => clean.parse().ok(),
    }
}

impl Parser<'_> {
    pub(super) fn parse_program(&mut self) -> NodeId {
        let start = self.current_span().start();
        let mut items = Vec::new();
        while !self.should_stop() {
            let before = self.pos;
            match self.current() {
                SyntaxKind::KwStruct | SyntaxKind::KwUnion => items.push(self.parse_struct_def()),
                SyntaxKind::KwFn => items.push(self.parse_subprog()),
                SyntaxKind::Semicolon => self.bump(),
                _ => {
                    if let Some(probe) = self.parse_probe() {
                        items.push(probe);
                    }
                }
            }
            if self.pos == before {
                self.bump();
            }
        }
        let range = TextRange::new(start.min(self.eof_offset()), self.eof_offset());
        self.alloc_at(NodeKind::Program { items }, range)
    }

    fn parse_struct_def(&mut self) -> NodeId {
        let start = self.current_span().start();
        let keyword = self.current_text();
        self.bump();
        let name = if self.at(SyntaxKind::Ident) {
            let name = format!("{} {}", keyword, self.current_text());
            self.bump();
            name
        } else {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected struct name");
            String::new()
        };

        let mut fields = Vec::new();
        if self.expect(SyntaxKind::BraceOpen, "'{'") {
            while !self.should_stop() && !self.at(SyntaxKind::BraceClose) {
                let before = self.pos;
                match self.parse_struct_field() {
                    Some(field) => fields.push(field),
                    None => self.recover_statement(),
                }
                if self.pos == before {
                    self.bump();
                }
            }
            self.expect(SyntaxKind::BraceClose, "'}'");
        }
        self.eat(SyntaxKind::Semicolon);
        self.alloc(NodeKind::StructDef { name, fields }, start)
    }

    /// `T name;`, `T *name;` or `T name[N];`
    fn parse_struct_field(&mut self) -> Option<(String, SizedType)> {
        let mut ty = self.parse_type()?;
        if !self.at(SyntaxKind::Ident) {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected field name");
            return None;
        }
        let name = self.current_text().to_string();
        self.bump();
        if self.eat(SyntaxKind::BracketOpen) {
            let len = self.parse_array_len()?;
            ty = SizedType::array(ty, len);
        }
        self.expect(SyntaxKind::Semicolon, "';'");
        Some((name, ty))
    }

    fn parse_array_len(&mut self) -> Option<usize> {
        let len = if self.at(SyntaxKind::Integer) {
            let len = parse_int_literal(self.current_text()).and_then(|n| usize::try_from(n).ok());
            self.bump();
            len
        } else {
            None
        };
        if len.is_none() {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected array length");
        }
        self.expect(SyntaxKind::BracketClose, "']'");
        len
    }

    fn parse_subprog(&mut self) -> NodeId {
        let start = self.current_span().start();
        self.bump();
        let name = if self.at(SyntaxKind::Ident) {
            let sym = self.ast.intern(self.current_text());
            self.bump();
            sym
        } else {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected function name");
            self.ast.intern("")
        };

        let mut args = Vec::new();
        if self.expect(SyntaxKind::ParenOpen, "'('") {
            while !self.should_stop() && !self.at(SyntaxKind::ParenClose) {
                let arg_start = self.current_span().start();
                if !self.at(SyntaxKind::Variable) {
                    self.error_at_current(DiagnosticKind::UnexpectedToken, "expected parameter");
                    break;
                }
                let var = self.parse_variable();
                self.expect(SyntaxKind::Colon, "':'");
                let ty = self.parse_type_node();
                args.push(self.alloc(NodeKind::SubprogArg { var, ty }, arg_start));
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::ParenClose, "')'");
        }

        let ret = if self.eat(SyntaxKind::Colon) {
            self.parse_type().unwrap_or_default()
        } else {
            SizedType::void()
        };
        let body = self.parse_block();
        self.alloc(NodeKind::Subprog { name, args, ret, body }, start)
    }

    /// Attach points are raw text up to the body brace or a predicate slash
    /// preceded by whitespace (`uprobe:/bin/sh:f` keeps its path).
    fn parse_probe(&mut self) -> Option<NodeId> {
        let start = self.current_span().start();
        while !self.eof() {
            match self.current() {
                SyntaxKind::BraceOpen => break,
                SyntaxKind::Slash if self.preceded_by_whitespace() => break,
                _ => self.bump(),
            }
        }
        let end = self.current_span().start();
        let raw = &self.source[usize::from(start)..usize::from(end)];
        let attach_range = TextRange::new(start, end.max(start));

        let mut attach = Vec::new();
        for part in raw.split(',') {
            match AttachPoint::parse(part) {
                Some(point) => attach.push(point),
                None => {
                    let msg = format!("invalid attach point '{}'", part.trim());
                    self.error_at(DiagnosticKind::InvalidAttachPoint, attach_range, msg);
                }
            }
        }

        let pred = if self.at(SyntaxKind::Slash) {
            self.bump();
            let saved = std::mem::replace(&mut self.in_predicate, true);
            let pred = self.parse_expr();
            self.in_predicate = saved;
            self.expect(SyntaxKind::Slash, "'/' to close predicate");
            Some(pred)
        } else {
            None
        };

        if !self.at(SyntaxKind::BraceOpen) {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected '{'");
            return None;
        }
        let body = self.parse_block();
        if attach.is_empty() {
            return None;
        }
        Some(self.alloc(NodeKind::Probe { attach, pred, body }, start))
    }

    fn preceded_by_whitespace(&self) -> bool {
        let offset = usize::from(self.current_span().start());
        self.source[..offset]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace)
    }

    pub(super) fn parse_block(&mut self) -> NodeId {
        self.parse_block_inner(false)
    }

    /// With `as_expr`, a final expression without `;` becomes the block value.
    fn parse_block_inner(&mut self, as_expr: bool) -> NodeId {
        let start = self.current_span().start();
        if !self.expect(SyntaxKind::BraceOpen, "'{'") {
            return self.alloc(NodeKind::Block { stmts: Vec::new(), expr: None }, start);
        }
        if !self.enter_recursion() {
            return self.alloc(NodeKind::Block { stmts: Vec::new(), expr: None }, start);
        }
        let mut stmts = Vec::new();
        let mut expr = None;
        while !self.should_stop() && !self.at(SyntaxKind::BraceClose) {
            let before = self.pos;
            if self.eat(SyntaxKind::Semicolon) {
                continue;
            }
            let (stmt, terminated) = self.parse_statement();
            if as_expr && !terminated && self.at(SyntaxKind::BraceClose) {
                if let NodeKind::ExprStmt { expr: value } = self.ast.kind(stmt) {
                    expr = Some(*value);
                    break;
                }
            }
            stmts.push(stmt);
            if self.pos == before {
                self.bump();
            }
        }
        self.exit_recursion();
        self.expect(SyntaxKind::BraceClose, "'}'");
        self.alloc(NodeKind::Block { stmts, expr }, start)
    }

    /// Returns the statement and whether it was closed by `;` (or is a
    /// block-like statement that needs none).
    fn parse_statement(&mut self) -> (NodeId, bool) {
        let start = self.current_span().start();
        match self.current() {
            SyntaxKind::KwLet => (self.parse_var_decl(), true),
            SyntaxKind::KwIf => (self.parse_if(), true),
            SyntaxKind::KwFor => (self.parse_for(), true),
            SyntaxKind::KwWhile => {
                self.bump();
                let cond = self.parse_expr();
                let body = self.parse_block();
                (self.alloc(NodeKind::While { cond, body }, start), true)
            }
            SyntaxKind::KwReturn | SyntaxKind::KwBreak | SyntaxKind::KwContinue => {
                let kind = match self.current() {
                    SyntaxKind::KwReturn => JumpKind::Return,
                    SyntaxKind::KwBreak => JumpKind::Break,
                    _ => JumpKind::Continue,
                };
                self.bump();
                let value = if kind == JumpKind::Return
                    && !self.at(SyntaxKind::Semicolon)
                    && !self.at(SyntaxKind::BraceClose)
                {
                    Some(self.parse_expr())
                } else {
                    None
                };
                let stmt = self.alloc(NodeKind::Jump { kind, value }, start);
                (stmt, self.end_statement())
            }
            SyntaxKind::BraceOpen => (self.parse_block(), true),
            _ => self.parse_expr_statement(),
        }
    }

    fn end_statement(&mut self) -> bool {
        if self.eat(SyntaxKind::Semicolon) {
            return true;
        }
        if !self.at(SyntaxKind::BraceClose) {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected ';'");
            self.recover_statement();
            return true;
        }
        false
    }

    fn parse_var_decl(&mut self) -> NodeId {
        let start = self.current_span().start();
        self.bump();
        if !self.at(SyntaxKind::Variable) {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected variable");
            self.recover_statement();
            return self.error_node();
        }
        let var = self.parse_variable();
        let ty = if self.eat(SyntaxKind::Colon) {
            Some(self.parse_type_node())
        } else {
            None
        };
        let init = if self.eat(SyntaxKind::Assign) {
            Some(self.parse_expr())
        } else {
            None
        };
        let stmt = self.alloc(NodeKind::VarDecl { var, ty, init }, start);
        self.end_statement();
        stmt
    }

    fn parse_if(&mut self) -> NodeId {
        let start = self.current_span().start();
        self.bump();
        let cond = self.parse_expr();
        let then = self.parse_block();
        let els = if self.eat(SyntaxKind::KwElse) {
            if self.at(SyntaxKind::KwIf) {
                let else_start = self.current_span().start();
                let nested = self.parse_if();
                Some(self.alloc(
                    NodeKind::Block {
                        stmts: vec![nested],
                        expr: None,
                    },
                    else_start,
                ))
            } else {
                Some(self.parse_block())
            }
        } else {
            None
        };
        self.alloc(NodeKind::If { cond, then, els }, start)
    }

    fn parse_for(&mut self) -> NodeId {
        let start = self.current_span().start();
        self.bump();
        self.expect(SyntaxKind::ParenOpen, "'('");
        if !self.at(SyntaxKind::Variable) {
            self.error_at_current(DiagnosticKind::UnexpectedToken, "expected loop variable");
            self.recover_statement();
            return self.error_node();
        }
        let var = self.parse_variable();
        self.expect(SyntaxKind::Colon, "':'");
        let iterable = if self.at(SyntaxKind::Map) && self.nth(1) == SyntaxKind::ParenClose {
            Iterable::Map(self.parse_map_operand())
        } else {
            let range_start = self.parse_expr();
            self.expect(SyntaxKind::DotDot, "'..'");
            let range_end = self.parse_expr();
            Iterable::Range {
                start: range_start,
                end: range_end,
            }
        };
        self.expect(SyntaxKind::ParenClose, "')'");
        let body = self.parse_block();
        self.alloc(NodeKind::For { var, iterable, body }, start)
    }

    fn parse_expr_statement(&mut self) -> (NodeId, bool) {
        let start = self.current_span().start();
        let target = self.parse_expr();

        let op = match self.current() {
            SyntaxKind::Assign => None,
            kind => match compound_op(kind) {
                Some(op) => Some(op),
                None => {
                    let stmt = self.alloc(NodeKind::ExprStmt { expr: target }, start);
                    return (stmt, self.end_statement());
                }
            },
        };
        let op_span = self.current_span();
        self.bump();
        let mut value = self.parse_expr();
        if let Some(op) = op {
            let left = self.ast.clone_subtree(target);
            let range = TextRange::new(start, self.prev_end());
            value = self.alloc_at(NodeKind::Binop { op, left, right: value }, range);
        }

        let is_var = match self.ast.kind(target) {
            NodeKind::Variable(_) => Some(true),
            NodeKind::Map(_) | NodeKind::MapAccess { .. } => Some(false),
            _ => None,
        };
        let stmt = match is_var {
            Some(true) => NodeKind::AssignVar { var: target, expr: value },
            Some(false) => NodeKind::AssignMap { map: target, expr: value },
            None => {
                self.error_at(
                    DiagnosticKind::InvalidAssignmentTarget,
                    op_span,
                    "only variables and maps can be assigned to",
                );
                NodeKind::ExprStmt { expr: value }
            }
        };
        let stmt = self.alloc(stmt, start);
        (stmt, self.end_statement())
    }

    pub(super) fn parse_expr(&mut self) -> NodeId {
        self.parse_expr_bp(TERNARY_PREC)
    }

    fn parse_expr_bp(&mut self, min_prec: u8) -> NodeId {
        if !self.enter_recursion() {
            return self.error_node();
        }
        let start = self.current_span().start();
        let mut left = self.parse_unary();

        loop {
            let kind = self.current();
            if kind == SyntaxKind::Question && min_prec <= TERNARY_PREC {
                self.bump();
                let then = self.parse_expr();
                self.expect(SyntaxKind::Colon, "':'");
                let els = self.parse_expr_bp(TERNARY_PREC);
                left = self.alloc(
                    NodeKind::If {
                        cond: left,
                        then,
                        els: Some(els),
                    },
                    start,
                );
                continue;
            }
            if kind == SyntaxKind::Slash && self.in_predicate {
                break;
            }
            let Some((op, prec)) = binop_info(kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.bump();
            let right = self.parse_expr_bp(prec + 1);
            left = self.alloc(NodeKind::Binop { op, left, right }, start);
        }

        self.exit_recursion();
        left
    }

    fn parse_unary(&mut self) -> NodeId {
        if !self.enter_recursion() {
            return self.error_node();
        }
        let start = self.current_span().start();
        let op = match self.current() {
            SyntaxKind::Minus => Some(UnOp::Minus),
            SyntaxKind::Bang => Some(UnOp::LNot),
            SyntaxKind::Tilde => Some(UnOp::BNot),
            SyntaxKind::Star => Some(UnOp::Deref),
            SyntaxKind::PlusPlus => Some(UnOp::Increment),
            SyntaxKind::MinusMinus => Some(UnOp::Decrement),
            _ => None,
        };

        let node = if let Some(op) = op {
            self.bump();
            if op == UnOp::Minus && self.at(SyntaxKind::Integer) {
                self.parse_integer(start, true)
            } else {
                let expr = self.parse_unary();
                self.alloc(NodeKind::Unop { op, expr, post: false }, start)
            }
        } else if self.at(SyntaxKind::Amp) {
            self.bump();
            match self.current() {
                SyntaxKind::Variable => {
                    let var = self.parse_variable();
                    self.alloc(NodeKind::VariableAddr { var }, start)
                }
                SyntaxKind::Map => {
                    let map = self.parse_map_operand();
                    self.alloc(NodeKind::MapAddr { map }, start)
                }
                _ => {
                    self.error_at_current(
                        DiagnosticKind::UnexpectedToken,
                        "expected variable or map after '&'",
                    );
                    self.error_node()
                }
            }
        } else if self.at(SyntaxKind::KwComptime) {
            self.bump();
            let expr = self.parse_unary();
            self.alloc(NodeKind::Comptime { expr }, start)
        } else if self.at(SyntaxKind::ParenOpen) && self.at_cast_start() {
            self.bump();
            let ty = self.parse_type_node();
            self.expect(SyntaxKind::ParenClose, "')'");
            let expr = self.parse_unary();
            self.alloc(NodeKind::Cast { ty, expr }, start)
        } else {
            self.parse_postfix()
        };

        self.exit_recursion();
        node
    }

    fn parse_postfix(&mut self) -> NodeId {
        let start = self.current_span().start();
        let mut expr = self.parse_primary();
        loop {
            match self.current() {
                SyntaxKind::Dot | SyntaxKind::Arrow => {
                    self.bump();
                    match self.current() {
                        SyntaxKind::Ident => {
                            let field = self.ast.intern(self.current_text());
                            self.bump();
                            expr = self.alloc(NodeKind::FieldAccess { expr, field }, start);
                        }
                        SyntaxKind::Integer => {
                            let index = parse_int_literal(self.current_text())
                                .and_then(|n| usize::try_from(n).ok())
                                .unwrap_or(0);
                            self.bump();
                            expr = self.alloc(NodeKind::TupleAccess { expr, index }, start);
                        }
                        _ => {
                            self.error_at_current(
                                DiagnosticKind::UnexpectedToken,
                                "expected field name or tuple index",
                            );
                            break;
                        }
                    }
                }
                SyntaxKind::BracketOpen => {
                    self.bump();
                    let index = self.parse_nested_expr();
                    self.expect(SyntaxKind::BracketClose, "']'");
                    expr = self.alloc(NodeKind::ArrayAccess { expr, index }, start);
                }
                SyntaxKind::PlusPlus | SyntaxKind::MinusMinus => {
                    let op = if self.at(SyntaxKind::PlusPlus) {
                        UnOp::Increment
                    } else {
                        UnOp::Decrement
                    };
                    self.bump();
                    expr = self.alloc(NodeKind::Unop { op, expr, post: true }, start);
                }
                _ => break,
            }
        }
        expr
    }

    /// Expression inside brackets or parens, where `/` divides again.
    fn parse_nested_expr(&mut self) -> NodeId {
        let saved = std::mem::replace(&mut self.in_predicate, false);
        let expr = self.parse_expr();
        self.in_predicate = saved;
        expr
    }

    fn parse_primary(&mut self) -> NodeId {
        let start = self.current_span().start();
        match self.current() {
            SyntaxKind::Integer => self.parse_integer(start, false),
            SyntaxKind::KwTrue | SyntaxKind::KwFalse => {
                let value = self.at(SyntaxKind::KwTrue);
                self.bump();
                self.alloc(NodeKind::Bool(value), start)
            }
            SyntaxKind::StringLiteral => {
                let value = unescape(self.current_text());
                self.bump();
                self.alloc(NodeKind::Str(value), start)
            }
            SyntaxKind::Variable => self.parse_variable(),
            SyntaxKind::Map => self.parse_map_expr(),
            SyntaxKind::Ident => self.parse_ident_expr(),
            SyntaxKind::ParenOpen => self.parse_paren_expr(),
            SyntaxKind::BraceOpen => self.parse_block_inner(true),
            SyntaxKind::KwTypeof => self.parse_typeof(),
            SyntaxKind::KwSizeof | SyntaxKind::KwTypeinfo => {
                let is_sizeof = self.at(SyntaxKind::KwSizeof);
                self.bump();
                self.expect(SyntaxKind::ParenOpen, "'('");
                let arg = self.parse_typeof_operand();
                self.expect(SyntaxKind::ParenClose, "')'");
                let kind = if is_sizeof {
                    NodeKind::Sizeof { arg }
                } else {
                    NodeKind::Typeinfo { arg }
                };
                self.alloc(kind, start)
            }
            SyntaxKind::KwOffsetof => self.parse_offsetof(),
            SyntaxKind::KwIf => self.parse_if(),
            _ => {
                self.error_at_current(DiagnosticKind::ExpectedExpression, "found unexpected token");
                let node = self.error_node();
                if !matches!(
                    self.current(),
                    SyntaxKind::Semicolon | SyntaxKind::BraceClose | SyntaxKind::Eof
                ) {
                    self.bump();
                }
                node
            }
        }
    }

    fn parse_integer(&mut self, start: TextSize, negative: bool) -> NodeId {
        let value = match parse_int_literal(self.current_text()) {
            Some(value) => value,
            None => {
                self.error_at_current(DiagnosticKind::UnexpectedToken, "integer literal out of range");
                0
            }
        };
        self.bump();
        self.alloc(NodeKind::Integer { value, negative }, start)
    }

    fn parse_variable(&mut self) -> NodeId {
        let start = self.current_span().start();
        let sym = self.ast.intern(self.current_text());
        self.bump();
        self.alloc(NodeKind::Variable(sym), start)
    }

    /// A bare map token, never followed by a key.
    fn parse_map_operand(&mut self) -> NodeId {
        let start = self.current_span().start();
        let sym = self.ast.intern(self.current_text());
        self.bump();
        self.alloc(NodeKind::Map(sym), start)
    }

    /// `@m` or `@m[k]`; several keys form a tuple key.
    fn parse_map_expr(&mut self) -> NodeId {
        let start = self.current_span().start();
        let map = self.parse_map_operand();
        if !self.at(SyntaxKind::BracketOpen) {
            return map;
        }
        let key_start = self.current_span().end();
        self.bump();
        let saved = std::mem::replace(&mut self.in_predicate, false);
        let mut keys = vec![self.parse_expr()];
        while self.eat(SyntaxKind::Comma) {
            keys.push(self.parse_expr());
        }
        self.in_predicate = saved;
        let key = if keys.len() == 1 {
            keys[0]
        } else {
            self.alloc(NodeKind::Tuple(keys), key_start)
        };
        self.expect(SyntaxKind::BracketClose, "']'");
        self.alloc(NodeKind::MapAccess { map, key }, start)
    }

    fn parse_ident_expr(&mut self) -> NodeId {
        let start = self.current_span().start();
        let text = self.current_text();
        let sym = self.ast.intern(text);
        self.bump();
        if self.at(SyntaxKind::ParenOpen) {
            self.bump();
            let saved = std::mem::replace(&mut self.in_predicate, false);
            let mut args = Vec::new();
            while !self.should_stop() && !self.at(SyntaxKind::ParenClose) {
                args.push(self.parse_expr());
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.in_predicate = saved;
            self.expect(SyntaxKind::ParenClose, "')'");
            return self.alloc(NodeKind::Call { func: sym, args }, start);
        }
        if is_builtin(text) {
            self.alloc(NodeKind::Builtin(sym), start)
        } else {
            self.alloc(NodeKind::Identifier(sym), start)
        }
    }

    /// Grouping, tuples `(a, b)`, records `(x = 1, y = 2)` and `()`.
    fn parse_paren_expr(&mut self) -> NodeId {
        let start = self.current_span().start();
        self.bump();
        let saved = std::mem::replace(&mut self.in_predicate, false);

        let node = if self.eat(SyntaxKind::ParenClose) {
            self.alloc(NodeKind::Tuple(Vec::new()), start)
        } else if self.at(SyntaxKind::Ident) && self.nth(1) == SyntaxKind::Assign {
            let mut fields = Vec::new();
            while self.at(SyntaxKind::Ident) {
                let name = self.ast.intern(self.current_text());
                self.bump();
                self.expect(SyntaxKind::Assign, "'='");
                let value = self.parse_expr();
                fields.push(RecordField { name, value });
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::ParenClose, "')'");
            self.alloc(NodeKind::Record(fields), start)
        } else {
            let first = self.parse_expr();
            if self.at(SyntaxKind::Comma) {
                let mut elems = vec![first];
                while self.eat(SyntaxKind::Comma) {
                    if self.at(SyntaxKind::ParenClose) {
                        break;
                    }
                    elems.push(self.parse_expr());
                }
                self.expect(SyntaxKind::ParenClose, "')'");
                self.alloc(NodeKind::Tuple(elems), start)
            } else {
                self.expect(SyntaxKind::ParenClose, "')'");
                first
            }
        };

        self.in_predicate = saved;
        node
    }

    fn parse_typeof(&mut self) -> NodeId {
        self.bump();
        self.expect(SyntaxKind::ParenOpen, "'('");
        let node = self.parse_typeof_operand();
        self.expect(SyntaxKind::ParenClose, "')'");
        node
    }

    /// The operand of `typeof`/`sizeof`/`typeinfo`: a type or an expression,
    /// always wrapped in a `Typeof` node.
    fn parse_typeof_operand(&mut self) -> NodeId {
        if self.at_type_start(0) {
            return self.parse_type_node();
        }
        let start = self.current_span().start();
        let expr = self.parse_nested_expr();
        self.alloc(NodeKind::Typeof(TypeofArg::Expr(expr)), start)
    }

    fn parse_offsetof(&mut self) -> NodeId {
        let start = self.current_span().start();
        self.bump();
        self.expect(SyntaxKind::ParenOpen, "'('");
        let arg = self.parse_typeof_operand();
        self.expect(SyntaxKind::Comma, "','");
        let mut fields = Vec::new();
        loop {
            if !self.at(SyntaxKind::Ident) {
                self.error_at_current(DiagnosticKind::UnexpectedToken, "expected field name");
                break;
            }
            fields.push(self.ast.intern(self.current_text()));
            self.bump();
            if !self.eat(SyntaxKind::Dot) {
                break;
            }
        }
        self.expect(SyntaxKind::ParenClose, "')'");
        self.alloc(NodeKind::Offsetof { arg, fields }, start)
    }

    /// `(T)`: a `typeof(...)` operand only counts when its closing paren is
    /// directly followed by the cast's `)`.
    fn at_cast_start(&self) -> bool {
        if self.nth(1) != SyntaxKind::KwTypeof {
            return self.at_type_start(1);
        }
        let mut depth = 0usize;
        let mut i = 2;
        loop {
            match self.nth(i) {
                SyntaxKind::ParenOpen => depth += 1,
                SyntaxKind::ParenClose => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.nth(i + 1) == SyntaxKind::ParenClose;
                    }
                }
                SyntaxKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn at_type_start(&self, lookahead: usize) -> bool {
        match self.nth(lookahead) {
            SyntaxKind::KwStruct | SyntaxKind::KwUnion | SyntaxKind::KwTypeof => true,
            SyntaxKind::Ident => {
                let text = self.nth_text(lookahead);
                matches!(text, "unsigned" | "signed" | "enum")
                    || (SizedType::from_base_name(text).is_some()
                        && matches!(
                            self.nth(lookahead + 1),
                            SyntaxKind::ParenClose
                                | SyntaxKind::Star
                                | SyntaxKind::BracketOpen
                                | SyntaxKind::Ident
                                | SyntaxKind::Comma
                        ))
            }
            _ => false,
        }
    }

    /// A type in expression-adjacent position (casts, `let` annotations,
    /// parameters), wrapped in a `Typeof` node. `typeof(e)` and unknown
    /// type names stay symbolic for the resolver.
    pub(super) fn parse_type_node(&mut self) -> NodeId {
        let start = self.current_span().start();
        if self.at(SyntaxKind::KwTypeof) {
            return self.parse_typeof();
        }
        if self.at(SyntaxKind::Ident) {
            let name = self.current_text();
            let known = SizedType::from_base_name(name).is_some()
                || matches!(name, "unsigned" | "signed" | "long" | "short" | "enum");
            if !known && !matches!(self.nth(1), SyntaxKind::Star | SyntaxKind::BracketOpen) {
                let sym = self.ast.intern(name);
                self.bump();
                let ident = self.alloc(NodeKind::Identifier(sym), start);
                return self.alloc(NodeKind::Typeof(TypeofArg::Expr(ident)), start);
            }
        }
        let ty = self.parse_type().unwrap_or_default();
        self.alloc(NodeKind::Typeof(TypeofArg::Type(ty)), start)
    }

    /// A concrete type: base name or struct, then `*` and `[N]` suffixes.
    pub(super) fn parse_type(&mut self) -> Option<SizedType> {
        let mut ty = match self.current() {
            SyntaxKind::KwStruct | SyntaxKind::KwUnion => {
                let keyword = self.current_text();
                self.bump();
                if !self.at(SyntaxKind::Ident) {
                    self.error_at_current(DiagnosticKind::ExpectedTypeName, "struct name");
                    return None;
                }
                let name = format!("{} {}", keyword, self.current_text());
                self.bump();
                SizedType::cstruct(StructRef::unresolved(name))
            }
            SyntaxKind::Ident => {
                let start = self.current_span().start();
                let mut words = vec![self.current_text()];
                self.bump();
                if matches!(words[0], "unsigned" | "signed" | "long" | "short" | "enum") {
                    while self.at(SyntaxKind::Ident)
                        && ((words[0] == "enum" && words.len() == 1)
                            || matches!(self.current_text(), "int" | "long" | "char" | "short"))
                    {
                        words.push(self.current_text());
                        self.bump();
                    }
                }
                let text = words.join(" ");
                match text.parse::<SizedType>() {
                    Ok(ty) => ty,
                    Err(_) => {
                        let range = TextRange::new(start, self.prev_end());
                        self.error_at(DiagnosticKind::ExpectedTypeName, range, text);
                        return None;
                    }
                }
            }
            _ => {
                self.error_at_current(DiagnosticKind::ExpectedTypeName, "found unexpected token");
                return None;
            }
        };

        loop {
            if self.eat(SyntaxKind::Star) {
                ty = SizedType::pointer(ty);
            } else if self.at(SyntaxKind::BracketOpen) {
                self.bump();
                let len = self.parse_array_len()?;
                ty = if ty.is_string() {
                    SizedType::string(len)
                } else {
                    SizedType::array(ty, len)
                };
            } else {
                break;
            }
        }
        Some(ty)
    }
}
