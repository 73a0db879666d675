use crate::ast::{Ast, NodeId};

/// Expands macro calls introduced by tree rewrites.
///
/// Consulted after every transformer rewrite with the id of the rewritten
/// node; returns whether anything was expanded, which forces another
/// resolution round.
pub trait MacroRegistry: std::fmt::Debug {
    fn expand(&self, ast: &mut Ast, node: NodeId) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMacros;

impl MacroRegistry for NoMacros {
    fn expand(&self, _ast: &mut Ast, _node: NodeId) -> bool {
        false
    }
}
