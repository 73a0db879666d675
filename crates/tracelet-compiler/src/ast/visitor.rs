//! AST Visitor pattern.
//!
//! # Usage
//!
//! Implement `Visitor` for your struct. Override `visit_node` and match on
//! the kinds you care about; call `walk_node` to continue recursion (or omit
//! it to stop).
//!
//! ```ignore
//! impl Visitor for MyPass {
//!     fn visit_node(&mut self, ast: &Ast, id: NodeId) {
//!         if let NodeKind::Map(name) = ast.kind(id) {
//!             // Pre-order logic
//!         }
//!         walk_node(self, ast, id);
//!     }
//! }
//! ```

use super::{Ast, NodeId};

pub trait Visitor: Sized {
    fn visit_node(&mut self, ast: &Ast, id: NodeId) {
        walk_node(self, ast, id);
    }

    fn visit_root(&mut self, ast: &Ast) {
        self.visit_node(ast, ast.root());
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, ast: &Ast, id: NodeId) {
    for child in ast.kind(id).children() {
        visitor.visit_node(ast, child);
    }
}
