//! Assignment compatibility for variables, map keys and map values.
//!
//! A target keeps the promotion of every value assigned to it. Locked
//! targets accept only values that fit their locked type, aggregate map
//! values only a repeat of the same reducer, and two pointer types that do
//! not promote are still accepted when both were taken from the same lvalue.

use tracelet_core::{SizedType, Symbol};

use super::graph::{GraphNode, ScopedVar, TransformCx};
use crate::ast::NodeId;
use crate::diagnostics::DiagnosticKind;

/// Whether `ty` may be stored into a target currently typed `current`.
///
/// Aggregates other than the castable ones cannot be copied at all, and a
/// castable aggregate may only be copied into a map that already holds a
/// plain integer, or into a fresh variable or key.
pub fn is_valid_assignment(ty: &SizedType, current: &SizedType, is_map_value: bool) -> bool {
    if ty.is_none() || ty.is_void() {
        return false;
    }
    if ty.is_aggregate() && !ty.is_castable_aggregate() {
        return false;
    }
    if !current.is_integer() && ty.is_castable_aggregate() {
        return !is_map_value && current.is_none();
    }
    true
}

impl TransformCx<'_> {
    pub(super) fn report(&mut self, kind: DiagnosticKind, at: NodeId, message: impl Into<String>) {
        let range = self.ast.range(at);
        self.diagnostics.report(kind, range).message(message).emit();
    }

    /// The locked type of `node`, reporting when `ty` does not fit it.
    fn locked_type(
        &mut self,
        node: GraphNode,
        ty: &SizedType,
        at: NodeId,
        name: Symbol,
    ) -> Option<SizedType> {
        let locked = self.locked.get(&node)?.clone();
        if !ty.fits_into(&locked) {
            let message = format!(
                "Type mismatch for {}: this type has been locked because it was used in another \
                 part of the type graph that was already resolved (e.g. `sizeof`, `typeinfo`, \
                 etc.). The new type '{}' doesn't fit into the locked type '{}'",
                self.ast.name(name),
                ty,
                locked
            );
            self.report(DiagnosticKind::LockedType, at, message);
        }
        Some(locked)
    }

    fn same_pointer_source(
        &self,
        target: GraphNode,
        source: GraphNode,
        incoming: &SizedType,
        current: &SizedType,
    ) -> bool {
        if !incoming.is_pointer() || !current.is_pointer() {
            return false;
        }
        self.pointer_sources.get(&target) == Some(&source)
    }

    /// Promote `target` with `ty`; `None` when they have no common type and
    /// the pointer-source exception does not apply.
    fn promote_target(
        &mut self,
        target: GraphNode,
        current: &SizedType,
        ty: &SizedType,
        source: Option<GraphNode>,
    ) -> Option<SizedType> {
        if let Some(promoted) = current.promote(ty) {
            if let (true, Some(source)) = (promoted.is_pointer(), source) {
                self.pointer_sources.insert(target, source);
            }
            return Some(promoted);
        }
        match source {
            Some(source) if self.same_pointer_source(target, source, ty, current) => {
                Some(ty.clone())
            }
            _ => None,
        }
    }

    pub fn variable_type(
        &mut self,
        var: ScopedVar,
        ty: &SizedType,
        at: NodeId,
        source: Option<GraphNode>,
    ) -> SizedType {
        let target = GraphNode::Variable(var);
        if let Some(locked) = self.locked_type(target, ty, at, var.name) {
            return locked;
        }

        let current = self.get(target);
        if let Some(ty) = self.promote_target(target, &current, ty, source) {
            return ty;
        }

        let message = format!(
            "Type mismatch for {}: trying to assign value of type '{}' when variable already has a type '{}'",
            self.ast.name(var.name),
            ty,
            current
        );
        self.report(DiagnosticKind::TypeMismatch, at, message);
        SizedType::none()
    }

    pub fn map_value(
        &mut self,
        map: Symbol,
        ty: &SizedType,
        at: NodeId,
        source: Option<GraphNode>,
    ) -> SizedType {
        let target = GraphNode::MapValue(map);
        if let Some(locked) = self.locked_type(target, ty, at, map) {
            return locked;
        }

        let current = self.get(target);
        // Once a map holds an aggregate, only its reducer may write it.
        let promoted = if current.is_aggregate() {
            None
        } else {
            self.promote_target(target, &current, ty, source)
        };
        if let Some(mut promoted) = promoted {
            // Map storage is owned by the runtime.
            if promoted.is_cstruct() || promoted.is_array() {
                promoted.internal = true;
            }
            return promoted;
        }

        let message = format!(
            "Type mismatch for {}: trying to assign value of type '{}' when map already has a type '{}'",
            self.ast.name(map),
            ty,
            current
        );
        self.report(DiagnosticKind::TypeMismatch, at, message);
        SizedType::none()
    }

    /// Map value written by a reducer call.
    pub fn aggregate_value(&mut self, map: Symbol, ty: &SizedType, call: NodeId) -> SizedType {
        let target = GraphNode::MapValue(map);
        if let Some(locked) = self.locked_type(target, ty, call, map) {
            return locked;
        }

        let current = self.get(target);
        if current.is_none() {
            return ty.clone();
        }
        if current.aggregate_kind().is_some() && current.aggregate_kind() == ty.aggregate_kind() {
            if let Some(promoted) = current.promote(ty) {
                return promoted;
            }
        }

        let message = format!(
            "Type mismatch for {}: trying to assign value of type '{}' when map already has a type '{}'",
            self.ast.name(map),
            ty,
            current
        );
        self.report(DiagnosticKind::TypeMismatch, call, message);
        SizedType::none()
    }

    pub fn map_key(
        &mut self,
        map: Symbol,
        ty: &SizedType,
        at: NodeId,
        source: Option<GraphNode>,
    ) -> SizedType {
        if self.meta.is_scalar(map) == Some(true) {
            return SizedType::int(64);
        }

        let target = GraphNode::MapKey(map);
        if let Some(locked) = self.locked_type(target, ty, at, map) {
            return locked;
        }

        let current = self.get(target);
        if let Some(ty) = self.promote_target(target, &current, ty, source) {
            return ty;
        }

        let message = format!(
            "Argument mismatch for {}: trying to access with arguments: '{}' when map expects arguments: '{}'",
            self.ast.name(map),
            ty,
            current
        );
        self.report(DiagnosticKind::ArgumentMismatch, at, message);
        SizedType::none()
    }
}
