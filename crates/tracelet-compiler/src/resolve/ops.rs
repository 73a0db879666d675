//! Result types of operators, casts and accessors.

use tracelet_core::{AddrSpace, Field, SizedType, TypeShape};

use super::graph::TransformCx;
use crate::ast::{BinOp, NodeId, UnOp};
use crate::diagnostics::DiagnosticKind;

impl TransformCx<'_> {
    pub fn binop_type(&mut self, node: NodeId, op: BinOp, lht: &SizedType, rht: &SizedType) -> SizedType {
        if lht.is_none() || rht.is_none() {
            return SizedType::none();
        }
        if lht.is_bool() && rht.is_bool() {
            return SizedType::bool();
        }
        if lht.is_pointer() || rht.is_pointer() {
            return self.pointer_binop(node, op, lht, rht);
        }

        let int_like = |t: &SizedType| t.is_castable_aggregate() || t.is_integer() || t.is_bool();
        if int_like(lht) && int_like(rht) {
            return self.integer_binop(node, op, lht, rht);
        }

        let signed = if op.is_shift() {
            lht.is_signed()
        } else {
            lht.is_signed() || rht.is_signed()
        };
        let result = if op.is_comparison() {
            SizedType::bool()
        } else {
            SizedType::integer(64, signed)
        };
        let (l_as, r_as) = (lht.addr_space, rht.addr_space);
        let addr_space = if l_as != r_as && l_as != AddrSpace::None && r_as != AddrSpace::None {
            self.report(DiagnosticKind::AddrSpaceMismatch, node, "Addrspace mismatch");
            AddrSpace::None
        } else if l_as != AddrSpace::None {
            l_as
        } else {
            r_as
        };
        result.with_addr_space(addr_space)
    }

    fn invalid_binop(&mut self, node: NodeId, op: BinOp, lht: &SizedType, rht: &SizedType) -> SizedType {
        let message = format!(
            "The {op} operator can not be used on expressions of types {lht}, {rht}"
        );
        self.report(DiagnosticKind::InvalidOperator, node, message);
        SizedType::none()
    }

    fn pointer_binop(&mut self, node: NodeId, op: BinOp, lht: &SizedType, rht: &SizedType) -> SizedType {
        let left_is_ptr = lht.is_pointer();
        let (ptr, other) = if left_is_ptr { (lht, rht) } else { (rht, lht) };

        if other.is_pointer() {
            if op.is_comparison() {
                let (le, re) = (lht.pointee(), rht.pointee());
                if le != re {
                    let render = |t: Option<&SizedType>| t.map(ToString::to_string).unwrap_or_default();
                    let message = format!(
                        "comparison of distinct pointer types: {}, {}",
                        render(le),
                        render(re)
                    );
                    self.report(DiagnosticKind::DistinctPointers, node, message);
                }
                return SizedType::bool();
            }
            if op.is_logical() {
                return SizedType::bool();
            }
            return self.invalid_binop(node, op, lht, rht);
        }

        if !(other.is_integer() || other.is_bool()) {
            return self.invalid_binop(node, op, lht, rht);
        }
        // `int - ptr` is meaningless; `+` commutes.
        match op {
            BinOp::Minus if !left_is_ptr => self.invalid_binop(node, op, lht, rht),
            BinOp::Plus | BinOp::Minus => {
                let pointee = ptr.pointee().cloned().unwrap_or_default();
                SizedType::pointer(pointee).with_addr_space(ptr.addr_space)
            }
            _ if op.is_comparison() => SizedType::bool(),
            _ => self.invalid_binop(node, op, lht, rht),
        }
    }

    fn integer_binop(&mut self, node: NodeId, op: BinOp, lht: &SizedType, rht: &SizedType) -> SizedType {
        if lht == rht {
            return if op.is_comparison() {
                SizedType::bool()
            } else {
                SizedType::integer(64, lht.is_signed())
            };
        }

        let as_int64 = |t: &SizedType, like: &SizedType| {
            t.promote(&SizedType::integer(64, like.is_signed())).is_none()
        };
        // Castable aggregates always read back as 64-bit integers.
        let sign_mismatch = match (lht.is_castable_aggregate(), rht.is_castable_aggregate()) {
            (true, true) => lht.is_signed() != rht.is_signed(),
            (true, false) => as_int64(rht, lht),
            (false, true) => as_int64(lht, rht),
            (false, false) => lht.promote(rht).is_none(),
        };

        if sign_mismatch {
            let what = if op.is_comparison() {
                Some("comparison")
            } else if op.is_arithmetic() {
                Some("arithmetic")
            } else {
                None
            };
            if let Some(what) = what {
                let message = format!(
                    "{what} of integers of different signs: '{lht}' and '{rht}' can lead to undefined behavior"
                );
                self.report(DiagnosticKind::SignMismatch, node, message);
            }
        }

        if op.is_comparison() {
            return SizedType::bool();
        }

        let signed = lht.is_signed() || rht.is_signed();
        if matches!(op, BinOp::Div | BinOp::Mod) && signed {
            let message = format!("signed operands for '{op}' can lead to undefined behavior");
            self.report(DiagnosticKind::SignedDivision, node, message);
        }
        SizedType::integer(64, signed)
    }

    pub fn unop_type(&mut self, node: NodeId, op: UnOp, ty: &SizedType) -> SizedType {
        let pointer_op = op.is_inc_dec() || op == UnOp::Deref;
        let invalid = if ty.is_bool() {
            op != UnOp::LNot
        } else {
            !ty.is_integer() && !((ty.is_pointer() || ty.ctx_access) && pointer_op)
        };
        if invalid {
            let message = format!(
                "The {op} operator can not be used on expressions of type '{ty}'"
            );
            self.report(DiagnosticKind::InvalidOperator, node, message);
            return SizedType::none();
        }

        match op {
            UnOp::Deref => match &ty.shape {
                TypeShape::Pointer(pointee) => {
                    let mut result = (**pointee).clone();
                    result.ctx_access |= ty.ctx_access;
                    result.internal = ty.internal;
                    result.addr_space = ty.addr_space;
                    result
                }
                // `*args` is accepted and means `args`.
                TypeShape::Struct(_) if ty.ctx_access => ty.clone(),
                TypeShape::Struct(sref) => {
                    let message = format!(
                        "Can not dereference struct/union of type '{}'. It is not a pointer.",
                        sref.name
                    );
                    self.report(DiagnosticKind::InvalidOperator, node, message);
                    SizedType::none()
                }
                TypeShape::Integer { .. } => SizedType::uint(64),
                _ => {
                    let message = format!("Can not dereference type '{ty}'. It is not a pointer.");
                    self.report(DiagnosticKind::InvalidOperator, node, message);
                    SizedType::none()
                }
            },
            UnOp::LNot => SizedType::bool(),
            _ if ty.is_pointer() && pointer_op => ty.clone(),
            _ => SizedType::int(64),
        }
    }

    /// Refine a cast's target type with what is known about its operand.
    pub fn cast_type(&self, cast_ty: &SizedType, expr_ty: &SizedType, default_space: AddrSpace) -> SizedType {
        let mut updated = cast_ty.clone();
        if let TypeShape::Array { elem, len } = &cast_ty.shape {
            let elem_size = elem.size();
            // `(int8[])"hello"` takes its length from the operand.
            if *len == 0 && elem_size != 0 && expr_ty.size() % elem_size == 0 {
                updated = SizedType::array((**elem).clone(), expr_ty.size() / elem_size);
            }
            if expr_ty.is_integer() || expr_ty.is_bool() {
                updated.internal = true;
            }
        }
        if expr_ty.ctx_access && !updated.is_integer() {
            updated.ctx_access = true;
        }
        updated.addr_space = match expr_ty.addr_space {
            AddrSpace::None => default_space,
            space => space,
        };
        updated
    }

    pub fn field_type(&mut self, node: NodeId, field: &str, expr_ty: &SizedType) -> SizedType {
        let is_ctx = expr_ty.ctx_access;
        let internal = expr_ty.internal;
        let mut base = expr_ty;
        while let Some(pointee) = base.pointee() {
            base = pointee;
        }

        if base.funcarg {
            let Some(found) = base.fields().and_then(|fields| fields.iter().find(|f| f.name == field))
            else {
                self.report(
                    DiagnosticKind::UnknownField,
                    node,
                    format!("Can't find function parameter {field}"),
                );
                return SizedType::none();
            };
            let result = self.env.resolve_struct_refs(&found.ty).with_addr_space(base.addr_space);
            if result.is_none() {
                self.report(
                    DiagnosticKind::UnknownField,
                    node,
                    format!("{field} has unsupported type"),
                );
            }
            return result;
        }

        match &base.shape {
            TypeShape::Record(fields) => match fields.iter().find(|f| f.name == field) {
                Some(found) => found.ty.clone(),
                None => {
                    let message = format!("Record does not contain a field named '{field}'");
                    self.report(DiagnosticKind::UnknownField, node, message);
                    SizedType::none()
                }
            },
            TypeShape::Struct(sref) => {
                let layout = match &sref.layout {
                    Some(layout) => Some(layout.clone()),
                    None => self.env.lookup_struct(&sref.name),
                };
                let Some(layout) = layout else {
                    let message = format!("Unknown struct/union: '{}'", sref.name);
                    self.report(DiagnosticKind::UnknownStruct, node, message);
                    return SizedType::none();
                };
                let Some(found) = layout.field(field) else {
                    let message = format!(
                        "Struct/union of type '{}' does not contain a field named '{field}'",
                        sref.name
                    );
                    self.report(DiagnosticKind::UnknownField, node, message);
                    return SizedType::none();
                };
                let mut result = self.env.resolve_struct_refs(&found.ty);
                if is_ctx && (result.is_array() || result.is_cstruct()) {
                    result.ctx_access = true;
                }
                result.internal = internal;
                result.addr_space = base.addr_space;
                result
            }
            _ => {
                let message = format!(
                    "Can not access field '{field}' on expression of type '{base}'"
                );
                self.report(DiagnosticKind::InvalidAccess, node, message);
                SizedType::none()
            }
        }
    }

    pub fn element_type(&mut self, node: NodeId, ty: &SizedType) -> SizedType {
        let mut elem = match &ty.shape {
            TypeShape::Array { elem, .. } => (**elem).clone(),
            TypeShape::Pointer(pointee) => (**pointee).clone(),
            TypeShape::String { .. } => SizedType::int(8),
            _ => {
                let message = format!(
                    "The array index operator [] can only be used on arrays and pointers, found {ty}."
                );
                self.report(DiagnosticKind::InvalidAccess, node, message);
                return SizedType::none();
            }
        };
        elem.addr_space = ty.addr_space;
        // Internal provenance cannot be tracked through pointers.
        elem.internal = !(elem.is_pointer() || ty.is_pointer()) && ty.internal;
        elem
    }

    /// Induction variable type of `for ($i : start..end)`.
    pub fn range_type(&mut self, start: NodeId, end: NodeId) -> SizedType {
        let (start_ty, end_ty) = (self.node_type(start), self.node_type(end));
        if start_ty.is_none() || end_ty.is_none() {
            return SizedType::none();
        }
        if !start_ty.is_integer() {
            self.report(
                DiagnosticKind::LoopRange,
                start,
                "Loop range requires an integer for the start value",
            );
        }
        if !end_ty.is_integer() {
            self.report(
                DiagnosticKind::LoopRange,
                end,
                "Loop range requires an integer for the end value",
            );
        }
        if start_ty.is_integer() && end_ty.is_integer() && start_ty.size() != end_ty.size() {
            if let Some(promoted) = start_ty.promote(&end_ty) {
                return promoted;
            }
        }
        start_ty
    }
}

/// Shape of the record `typeinfo(T)` evaluates to.
pub fn typeinfo_type(ty: &SizedType) -> SizedType {
    SizedType::record(vec![
        Field::new("btf_id", SizedType::uint(64)),
        Field::new("base_type", SizedType::string(ty.base_name().len() + 1)),
        Field::new("full_type", SizedType::string(ty.to_string().len() + 1)),
    ])
}
