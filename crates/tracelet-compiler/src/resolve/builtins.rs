//! Seed types for builtins, bare identifiers and intrinsic calls.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracelet_core::{
    AddrSpace, AggregateKind, SizedType, StackMode, StructRef, Symbol, TimestampMode,
};

use super::graph::{GraphNode, TopLevel, TypeGraph};
use super::tables::{
    COMM_SIZE, MAX_STACK_SIZE, NTOP_SIZE, RETVAL_FIELD, VOID_FUNCS, simple_builtin, simple_call,
};
use super::transforms::EdgeKind;
use crate::ast::{AttachPoint, NodeId, NodeKind, ProbeKind};
use crate::diagnostics::DiagnosticKind;

impl<'a> TypeGraph<'a> {
    /// First attach point of the enclosing probe. Reports when `builtin` is
    /// used outside any probe.
    fn probe_attach(&mut self, at: NodeId, builtin: &str) -> Option<&'a AttachPoint> {
        let ast = self.cx.ast;
        let attach = match self.build.top_level {
            Some(TopLevel::Probe(probe)) => match ast.kind(probe) {
                NodeKind::Probe { attach, .. } => attach.first(),
                _ => None,
            },
            _ => None,
        };
        if attach.is_none() {
            let message = format!("Builtin {builtin} not supported outside probe");
            self.error(DiagnosticKind::InvalidProbeBuiltin, at, message);
        }
        attach
    }

    fn struct_type(&self, name: &str) -> SizedType {
        let sref = match self.cx.env.lookup_struct(name) {
            Some(layout) => StructRef::resolved(layout),
            None => StructRef::unresolved(name),
        };
        SizedType::cstruct(sref)
    }

    pub(super) fn visit_builtin(&mut self, id: NodeId, name: Symbol) {
        let name = self.cx.ast.name(name);
        let ty = self.builtin_type(id, name);
        self.add_resolved(GraphNode::Node(id), ty);
    }

    fn builtin_type(&mut self, id: NodeId, name: &str) -> SizedType {
        if let Some(ty) = simple_builtin(name) {
            return ty;
        }
        let config = &self.cx.env.config;
        match name {
            "kstack" => return SizedType::stack(true, config.stack_mode),
            "ustack" => return SizedType::stack(false, config.stack_mode),
            "comm" => return SizedType::string(COMM_SIZE).with_addr_space(AddrSpace::Kernel),
            "curtask" => {
                return SizedType::pointer(self.struct_type("struct task_struct"))
                    .with_addr_space(AddrSpace::Kernel);
            }
            _ => {}
        }

        let Some(attach) = self.probe_attach(id, name) else {
            return SizedType::none();
        };
        let probe_space = attach.kind.addr_space();
        match name {
            "ctx" => self.ctx_type(attach),
            "retval" => self.retval_type(id, attach),
            "func" => match attach.kind {
                ProbeKind::Uprobe | ProbeKind::Uretprobe => SizedType::usym(),
                _ => SizedType::ksym(),
            },
            "args" => self.args_type(id, attach),
            "probe" => SizedType::string(attach.raw.len() + 1),
            _ if name.starts_with("arg") => SizedType::uint(64).with_addr_space(probe_space),
            _ => {
                let message = format!("Unknown builtin: {name}");
                self.error(DiagnosticKind::UnknownIdentifier, id, message);
                SizedType::none()
            }
        }
    }

    fn ctx_type(&self, attach: &AttachPoint) -> SizedType {
        let ctx = if attach.kind.has_regs_ctx() {
            SizedType::pointer(self.struct_type("struct pt_regs"))
        } else if attach.kind.is_perf_event() {
            SizedType::pointer(self.struct_type("struct bpf_perf_event_data"))
        } else if attach.kind == ProbeKind::Iter {
            SizedType::pointer(self.struct_type(&format!("struct bpf_iter__{}", attach.func)))
        } else {
            SizedType::pointer(SizedType::none())
        };
        ctx.with_addr_space(AddrSpace::Kernel).with_ctx_access(true)
    }

    fn retval_type(&mut self, id: NodeId, attach: &AttachPoint) -> SizedType {
        let space = attach.kind.addr_space();
        if !matches!(attach.kind, ProbeKind::Fentry | ProbeKind::Fexit) {
            return SizedType::uint(64).with_addr_space(space);
        }
        let args = self.cx.env.provider.probe_args(attach);
        let field = args
            .as_ref()
            .and_then(SizedType::fields)
            .and_then(|fields| fields.iter().find(|f| f.name == RETVAL_FIELD));
        match field {
            Some(field) => self.cx.env.resolve_struct_refs(&field.ty).with_addr_space(space),
            None => {
                let message = format!("Can't find a field {RETVAL_FIELD}");
                self.error(DiagnosticKind::UnknownField, id, message);
                SizedType::none()
            }
        }
    }

    fn args_type(&mut self, id: NodeId, attach: &AttachPoint) -> SizedType {
        let (space, internal) = match attach.kind {
            ProbeKind::Fentry | ProbeKind::Fexit | ProbeKind::RawTracepoint => {
                (AddrSpace::Kernel, false)
            }
            ProbeKind::Uprobe => (AddrSpace::User, true),
            ProbeKind::Tracepoint if attach.target == "syscalls" => (AddrSpace::User, false),
            ProbeKind::Tracepoint => (AddrSpace::Kernel, false),
            kind => {
                let message = format!(
                    "The args builtin can only be used with tracepoint, rawtracepoint, fentry, fexit and uprobe probes ({} used here)",
                    kind.name()
                );
                self.error(DiagnosticKind::InvalidProbeBuiltin, id, message);
                return SizedType::none();
            }
        };

        let args = self.cx.env.provider.probe_args(attach);
        match args {
            Some(record) if record.fields().is_some_and(|f| !f.is_empty()) => record
                .with_funcarg(attach.kind != ProbeKind::Tracepoint)
                .with_ctx_access(true)
                .with_internal(internal)
                .with_addr_space(space),
            _ => {
                self.error(DiagnosticKind::InvalidProbeBuiltin, id, "Cannot read function parameters");
                SizedType::none()
            }
        }
    }

    pub(super) fn visit_identifier(&mut self, id: NodeId, name: Symbol) {
        let ast = self.cx.ast;
        let env = self.cx.env;
        let name = ast.name(name);
        let context = self.build.call_context.map(|func| ast.name(func));

        let mut ty = if let Some((_, enum_name)) = env.enums.get(name) {
            SizedType::enumeration(enum_name, 64)
        } else if let Some(layout) = env.lookup_struct(name) {
            SizedType::cstruct(StructRef::resolved(layout))
        } else if context == Some("nsecs") {
            match TimestampMode::parse(name) {
                Some(mode) => SizedType::timestamp_mode(mode),
                None => {
                    let message = format!("Invalid timestamp mode: {name}");
                    self.error(DiagnosticKind::InvalidCall, id, message);
                    return;
                }
            }
        } else if let (Some("kstack" | "ustack"), Some(mode)) = (context, StackMode::parse(name)) {
            SizedType::stack(context == Some("kstack"), mode)
        } else {
            SizedType::none()
        };

        if ty.is_none() && self.build.introspection > 0 {
            ty = env.provider.lookup_type(name).unwrap_or_default();
        }
        if ty.is_none() {
            let message = format!("Unknown identifier: '{name}'");
            self.error(DiagnosticKind::UnknownIdentifier, id, message);
            return;
        }
        self.add_resolved(GraphNode::Node(id), ty);
    }

    pub(super) fn visit_call(&mut self, id: NodeId, func: Symbol, args: &[NodeId]) {
        let ast = self.cx.ast;
        let saved = self.build.call_context.replace(func);
        args.iter().for_each(|arg| self.visit(*arg));
        self.build.call_context = saved;

        let name = ast.name(func);
        if let Some(kind) = AggregateKind::from_function(name) {
            let message = format!("`{}()` must be assigned directly to a map", kind.function_name());
            self.error(DiagnosticKind::InvalidCall, id, message);
            return;
        }

        let ty = self.call_type(id, func, name, args);
        self.add_resolved(GraphNode::Node(id), ty);
    }

    fn call_type(&mut self, id: NodeId, func: Symbol, name: &str, args: &[NodeId]) -> SizedType {
        if VOID_FUNCS.contains(&name) {
            return SizedType::void();
        }
        if let Some(ty) = simple_call(name) {
            return ty;
        }

        let env = self.cx.env;
        match name {
            "str" => self.str_type(id, args),
            "buf" => self.buf_type(id, args),
            "ntop" => SizedType::inet(NTOP_SIZE),
            "pton" => self.pton_type(id, args),
            "reg" => SizedType::uint(64).with_addr_space(self.probe_addr_space()),
            "kaddr" | "percpu_kaddr" => SizedType::uint(64).with_addr_space(AddrSpace::Kernel),
            "uaddr" => match self.probe_attach(id, name) {
                Some(_) => SizedType::pointer(SizedType::int(64)).with_addr_space(AddrSpace::User),
                None => SizedType::none(),
            },
            "kstack" | "ustack" => self.stack_type(id, name, args),
            "path" => match self.literal_arg(args, 1) {
                Some(size) => SizedType::string(size as usize),
                None => SizedType::string(env.config.max_strlen),
            },
            "kptr" | "uptr" | "bswap" => {
                let Some(arg) = args.first() else {
                    let message = format!("{name}() requires an argument");
                    self.error(DiagnosticKind::InvalidCall, id, message);
                    return SizedType::none();
                };
                let kind = match name {
                    "kptr" => EdgeKind::PointerSpace(AddrSpace::Kernel),
                    "uptr" => EdgeKind::PointerSpace(AddrSpace::User),
                    _ => EdgeKind::Bswap { call: id },
                };
                self.add_edge(GraphNode::Node(*arg), GraphNode::Node(id), kind);
                SizedType::none()
            }
            "nsecs" => SizedType::uint(64),
            _ => {
                if let Some(ty) = simple_builtin(name) {
                    return ty;
                }
                if let Some(ret) = self.build.subprogs.get(&func) {
                    return ret.clone();
                }
                if let Some(proto) = self.cx.env.provider.function(name) {
                    return self.cx.env.resolve_struct_refs(&proto.ret);
                }
                self.error(DiagnosticKind::UnknownFunction, id, name);
                SizedType::none()
            }
        }
    }

    /// Value of the integer literal passed at `index`, if there is one.
    fn literal_arg(&self, args: &[NodeId], index: usize) -> Option<u64> {
        match self.cx.ast.kind(*args.get(index)?) {
            NodeKind::Integer {
                value,
                negative: false,
            } => Some(*value),
            _ => None,
        }
    }

    fn str_type(&mut self, id: NodeId, args: &[NodeId]) -> SizedType {
        let max = self.cx.env.config.max_strlen;
        let size = match args.get(1).map(|len| (len, self.cx.ast.kind(*len))) {
            Some((len, NodeKind::Integer { value, negative: true })) => {
                let message = format!("str cannot use negative length (-{value})");
                self.error(DiagnosticKind::InvalidCall, *len, message);
                return SizedType::none();
            }
            Some((len, NodeKind::Integer { value, .. })) => {
                let requested = usize::try_from(*value).unwrap_or(usize::MAX);
                if requested >= max {
                    let message = format!(
                        "length param ({requested}) is too long and will be shortened to {max} bytes"
                    );
                    self.error(DiagnosticKind::StrLengthTruncated, *len, message);
                    max
                } else {
                    requested + 1
                }
            }
            _ => max,
        };
        if args.is_empty() {
            self.error(DiagnosticKind::InvalidCall, id, "str() requires at least one argument");
        }
        SizedType::string(size).with_addr_space(AddrSpace::Kernel)
    }

    fn buf_type(&mut self, id: NodeId, args: &[NodeId]) -> SizedType {
        let max = self.cx.env.config.max_buffer_size();
        let Some(data) = args.first() else {
            self.error(DiagnosticKind::InvalidCall, id, "buf() requires at least one argument");
            return SizedType::none();
        };
        if args.len() == 1 {
            // Sized from the operand once it resolves.
            self.add_edge(GraphNode::Node(*data), GraphNode::Node(id), EdgeKind::Buffer { max });
            return SizedType::none();
        }
        let size = self
            .literal_arg(args, 1)
            .map_or(max, |len| usize::try_from(len).unwrap_or(usize::MAX).min(max));
        SizedType::buffer(size).with_addr_space(AddrSpace::Kernel)
    }

    fn pton_type(&mut self, id: NodeId, args: &[NodeId]) -> SizedType {
        let arg = args.first().map(|arg| (*arg, self.cx.ast.kind(*arg)));
        let Some((arg, NodeKind::Str(addr))) = arg else {
            self.error(
                DiagnosticKind::InvalidCall,
                id,
                "pton() expects an string literal at the first argument",
            );
            return SizedType::none();
        };

        let (family, len) = if addr.contains(':') {
            ("IPv6", addr.parse::<Ipv6Addr>().map(|_| 16))
        } else if addr.contains('.') {
            ("IPv4", addr.parse::<Ipv4Addr>().map(|_| 4))
        } else {
            let message =
                format!("pton() expects an string argument of an IPv4/IPv6 address, got {addr}");
            self.error(DiagnosticKind::InvalidCall, arg, message);
            return SizedType::none();
        };
        match len {
            Ok(len) => SizedType::array(SizedType::uint(8), len)
                .with_addr_space(AddrSpace::Kernel)
                .with_internal(true),
            Err(_) => {
                let message = format!("pton() expects a valid {family} address, got {addr}");
                self.error(DiagnosticKind::InvalidCall, arg, message);
                SizedType::none()
            }
        }
    }

    /// `kstack()`, `kstack(limit)`, `kstack(mode)` or `kstack(mode, limit)`.
    fn stack_type(&mut self, id: NodeId, name: &str, args: &[NodeId]) -> SizedType {
        let ast = self.cx.ast;
        let kernel = name == "kstack";
        let mut mode = self.cx.env.config.stack_mode;
        let limit = match args {
            [] => None,
            [arg] => match ast.kind(*arg) {
                NodeKind::Identifier(ident) => {
                    mode = StackMode::parse(ast.name(*ident)).unwrap_or(mode);
                    None
                }
                NodeKind::Integer { .. } => self.literal_arg(args, 0),
                _ => {
                    self.error(DiagnosticKind::InvalidCall, *arg, format!("{name}: invalid limit value"));
                    return SizedType::none();
                }
            },
            [first, second] => {
                let NodeKind::Identifier(ident) = ast.kind(*first) else {
                    self.error(
                        DiagnosticKind::InvalidCall,
                        *first,
                        "Expected stack mode as first argument",
                    );
                    return SizedType::none();
                };
                mode = StackMode::parse(ast.name(*ident)).unwrap_or(mode);
                let Some(limit) = self.literal_arg(args, 1) else {
                    self.error(DiagnosticKind::InvalidCall, *second, format!("{name}: invalid limit value"));
                    return SizedType::none();
                };
                Some(limit)
            }
            _ => {
                self.error(DiagnosticKind::InvalidCall, id, "Invalid number of arguments");
                return SizedType::none();
            }
        };

        if let Some(limit) = limit.filter(|limit| *limit > MAX_STACK_SIZE) {
            let message = format!(
                "{name}([int limit]): limit shouldn't exceed {MAX_STACK_SIZE}, {limit} given"
            );
            self.error(DiagnosticKind::InvalidCall, id, message);
        }
        SizedType::stack(kernel, mode)
    }
}
