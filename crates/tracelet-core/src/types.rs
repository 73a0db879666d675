//! The type lattice used by the resolver.
//!
//! A [`SizedType`] is a [`TypeShape`] plus provenance marks (address space,
//! context access, internal, function-argument). Equality and hashing only
//! look at the shape; the marks ride along and are merged by the resolver.
//!
//! `none` is the bottom of the lattice: "not known yet". [`SizedType::promote`]
//! is the join, [`SizedType::fits_into`] the compatibility check used for
//! declared and locked types.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::invariants::ensure_int_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddrSpace {
    #[default]
    None,
    Kernel,
    User,
}

impl fmt::Display for AddrSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrSpace::None => write!(f, "none"),
            AddrSpace::Kernel => write!(f, "kernel"),
            AddrSpace::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    Monotonic,
    Boot,
    Tai,
    SwTai,
}

impl TimestampMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monotonic" => Some(Self::Monotonic),
            "boot" => Some(Self::Boot),
            "tai" => Some(Self::Tai),
            "sw_tai" => Some(Self::SwTai),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackMode {
    Bpftrace,
    Perf,
    #[default]
    Raw,
}

impl StackMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bpftrace" => Some(Self::Bpftrace),
            "perf" => Some(Self::Perf),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StackMode::Bpftrace => "bpftrace",
            StackMode::Perf => "perf",
            StackMode::Raw => "raw",
        }
    }
}

/// Reducer kinds that may only live in map values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    Stats,
    Hist,
    Lhist,
    Tseries,
}

impl AggregateKind {
    pub fn from_function(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "min" => Self::Min,
            "max" => Self::Max,
            "avg" => Self::Avg,
            "stats" => Self::Stats,
            "hist" => Self::Hist,
            "lhist" => Self::Lhist,
            "tseries" => Self::Tseries,
            _ => return None,
        })
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Stats => "stats",
            Self::Hist => "hist",
            Self::Lhist => "lhist",
            Self::Tseries => "tseries",
        }
    }

    /// Castable aggregates read back as a plain 64-bit integer.
    pub fn is_castable(&self) -> bool {
        matches!(
            self,
            Self::Count | Self::Sum | Self::Min | Self::Max | Self::Avg
        )
    }

    /// Whether the reducer tracks the signedness of its operand.
    pub fn tracks_sign(&self) -> bool {
        matches!(
            self,
            Self::Sum | Self::Min | Self::Max | Self::Avg | Self::Stats
        )
    }

    fn type_name(&self, signed: bool) -> &'static str {
        match (self, signed || !self.tracks_sign()) {
            (Self::Count, _) => "count_t",
            (Self::Sum, true) => "sum_t",
            (Self::Sum, false) => "usum_t",
            (Self::Min, true) => "min_t",
            (Self::Min, false) => "umin_t",
            (Self::Max, true) => "max_t",
            (Self::Max, false) => "umax_t",
            (Self::Avg, true) => "avg_t",
            (Self::Avg, false) => "uavg_t",
            (Self::Stats, true) => "stats_t",
            (Self::Stats, false) => "ustats_t",
            (Self::Hist, _) => "hist_t",
            (Self::Lhist, _) => "lhist_t",
            (Self::Tseries, _) => "tseries_t",
        }
    }
}

/// A named record field (tuples with names).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: SizedType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: SizedType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A member of a C struct with its byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SizedType,
    pub offset: usize,
}

/// Layout of a named C struct or union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub name: String,
    pub size: usize,
    pub fields: Vec<StructField>,
}

impl StructLayout {
    /// Lay out fields with natural C alignment.
    pub fn from_fields(name: impl Into<String>, fields: Vec<(String, SizedType)>) -> Self {
        let mut offset = 0;
        let mut max_align = 1;
        let mut laid_out = Vec::with_capacity(fields.len());
        for (field_name, ty) in fields {
            let align = ty.align();
            max_align = max_align.max(align);
            offset = align_up(offset, align);
            let size = ty.size();
            laid_out.push(StructField {
                name: field_name,
                ty,
                offset,
            });
            offset += size;
        }
        Self {
            name: name.into(),
            size: align_up(offset, max_align),
            fields: laid_out,
        }
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn align(&self) -> usize {
        self.fields.iter().map(|f| f.ty.align()).max().unwrap_or(1)
    }
}

/// Reference to a named struct. The layout is filled in once the name is
/// looked up in a registry.
#[derive(Debug, Clone)]
pub struct StructRef {
    pub name: String,
    pub layout: Option<Arc<StructLayout>>,
}

impl StructRef {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: None,
        }
    }

    pub fn resolved(layout: Arc<StructLayout>) -> Self {
        Self {
            name: layout.name.clone(),
            layout: Some(layout),
        }
    }
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for StructRef {}

impl Hash for StructRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TypeShape {
    #[default]
    None,
    Void,
    Bool,
    Integer {
        bits: u8,
        signed: bool,
    },
    String {
        size: usize,
    },
    Buffer {
        size: usize,
    },
    Pointer(Box<SizedType>),
    /// `len == 0` is an unsized array, sized later by a cast.
    Array {
        elem: Box<SizedType>,
        len: usize,
    },
    Tuple(Vec<SizedType>),
    Record(Vec<Field>),
    Struct(StructRef),
    Enum {
        name: String,
        bits: u8,
    },
    Aggregate {
        kind: AggregateKind,
        signed: bool,
    },
    TimestampMode(TimestampMode),
    Stack {
        kernel: bool,
        mode: StackMode,
    },
    Ksym,
    Usym,
    Timestamp,
    Inet {
        size: usize,
    },
    MacAddr,
    CgroupPath,
}

#[derive(Debug, Clone, Default)]
pub struct SizedType {
    pub shape: TypeShape,
    pub addr_space: AddrSpace,
    /// Value was read from probe context memory.
    pub ctx_access: bool,
    /// Value lives in BPF-owned memory rather than being read from the target.
    pub internal: bool,
    /// The `args` struct of a probe with typed function arguments.
    pub funcarg: bool,
}

impl PartialEq for SizedType {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
    }
}

impl Eq for SizedType {}

impl Hash for SizedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
    }
}

impl From<TypeShape> for SizedType {
    fn from(shape: TypeShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }
}

impl SizedType {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn void() -> Self {
        TypeShape::Void.into()
    }

    pub fn bool() -> Self {
        TypeShape::Bool.into()
    }

    pub fn integer(bits: u8, signed: bool) -> Self {
        TypeShape::Integer {
            bits: ensure_int_width(bits),
            signed,
        }
        .into()
    }

    pub fn uint(bits: u8) -> Self {
        Self::integer(bits, false)
    }

    pub fn int(bits: u8) -> Self {
        Self::integer(bits, true)
    }

    pub fn string(size: usize) -> Self {
        TypeShape::String { size }.into()
    }

    pub fn buffer(size: usize) -> Self {
        TypeShape::Buffer { size }.into()
    }

    pub fn pointer(pointee: SizedType) -> Self {
        TypeShape::Pointer(Box::new(pointee)).into()
    }

    pub fn array(elem: SizedType, len: usize) -> Self {
        TypeShape::Array {
            elem: Box::new(elem),
            len,
        }
        .into()
    }

    pub fn tuple(elems: Vec<SizedType>) -> Self {
        TypeShape::Tuple(elems).into()
    }

    pub fn record(fields: Vec<Field>) -> Self {
        TypeShape::Record(fields).into()
    }

    pub fn cstruct(sref: StructRef) -> Self {
        TypeShape::Struct(sref).into()
    }

    pub fn enumeration(name: impl Into<String>, bits: u8) -> Self {
        TypeShape::Enum {
            name: name.into(),
            bits: ensure_int_width(bits),
        }
        .into()
    }

    pub fn aggregate(kind: AggregateKind, signed: bool) -> Self {
        TypeShape::Aggregate { kind, signed }.into()
    }

    pub fn timestamp_mode(mode: TimestampMode) -> Self {
        TypeShape::TimestampMode(mode).into()
    }

    pub fn stack(kernel: bool, mode: StackMode) -> Self {
        TypeShape::Stack { kernel, mode }.into()
    }

    pub fn ksym() -> Self {
        TypeShape::Ksym.into()
    }

    pub fn usym() -> Self {
        TypeShape::Usym.into()
    }

    pub fn timestamp() -> Self {
        TypeShape::Timestamp.into()
    }

    pub fn inet(size: usize) -> Self {
        TypeShape::Inet { size }.into()
    }

    pub fn mac_addr() -> Self {
        TypeShape::MacAddr.into()
    }

    pub fn cgroup_path() -> Self {
        TypeShape::CgroupPath.into()
    }

    /// Type of an integer literal: the smallest width that holds it,
    /// unsigned unless negative.
    pub fn literal_int(magnitude: u64, negative: bool) -> Self {
        if negative {
            let bits = if magnitude <= 1 << 7 {
                8
            } else if magnitude <= 1 << 15 {
                16
            } else if magnitude <= 1 << 31 {
                32
            } else {
                64
            };
            return Self::int(bits);
        }
        let bits = if magnitude <= u8::MAX as u64 {
            8
        } else if magnitude <= u16::MAX as u64 {
            16
        } else if magnitude <= u32::MAX as u64 {
            32
        } else {
            64
        };
        Self::uint(bits)
    }

    /// Built-in scalar type names, including the C spellings accepted in
    /// struct definitions.
    pub fn from_base_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Self::void(),
            "bool" | "_Bool" => Self::bool(),
            "string" => Self::string(0),
            "uint8" | "u8" | "uint8_t" => Self::uint(8),
            "uint16" | "u16" | "uint16_t" => Self::uint(16),
            "uint32" | "u32" | "uint32_t" => Self::uint(32),
            "uint64" | "u64" | "uint64_t" => Self::uint(64),
            "int8" | "s8" | "int8_t" | "char" => Self::int(8),
            "int16" | "s16" | "int16_t" | "short" => Self::int(16),
            "int32" | "s32" | "int32_t" | "int" => Self::int(32),
            "int64" | "s64" | "int64_t" | "long" => Self::int(64),
            "ksym_t" => Self::ksym(),
            "usym_t" => Self::usym(),
            "timestamp" => Self::timestamp(),
            "mac_address" => Self::mac_addr(),
            "cgroup_path_t" => Self::cgroup_path(),
            _ => return None,
        })
    }

    pub fn with_addr_space(mut self, addr_space: AddrSpace) -> Self {
        self.addr_space = addr_space;
        self
    }

    pub fn with_ctx_access(mut self, ctx_access: bool) -> Self {
        self.ctx_access = ctx_access;
        self
    }

    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    pub fn with_funcarg(mut self, funcarg: bool) -> Self {
        self.funcarg = funcarg;
        self
    }

    pub fn is_none(&self) -> bool {
        matches!(self.shape, TypeShape::None)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.shape, TypeShape::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.shape, TypeShape::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.shape, TypeShape::Integer { .. })
    }

    pub fn is_signed(&self) -> bool {
        match self.shape {
            TypeShape::Integer { signed, .. } | TypeShape::Aggregate { signed, .. } => signed,
            _ => false,
        }
    }

    /// Bit width of integer-like types.
    pub fn bits(&self) -> Option<u8> {
        match self.shape {
            TypeShape::Integer { bits, .. } | TypeShape::Enum { bits, .. } => Some(bits),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self.shape, TypeShape::String { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.shape, TypeShape::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.shape, TypeShape::Array { .. })
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.shape, TypeShape::Tuple(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self.shape, TypeShape::Record(_))
    }

    pub fn is_cstruct(&self) -> bool {
        matches!(self.shape, TypeShape::Struct(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.shape, TypeShape::Enum { .. })
    }

    /// Aggregate values need per-cpu map storage.
    pub fn is_aggregate(&self) -> bool {
        matches!(self.shape, TypeShape::Aggregate { .. })
    }

    pub fn aggregate_kind(&self) -> Option<AggregateKind> {
        match self.shape {
            TypeShape::Aggregate { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn is_castable_aggregate(&self) -> bool {
        self.aggregate_kind().is_some_and(|k| k.is_castable())
    }

    /// Whether a map with this value type can be iterated with `for`.
    pub fn is_map_iterable(&self) -> bool {
        !matches!(
            self.aggregate_kind(),
            Some(AggregateKind::Hist | AggregateKind::Lhist | AggregateKind::Tseries)
        )
    }

    pub fn pointee(&self) -> Option<&SizedType> {
        match &self.shape {
            TypeShape::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn elements(&self) -> Option<&[SizedType]> {
        match &self.shape {
            TypeShape::Tuple(elems) => Some(elems),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[Field]> {
        match &self.shape {
            TypeShape::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn struct_ref(&self) -> Option<&StructRef> {
        match &self.shape {
            TypeShape::Struct(sref) => Some(sref),
            _ => None,
        }
    }

    /// Integer view of a castable aggregate; other types are returned as is.
    pub fn as_castable_int(&self) -> SizedType {
        match self.shape {
            TypeShape::Aggregate { kind, signed } if kind.is_castable() => {
                Self::integer(64, signed)
            }
            _ => self.clone(),
        }
    }

    /// The join of two types, or `None` if they have no common type.
    ///
    /// The left operand's provenance marks are kept.
    pub fn promote(&self, other: &SizedType) -> Option<SizedType> {
        if self.is_none() {
            return Some(other.clone());
        }
        if other.is_none() || self == other {
            return Some(self.clone());
        }

        let shape = match (&self.shape, &other.shape) {
            (
                TypeShape::Integer { bits: lb, signed: ls },
                TypeShape::Integer { bits: rb, signed: rs },
            ) => promote_int(*lb, *ls, *rb, *rs)?,
            (TypeShape::Integer { .. }, TypeShape::Aggregate { .. })
            | (TypeShape::Aggregate { .. }, TypeShape::Integer { .. })
                if self.is_castable_aggregate() || other.is_castable_aggregate() =>
            {
                return self
                    .as_castable_int()
                    .promote(&other.as_castable_int())
                    .map(|t| self.marks_onto(t));
            }
            (TypeShape::String { size: l }, TypeShape::String { size: r }) => {
                TypeShape::String { size: *l.max(r) }
            }
            (TypeShape::Buffer { size: l }, TypeShape::Buffer { size: r }) => {
                TypeShape::Buffer { size: *l.max(r) }
            }
            (TypeShape::Tuple(l), TypeShape::Tuple(r)) if l.len() == r.len() => {
                let elems = l
                    .iter()
                    .zip(r)
                    .map(|(a, b)| a.promote(b))
                    .collect::<Option<Vec<_>>>()?;
                TypeShape::Tuple(elems)
            }
            (TypeShape::Record(l), TypeShape::Record(r)) if l.len() == r.len() => {
                let mut fields = Vec::with_capacity(l.len());
                for field in l {
                    let theirs = r.iter().find(|f| f.name == field.name)?;
                    fields.push(Field::new(field.name.clone(), field.ty.promote(&theirs.ty)?));
                }
                TypeShape::Record(fields)
            }
            (
                TypeShape::Array { elem: le, len: ll },
                TypeShape::Array { elem: re, len: rl },
            ) if ll == rl => TypeShape::Array {
                elem: Box::new(le.promote(re)?),
                len: *ll,
            },
            (
                TypeShape::Aggregate { kind: lk, signed: ls },
                TypeShape::Aggregate { kind: rk, signed: rs },
            ) if lk == rk => TypeShape::Aggregate {
                kind: *lk,
                signed: *ls || *rs,
            },
            _ => return None,
        };
        Some(self.marks_onto(shape.into()))
    }

    fn marks_onto(&self, ty: SizedType) -> SizedType {
        SizedType {
            shape: ty.shape,
            addr_space: self.addr_space,
            ctx_access: self.ctx_access,
            internal: self.internal,
            funcarg: self.funcarg,
        }
    }

    /// Whether a value of this type can be stored into `other` without
    /// changing `other`.
    pub fn fits_into(&self, other: &SizedType) -> bool {
        match (&self.shape, &other.shape) {
            (
                TypeShape::Integer { bits: lb, signed: ls },
                TypeShape::Integer { bits: rb, signed: rs },
            ) => (ls == rs && lb <= rb) || (!ls && *rs && lb < rb),
            (TypeShape::String { size: l }, TypeShape::String { size: r }) => l <= r,
            (TypeShape::Tuple(l), TypeShape::Tuple(r)) => {
                l.len() == r.len() && l.iter().zip(r).all(|(a, b)| a.fits_into(b))
            }
            (TypeShape::Record(l), TypeShape::Record(r)) => {
                l.len() == r.len()
                    && l.iter().all(|field| {
                        r.iter()
                            .find(|f| f.name == field.name)
                            .is_some_and(|f| field.ty.fits_into(&f.ty))
                    })
            }
            _ => self == other,
        }
    }

    pub fn size(&self) -> usize {
        match &self.shape {
            TypeShape::None | TypeShape::Void | TypeShape::TimestampMode(_) => 0,
            TypeShape::Bool => 1,
            TypeShape::Integer { bits, .. } | TypeShape::Enum { bits, .. } => *bits as usize / 8,
            TypeShape::String { size } | TypeShape::Buffer { size } | TypeShape::Inet { size } => {
                *size
            }
            TypeShape::Pointer(_) | TypeShape::Aggregate { .. } | TypeShape::Stack { .. } => 8,
            TypeShape::Ksym => 8,
            TypeShape::Usym | TypeShape::Timestamp | TypeShape::CgroupPath => 16,
            TypeShape::MacAddr => 6,
            TypeShape::Array { elem, len } => elem.size() * len,
            TypeShape::Tuple(elems) => packed_size(elems.iter()),
            TypeShape::Record(fields) => packed_size(fields.iter().map(|f| &f.ty)),
            TypeShape::Struct(sref) => sref.layout.as_ref().map_or(0, |l| l.size),
        }
    }

    pub fn align(&self) -> usize {
        match &self.shape {
            TypeShape::Array { elem, .. } => elem.align(),
            TypeShape::Tuple(elems) => elems.iter().map(|e| e.align()).max().unwrap_or(1),
            TypeShape::Record(fields) => fields.iter().map(|f| f.ty.align()).max().unwrap_or(1),
            TypeShape::Struct(sref) => sref.layout.as_ref().map_or(1, |l| l.align()),
            TypeShape::String { .. }
            | TypeShape::Buffer { .. }
            | TypeShape::Inet { .. }
            | TypeShape::MacAddr => 1,
            _ => self.size().clamp(1, 8),
        }
    }

    /// Byte offset of each tuple element or record field.
    pub fn element_offsets(&self) -> Vec<usize> {
        let elems: Vec<&SizedType> = match &self.shape {
            TypeShape::Tuple(elems) => elems.iter().collect(),
            TypeShape::Record(fields) => fields.iter().map(|f| &f.ty).collect(),
            _ => return Vec::new(),
        };
        let mut offset = 0;
        elems
            .into_iter()
            .map(|e| {
                offset = align_up(offset, e.align());
                let at = offset;
                offset += e.size();
                at
            })
            .collect()
    }

    /// The shape family, as exposed by `typeinfo(..).base_type`.
    pub fn base_name(&self) -> &'static str {
        match &self.shape {
            TypeShape::None => "none",
            TypeShape::Void => "void",
            TypeShape::Bool => "bool",
            TypeShape::Integer { .. } => "int",
            TypeShape::String { .. } => "string",
            TypeShape::Buffer { .. } => "buffer",
            TypeShape::Pointer(_) => "pointer",
            TypeShape::Array { .. } => "array",
            TypeShape::Tuple(_) => "tuple",
            TypeShape::Record(_) => "record",
            TypeShape::Struct(_) => "c_struct",
            TypeShape::Enum { .. } => "enum",
            TypeShape::Aggregate { kind, signed } => kind.type_name(*signed),
            TypeShape::TimestampMode(_) => "timestamp_mode",
            TypeShape::Stack { kernel: true, .. } => "kstack",
            TypeShape::Stack { kernel: false, .. } => "ustack",
            TypeShape::Ksym => "ksym_t",
            TypeShape::Usym => "usym_t",
            TypeShape::Timestamp => "timestamp",
            TypeShape::Inet { .. } => "inet",
            TypeShape::MacAddr => "mac_address",
            TypeShape::CgroupPath => "cgroup_path_t",
        }
    }
}

fn promote_int(lb: u8, ls: bool, rb: u8, rs: bool) -> Option<TypeShape> {
    if ls == rs {
        return Some(TypeShape::Integer {
            bits: lb.max(rb),
            signed: ls,
        });
    }
    let (ub, sb) = if ls { (rb, lb) } else { (lb, rb) };
    if ub >= 64 {
        return None;
    }
    Some(TypeShape::Integer {
        bits: sb.max(ub * 2),
        signed: true,
    })
}

fn align_up(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

fn packed_size<'a>(elems: impl Iterator<Item = &'a SizedType>) -> usize {
    let mut offset = 0;
    let mut max_align = 1;
    for e in elems {
        let align = e.align();
        max_align = max_align.max(align);
        offset = align_up(offset, align) + e.size();
    }
    align_up(offset, max_align)
}

impl fmt::Display for SizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            TypeShape::Integer { bits, signed } => {
                write!(f, "{}int{bits}", if *signed { "" } else { "u" })
            }
            TypeShape::String { size } => write!(f, "string[{size}]"),
            TypeShape::Buffer { size } => write!(f, "buffer[{size}]"),
            TypeShape::Inet { size } => write!(f, "inet[{size}]"),
            TypeShape::Pointer(inner) if inner.is_pointer() => write!(f, "{inner}*"),
            TypeShape::Pointer(inner) => write!(f, "{inner} *"),
            TypeShape::Array { elem, len } => write!(f, "{elem}[{len}]"),
            TypeShape::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            TypeShape::Record(fields) => {
                write!(f, "record {{")?;
                for (i, field) in fields.iter().enumerate() {
                    let sep = if i > 0 { "," } else { "" };
                    write!(f, "{sep} .{} = {}", field.name, field.ty)?;
                }
                write!(f, " }}")
            }
            TypeShape::Struct(sref) => write!(f, "{}", sref.name),
            TypeShape::Enum { name, .. } => write!(f, "enum {name}"),
            _ => write!(f, "{}", self.base_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    #[error("unknown type name `{0}`")]
    UnknownName(String),
    #[error("invalid array length in `{0}`")]
    InvalidLength(String),
}

impl FromStr for SizedType {
    type Err = TypeParseError;

    /// Parses the textual form produced by `Display`, for scalar, pointer,
    /// array and struct types. Tuples and records are not parseable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix('*') {
            return Ok(Self::pointer(inner.parse()?));
        }
        if let Some(head) = s.strip_suffix(']') {
            let Some((base, len)) = head.rsplit_once('[') else {
                return Err(TypeParseError::InvalidLength(s.to_string()));
            };
            let len: usize = len
                .trim()
                .parse()
                .map_err(|_| TypeParseError::InvalidLength(s.to_string()))?;
            return Ok(match base.trim() {
                "string" => Self::string(len),
                "buffer" => Self::buffer(len),
                "inet" => Self::inet(len),
                elem => Self::array(elem.parse()?, len),
            });
        }
        if s.starts_with("struct ") || s.starts_with("union ") {
            return Ok(Self::cstruct(StructRef::unresolved(s)));
        }
        if let Some(name) = s.strip_prefix("enum ") {
            return Ok(Self::enumeration(name.trim(), 64));
        }
        if let Some(rest) = s.strip_prefix("unsigned") {
            let rest = rest.trim();
            let base = if rest.is_empty() { "int" } else { rest };
            return match base.parse::<SizedType>().ok().and_then(|t| t.bits()) {
                Some(bits) => Ok(Self::uint(bits)),
                None => Err(TypeParseError::UnknownName(s.to_string())),
            };
        }
        if let Some(rest) = s.strip_prefix("signed ") {
            return rest.parse();
        }
        if s == "long long" || s == "long int" {
            return Ok(Self::int(64));
        }
        Self::from_base_name(s).ok_or_else(|| TypeParseError::UnknownName(s.to_string()))
    }
}

impl Serialize for SizedType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SizedType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
