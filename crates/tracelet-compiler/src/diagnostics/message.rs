use rowan::TextRange;

/// Diagnostic kinds ordered by priority (highest priority first).
///
/// Parse errors come first: they are root causes and stop compilation before
/// the resolver runs. Resolver errors follow, then warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // Parsing
    UnexpectedToken,
    ExpectedExpression,
    ExpectedTypeName,
    InvalidAttachPoint,
    InvalidAssignmentTarget,

    // Map usage conflicts, decided before resolution
    MapUsage,

    // Resolution
    TypeMismatch,
    ArgumentMismatch,
    InvalidAssignment,
    AggregateAssignment,
    LockedType,
    BranchMismatch,
    InvalidOperator,
    InvalidAccess,
    InvalidCall,
    UnknownField,
    UnknownStruct,
    UnknownFunction,
    UnknownIdentifier,
    InvalidProbeBuiltin,
    LoopRange,
    LoopIterable,

    // Convergence
    UnresolvedVariable,
    UnresolvedComptime,

    // Warnings
    SignMismatch,
    SignedDivision,
    DistinctPointers,
    AddrSpaceMismatch,
    StrLengthTruncated,
}

impl DiagnosticKind {
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::SignMismatch
            | Self::SignedDivision
            | Self::DistinctPointers
            | Self::AddrSpaceMismatch
            | Self::StrLengthTruncated => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Default hint, included automatically.
    pub fn default_hint(&self) -> Option<&'static str> {
        match self {
            Self::LockedType => Some(
                "the earlier type was observed by `sizeof`, `typeof` or `typeinfo` and cannot change",
            ),
            Self::SignedDivision => Some("cast to unsigned to silence this warning"),
            _ => None,
        }
    }

    /// Base message for this kind, used when no custom message is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected token",
            Self::ExpectedExpression => "expected an expression",
            Self::ExpectedTypeName => "expected type name",
            Self::InvalidAttachPoint => "invalid attach point",
            Self::InvalidAssignmentTarget => "invalid assignment target",

            Self::MapUsage => "conflicting map usage",

            Self::TypeMismatch => "type mismatch",
            Self::ArgumentMismatch => "map argument mismatch",
            Self::InvalidAssignment => "value cannot be assigned",
            Self::AggregateAssignment => "aggregate value cannot be assigned",
            Self::LockedType => "type is locked",
            Self::BranchMismatch => "branches have incompatible types",
            Self::InvalidOperator => "invalid operator",
            Self::InvalidAccess => "invalid access",
            Self::InvalidCall => "invalid call",
            Self::UnknownField => "unknown field",
            Self::UnknownStruct => "unknown struct",
            Self::UnknownFunction => "unknown function",
            Self::UnknownIdentifier => "unknown identifier",
            Self::InvalidProbeBuiltin => "builtin not available here",
            Self::LoopRange => "invalid loop range",
            Self::LoopIterable => "invalid loop expression",

            Self::UnresolvedVariable => "Could not resolve the type of this variable",
            Self::UnresolvedComptime => "Unable to resolve comptime expression",

            Self::SignMismatch => "integers of different signs",
            Self::SignedDivision => "signed division",
            Self::DistinctPointers => "comparison of distinct pointer types",
            Self::AddrSpaceMismatch => "Addrspace mismatch",
            Self::StrLengthTruncated => "string length truncated",
        }
    }

    /// Template for custom messages. Contains `{}` placeholder for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::UnexpectedToken | Self::ExpectedExpression | Self::ExpectedTypeName => {
                format!("{}: {{}}", self.fallback_message())
            }
            Self::UnknownFunction => "Unknown function: '{}'".to_string(),
            Self::UnresolvedVariable | Self::UnresolvedComptime => {
                self.fallback_message().to_string()
            }
            // Resolver messages are complete sentences built at the call site.
            _ => "{}".to_string(),
        }
    }

    /// - `None` returns `fallback_message()`
    /// - `Some(detail)` returns `custom_message()` with `{}` replaced by detail
    pub fn message(&self, msg: Option<&str>) -> String {
        match msg {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) range: TextRange,
    pub(crate) message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    pub(crate) range: TextRange,
    pub(crate) message: String,
    pub(crate) related: Vec<RelatedInfo>,
    pub(crate) hints: Vec<String>,
}

impl DiagnosticMessage {
    pub(crate) fn new(kind: DiagnosticKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            message: kind.fallback_message().to_string(),
            related: Vec::new(),
            hints: kind.default_hint().map(String::from).into_iter().collect(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    /// Identity used for deduplication: the same edge evaluated twice must
    /// not report twice.
    pub(crate) fn same_report(&self, other: &DiagnosticMessage) -> bool {
        self.kind == other.kind && self.range == other.range && self.message == other.message
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity(),
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message
        )?;
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message,
                u32::from(related.range.start()),
                u32::from(related.range.end())
            )?;
        }
        for hint in &self.hints {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}
