//! Static type tables for builtins and intrinsic calls.

use tracelet_core::{AggregateKind, SizedType};

/// Functions that never produce a value.
pub const VOID_FUNCS: &[&str] = &[
    "join", "printf", "errorf", "warnf", "system", "cat", "debugf", "exit", "print", "clear",
    "zero", "time", "unwatch", "fail", "delete",
];

/// Builtins whose type does not depend on the probe.
pub fn simple_builtin(name: &str) -> Option<SizedType> {
    Some(match name {
        "pid" | "tid" => SizedType::uint(32),
        "nsecs" | "elapsed" | "cgroup" | "uid" | "gid" | "cpu" | "rand" | "jiffies" | "ncpus"
        | "cpid" => SizedType::uint(64),
        // A uid, printed as a name.
        "username" => SizedType::uint(64),
        "usermode" => SizedType::uint(8),
        _ => return None,
    })
}

/// Intrinsic calls with a fixed result type.
pub fn simple_call(name: &str) -> Option<SizedType> {
    Some(match name {
        "ksym" => SizedType::ksym(),
        "usym" => SizedType::usym(),
        "cgroupid" | "strncmp" | "socket_cookie" => SizedType::uint(64),
        "cgroup_path" => SizedType::cgroup_path(),
        "stack_len" | "len" | "memcmp" | "memcmp_record" => SizedType::int(64),
        "strftime" => SizedType::timestamp(),
        "macaddr" => SizedType::mac_addr(),
        "skboutput" => SizedType::uint(32),
        "has_key" | "strcontains" => SizedType::bool(),
        _ => return None,
    })
}

/// Example call shown when an aggregate value is copied between maps.
pub fn aggregate_hint(kind: AggregateKind) -> &'static str {
    match kind {
        AggregateKind::Count => "count()",
        AggregateKind::Sum => "sum(retval)",
        AggregateKind::Min => "min(retval)",
        AggregateKind::Max => "max(retval)",
        AggregateKind::Avg => "avg(retval)",
        AggregateKind::Hist => "hist(retval)",
        AggregateKind::Lhist => "lhist(rand %10, 0, 10, 1)",
        AggregateKind::Tseries => "tseries(rand %10, 10s, 1)",
        AggregateKind::Stats => "stats(arg2)",
    }
}

/// Aggregates whose value type follows their integer operand.
pub fn takes_operand(kind: AggregateKind) -> bool {
    matches!(
        kind,
        AggregateKind::Sum
            | AggregateKind::Min
            | AggregateKind::Max
            | AggregateKind::Avg
            | AggregateKind::Stats
    )
}

pub const COMM_SIZE: usize = 16;
pub const NTOP_SIZE: usize = 24;
pub const MAX_STACK_SIZE: u64 = 1024;

/// Name of the probe-args field holding a function's return value.
pub const RETVAL_FIELD: &str = "$retval";
