#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by the tracelet compiler and CLI.
//!
//! - [`SizedType`]: the type lattice (shapes, promotion, fit checks, layout)
//! - [`Interner`]: string interning for variable, map and field names
//! - [`Colors`]: ANSI palette for CLI output

mod colors;
mod interner;
mod invariants;
pub mod types;

pub use colors::Colors;
pub use interner::{Interner, Symbol};
pub use types::{
    AddrSpace, AggregateKind, Field, SizedType, StackMode, StructField, StructLayout, StructRef,
    TimestampMode, TypeParseError, TypeShape,
};

#[cfg(test)]
mod interner_tests;
#[cfg(test)]
mod types_tests;
