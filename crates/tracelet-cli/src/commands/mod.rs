pub mod ast;
pub mod check;
pub mod env_loader;
pub mod run_common;
pub mod script_loader;
pub mod types;

#[cfg(test)]
mod types_tests;
