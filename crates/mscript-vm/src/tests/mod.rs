//! Integration tests: source text in, values out

pub mod helpers;

pub mod codegen;
pub mod control_flow;
pub mod errors;
pub mod functions;
pub mod library;
pub mod scenarios;
