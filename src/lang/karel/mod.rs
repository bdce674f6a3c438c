//! # KAREL language
//!
//! Structured controller programs (`.kl`).
//! The parser produces `ast::Program`, which the query modules use to resolve
//! declarations, user types, and field paths.

pub mod ast;
pub mod parser;

#[cfg(test)]
mod parser_test;

pub use parser::parse;
