//! # TP language
//!
//! Teach Pendant programs in ASCII listing form (`.ls`).
//! The parser produces `ast::Program`, the formatter works on raw text.

pub mod ast;
pub mod parser;
pub mod formatter;

#[cfg(test)]
mod parser_test;

pub use parser::parse;
