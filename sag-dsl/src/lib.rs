//! SAG DSL - Wire Grammar
//!
//! This crate implements the SAG text grammar: the lexer, the recursive
//! descent parser (wire text to message AST), the minifier (AST back to the
//! canonical compact wire form) and the expression evaluator.
//!
//! Architecture:
//! ```text
//! Wire Text
//!     ↓
//! Lexer (tokens with spans)
//!     ↓
//! Parser (typed Message AST, expression text preserved verbatim)
//!     ↓
//! Minifier (canonical wire form, parse(minify(m)) == m)
//!
//! Expression text → Evaluator (same lexer, Context-driven)
//! ```

pub mod expr;
pub mod lexer;
pub mod minifier;
pub mod parser;

pub use expr::evaluate;
pub use minifier::{compare_with_json, count_tokens, minify, TokenComparison};
pub use parser::parse;
