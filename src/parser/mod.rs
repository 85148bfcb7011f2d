//! C++ subset source parser
//!
//! This module transforms source text into the Abstract Syntax Tree consumed by
//! the evaluator:
//! - [`lexer`]: Tokenization (source text → tokens), `#include` collection
//! - [`parse`]: Parsing (tokens → AST)
//! - [`ast`]: AST node definitions, spans and node kinds
//!
//! # Supported Subset
//!
//! - Types: every arithmetic type of the limits table, `auto`, structs with
//!   member defaults and methods, typedefs, pointers, references, arrays,
//!   function pointers
//! - Statements: declarations, `if`, `switch`, `while`, `do`, `for`, range
//!   `for`, jumps, labels
//! - Expressions: the full operator set including compound assignment, comma,
//!   casts, `sizeof` and brace lists
//! - No preprocessor beyond recording `#include` names
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};

/// Parse a whole translation unit.
pub fn parse_source(source: &str) -> Result<ast::Program, ParseError> {
    Parser::new(source)?.parse_program()
}
