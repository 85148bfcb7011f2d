//! Runtime error type for the interpreter
//!
//! This module defines [`RuntimeError`], the single fault raised during program
//! execution (as opposed to parse errors or host outcomes such as timeouts).
//!
//! All runtime errors are fatal - they halt the run and carry the offending
//! node so front ends can map them back to a source line.

use crate::parser::ast::NodeInfo;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}{}", location_suffix(.node))]
pub struct RuntimeError {
    pub message: String,
    pub node: Option<NodeInfo>,
}

fn location_suffix(node: &Option<NodeInfo>) -> String {
    match node {
        Some(node) => format!(" (line {}, column {})", node.span.line, node.span.column),
        None => String::new(),
    }
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
            node: None,
        }
    }

    pub fn at(message: impl Into<String>, node: Option<NodeInfo>) -> Self {
        RuntimeError {
            message: message.into(),
            node,
        }
    }

    pub fn not_implemented(what: impl std::fmt::Display) -> Self {
        RuntimeError::new(format!("not implemented: {}", what))
    }

    /// Attach a node unless one is already recorded
    pub fn or_at(mut self, node: Option<NodeInfo>) -> Self {
        if self.node.is_none() {
            self.node = node;
        }
        self
    }

    /// Line number of the offending node, if known
    pub fn line(&self) -> Option<usize> {
        self.node.map(|node| node.span.line)
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{NodeKind, Span};

    #[test]
    fn test_display_includes_location() {
        let node = NodeInfo {
            kind: NodeKind::ExpressionStatement,
            span: Span::new(4, 9, 2, 3),
        };
        let err = RuntimeError::at("undefined identifier x", Some(node));
        assert_eq!(err.to_string(), "undefined identifier x (line 2, column 3)");
        assert_eq!(RuntimeError::not_implemented("goto").to_string(), "not implemented: goto");
    }
}
