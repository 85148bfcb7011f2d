//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: declarations, declarators, structs, functions, typedefs
//! - `statements`: Parsing statements (if, while, for, switch, etc.)
//! - `expressions`: Parsing expressions with precedence climbing
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! The parser tracks the names introduced by `struct` and `typedef` so that a
//! statement starting with such a name is parsed as a declaration. Including
//! `<cstdio>`/`<stdio.h>` predeclares `FILE`.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("Parse error at line {}, column {}: {message}", .span.line, .span.column)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            span: err.span,
        }
    }
}

/// Recursive descent parser for the C++ subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) type_names: FxHashSet<String>,
    includes: Vec<String>,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        let includes = lexer.includes().to_vec();
        let mut type_names = FxHashSet::default();
        if includes.iter().any(|name| name == "cstdio" || name == "stdio.h") {
            type_names.insert("FILE".to_string());
        }
        Ok(Self {
            tokens,
            position: 0,
            type_names,
            includes,
        })
    }

    /// Parse the entire program (top-level declarations)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();
        program.includes = self.includes.clone();

        while !self.is_at_end() {
            if self.match_token(&Token::Semicolon(Span::default())) {
                continue;
            }
            let item = self.parse_external_declaration()?;
            program.items.push(item);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    /// True if the upcoming tokens start a declaration.
    pub(crate) fn starts_declaration(&self) -> bool {
        match self.peek() {
            Token::TypeWord(..) | Token::Specifier(..) | Token::Struct(_) | Token::Typedef(_) => {
                true
            }
            Token::Ident(name, _) => {
                self.type_names.contains(name)
                    && !matches!(
                        self.peek_ahead(1),
                        Some(Token::ColonColon(_) | Token::LParen(_) | Token::Dot(_) | Token::Arrow(_))
                            | Some(Token::Eq(_))
                    )
            }
            _ => false,
        }
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn check_ahead(&self, n: usize, token: &Token) -> bool {
        self.peek_ahead(n)
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.previous().span()
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span()
    }

    /// Span from `start` through the most recently consumed token.
    pub(crate) fn span_since(&self, start: Span) -> Span {
        start.to(self.previous_span())
    }

    pub(crate) fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            span: self.current_span(),
        })
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            self.error(format!("{}, found {}", message, self.peek()))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&Token::LParen(Span::default()), &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&Token::RParen(Span::default()), &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&Token::LBrace(Span::default()), &format!("Expected '{{' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&Token::RBrace(Span::default()), &format!("Expected '}}' {ctx}"))
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&Token::Semicolon(Span::default()), &format!("Expected ';' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name, _) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            self.error(format!("Expected identifier, found {}", self.peek()))
        }
    }

    /// Parse `a::b::c` (the first identifier may already be consumed).
    pub(crate) fn parse_qualified_name(&mut self) -> Result<Vec<String>, ParseError> {
        let mut parts = vec![self.expect_identifier()?];
        while self.match_token(&Token::ColonColon(Span::default())) {
            parts.push(self.expect_identifier()?);
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        let mut parser = Parser::new(source).unwrap();
        parser.parse_program().unwrap()
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("int main() { return 0; }");

        assert_eq!(program.items.len(), 1);
        match &program.items[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name(), "main");
                assert_eq!(def.spec.words, vec!["int".to_string()]);
                assert_eq!(def.declarator.function_params().unwrap().params.len(), 0);
            }
            other => panic!("Expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_expression_precedence() {
        let program = parse("int x = 1 + 2 * 3;");

        let StmtKind::Declaration(decl) = &program.items[0].kind else {
            panic!("Expected declaration");
        };
        let Some(Initializer::Expr(expr)) = &decl.declarators[0].init else {
            panic!("Expected initializer");
        };
        assert!(matches!(
            &expr.kind,
            ExprKind::Binary { op: BinOp::Add, right, .. }
                if matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. })
        ));
    }

    #[test]
    fn test_parse_struct_and_use_as_type() {
        let program = parse("struct Point { int x; int y = 2; }; Point p = {1, 2};");

        assert_eq!(program.items.len(), 2);
        match &program.items[0].kind {
            StmtKind::StructDef(def) => {
                assert_eq!(def.name, "Point");
                assert_eq!(def.members.len(), 2);
                assert!(def.members[1].default.is_some());
            }
            other => panic!("Expected struct definition, got {:?}", other),
        }
        assert!(matches!(program.items[1].kind, StmtKind::Declaration(_)));
    }

    #[test]
    fn test_parse_function_pointer_declarator() {
        let program = parse("int (*fp)(int, double);");

        let StmtKind::Declaration(decl) = &program.items[0].kind else {
            panic!("Expected declaration");
        };
        let declarator = &decl.declarators[0].declarator;
        assert_eq!(declarator.name(), Some("fp"));
        assert!(declarator.function_params().is_none());
        assert!(matches!(declarator.direct.base, DeclaratorBase::Nested(_)));
    }

    #[test]
    fn test_includes_are_carried_into_program() {
        let program = parse("#include <cstdio>\nint main() { return 0; }");
        assert_eq!(program.includes, vec!["cstdio".to_string()]);
    }
}
