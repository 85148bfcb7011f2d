//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Declarations inside blocks: `int x = 42;`
//! - Control flow: `if`, `while`, `for`, range `for`, `do-while`, `switch`
//! - Labels: `case` / `default` (as standalone labels inside a switch body)
//!   and named labels
//! - Jump statements: `return`, `break`, `continue`, `goto`
//! - Compound statements: `{ ... }`
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= declaration | if_stmt | while_stmt | for_stmt | range_for
//!             | do_while_stmt | switch_stmt | "case" expr ":" | "default" ":"
//!             | identifier ":" | return_stmt | break_stmt | continue_stmt
//!             | goto_stmt | compound | expr_stmt
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse `{ statements }`
    pub(crate) fn parse_compound_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();
        self.expect_lbrace("to open block")?;

        let mut statements = Vec::new();
        while !self.check(&Token::RBrace(start)) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        self.expect_rbrace("after block")?;

        Ok(Stmt::new(StmtKind::Compound(statements), self.span_since(start)))
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();

        match self.peek() {
            Token::LBrace(_) => return self.parse_compound_statement(),
            Token::Using(_) | Token::Namespace(_) | Token::Typedef(_) => {
                return self.parse_external_declaration();
            }
            _ => {}
        }

        if self.match_token(&Token::Return(start)) {
            let expr = if self.check(&Token::Semicolon(start)) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.expect_semicolon("after return")?;
            return Ok(Stmt::new(StmtKind::Return(expr), self.span_since(start)));
        }

        if self.match_token(&Token::If(start)) {
            return self.parse_if_statement(start);
        }

        if self.match_token(&Token::While(start)) {
            self.expect_lparen("after 'while'")?;
            let condition = self.parse_expression()?;
            self.expect_rparen("after while condition")?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Stmt::new(
                StmtKind::While { condition, body },
                self.span_since(start),
            ));
        }

        if self.match_token(&Token::Do(start)) {
            let body = Box::new(self.parse_statement()?);
            self.expect_token(&Token::While(start), "Expected 'while' after do body")?;
            self.expect_lparen("after 'while'")?;
            let condition = self.parse_expression()?;
            self.expect_rparen("after do-while condition")?;
            self.expect_semicolon("after do-while")?;
            return Ok(Stmt::new(
                StmtKind::DoWhile { body, condition },
                self.span_since(start),
            ));
        }

        if self.match_token(&Token::For(start)) {
            return self.parse_for_statement(start);
        }

        if self.match_token(&Token::Switch(start)) {
            self.expect_lparen("after 'switch'")?;
            let discriminant = self.parse_expression()?;
            self.expect_rparen("after switch expression")?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Stmt::new(
                StmtKind::Switch { discriminant, body },
                self.span_since(start),
            ));
        }

        if self.match_token(&Token::Case(start)) {
            let value = self.parse_conditional_expression()?;
            self.expect_token(&Token::Colon(start), "Expected ':' after case value")?;
            return Ok(Stmt::new(StmtKind::Case(value), self.span_since(start)));
        }

        if self.match_token(&Token::Default(start)) {
            self.expect_token(&Token::Colon(start), "Expected ':' after 'default'")?;
            return Ok(Stmt::new(StmtKind::Default, self.span_since(start)));
        }

        if self.match_token(&Token::Break(start)) {
            self.expect_semicolon("after 'break'")?;
            return Ok(Stmt::new(StmtKind::Break, self.span_since(start)));
        }

        if self.match_token(&Token::Continue(start)) {
            self.expect_semicolon("after 'continue'")?;
            return Ok(Stmt::new(StmtKind::Continue, self.span_since(start)));
        }

        if self.match_token(&Token::Goto(start)) {
            let label = self.expect_identifier()?;
            self.expect_semicolon("after 'goto'")?;
            return Ok(Stmt::new(StmtKind::Goto(label), self.span_since(start)));
        }

        // Check for label: identifier followed by colon
        if matches!(self.peek(), Token::Ident(..)) && self.check_ahead(1, &Token::Colon(start)) {
            let name = self.expect_identifier()?;
            self.advance();
            return Ok(Stmt::new(StmtKind::Label(name), self.span_since(start)));
        }

        if self.starts_declaration() {
            return self.parse_external_declaration();
        }

        if self.match_token(&Token::Semicolon(start)) {
            return Ok(Stmt::new(StmtKind::Expression(None), self.span_since(start)));
        }

        let expr = self.parse_expression()?;
        self.expect_semicolon("after expression")?;
        Ok(Stmt::new(StmtKind::Expression(Some(expr)), self.span_since(start)))
    }

    /// Parse if statement (keyword consumed)
    fn parse_if_statement(&mut self, start: Span) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&Token::Else(start)) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            self.span_since(start),
        ))
    }

    /// Parse `for (init; cond; step)` or `for (decl : range)` (keyword consumed)
    fn parse_for_statement(&mut self, start: Span) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'for'")?;

        let init = if self.match_token(&Token::Semicolon(start)) {
            None
        } else if self.starts_declaration() {
            let init_start = self.current_span();
            let spec = self.parse_type_spec()?;
            let declarator = self.parse_declarator(false)?;

            if self.match_token(&Token::Colon(start)) {
                let range = self.parse_expression()?;
                self.expect_rparen("after range-for clause")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::new(
                    StmtKind::RangeFor {
                        spec,
                        declarator,
                        range,
                        body,
                    },
                    self.span_since(start),
                ));
            }

            let declaration = self.parse_init_declarators(spec, declarator)?;
            self.expect_semicolon("after for init")?;
            Some(Box::new(Stmt::new(
                StmtKind::Declaration(declaration),
                self.span_since(init_start),
            )))
        } else {
            let init_start = self.current_span();
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for init")?;
            Some(Box::new(Stmt::new(
                StmtKind::Expression(Some(expr)),
                self.span_since(init_start),
            )))
        };

        let condition = if self.check(&Token::Semicolon(start)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon("after for condition")?;

        let step = if self.check(&Token::RParen(start)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_rparen("after for clauses")?;

        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::new(
            StmtKind::For {
                init,
                condition,
                step,
                body,
            },
            self.span_since(start),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of_main(source: &str) -> Vec<Stmt> {
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();
        let StmtKind::FunctionDef(def) = &program.items[0].kind else {
            panic!("Expected function");
        };
        let StmtKind::Compound(stmts) = &def.body.kind else {
            panic!("Expected compound body");
        };
        stmts.clone()
    }

    #[test]
    fn test_switch_labels_are_flat_statements() {
        let stmts = body_of_main(
            "int main() { switch (x) { case 1: y = 1; break; default: y = 2; } }",
        );
        let StmtKind::Switch { body, .. } = &stmts[0].kind else {
            panic!("Expected switch");
        };
        let StmtKind::Compound(inner) = &body.kind else {
            panic!("Expected compound switch body");
        };
        let kinds: Vec<NodeKind> = inner.iter().map(Stmt::node_kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::LabeledStatementCase,
                NodeKind::ExpressionStatement,
                NodeKind::JumpStatementBreak,
                NodeKind::LabeledStatementDefault,
                NodeKind::ExpressionStatement,
            ]
        );
    }

    #[test]
    fn test_range_for() {
        let stmts = body_of_main("int main() { for (auto& v : arr) v = 0; }");
        let StmtKind::RangeFor { spec, declarator, .. } = &stmts[0].kind else {
            panic!("Expected range-for");
        };
        assert!(spec.is_auto());
        assert!(declarator.reference);
    }

    #[test]
    fn test_for_with_declaration() {
        let stmts = body_of_main("int main() { for (int i = 0; i < 3; i++) {} }");
        let StmtKind::For { init, condition, step, .. } = &stmts[0].kind else {
            panic!("Expected for");
        };
        assert!(matches!(init.as_deref().map(|s| &s.kind), Some(StmtKind::Declaration(_))));
        assert!(condition.is_some());
        assert!(step.is_some());
    }

    #[test]
    fn test_statement_spans_cover_source() {
        let source = "int main() {\n  int a = 5;\n}";
        let stmts = body_of_main(source);
        let span = stmts[0].span;
        assert_eq!(span.line, 2);
        let text: String = source.chars().skip(span.start).take(span.end - span.start).collect();
        assert_eq!(text, "int a = 5;");
    }
}
