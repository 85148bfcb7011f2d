//! Expression parsing implementation
//!
//! This module handles parsing of expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, strings, `true`/`false`, `nullptr`
//! - Identifiers and qualified names (`std::printf`)
//! - Binary operators: arithmetic, comparison, logical, bitwise, comma
//! - Assignment and compound assignment (`+=`, `<<=`, ...)
//! - Unary operators: `-`, `+`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Ternary: `? :`
//! - Type casts: `(type)expr`, `static_cast<type>(expr)`
//! - `sizeof` operator
//! - Brace lists in expression position: `p = {1, 2}`
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let mut expr = self.parse_assignment_expression()?;
        while self.match_token(&Token::Comma(start)) {
            let right = self.parse_assignment_expression()?;
            expr = Expr::new(
                ExprKind::Comma(Box::new(expr), Box::new(right)),
                self.span_since(start),
            );
        }
        Ok(expr)
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let target = self.parse_conditional_expression()?;

        let op = match self.peek() {
            Token::Eq(_) => None,
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::PercentEq(_) => Some(BinOp::Mod),
            Token::AmpEq(_) => Some(BinOp::BitAnd),
            Token::PipeEq(_) => Some(BinOp::BitOr),
            Token::CaretEq(_) => Some(BinOp::BitXor),
            Token::LtLtEq(_) => Some(BinOp::Shl),
            Token::GtGtEq(_) => Some(BinOp::Shr),
            _ => return Ok(target),
        };
        self.advance();

        let value = if self.check(&Token::LBrace(start)) {
            let list_start = self.current_span();
            match self.parse_initializer()? {
                Initializer::List(items, _) => {
                    Expr::new(ExprKind::InitList(items), self.span_since(list_start))
                }
                Initializer::Expr(expr) => expr,
            }
        } else {
            self.parse_assignment_expression()?
        };

        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            self.span_since(start),
        ))
    }

    /// Parse ternary: condition ? then_expr : else_expr
    pub(crate) fn parse_conditional_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let condition = self.parse_logical(LogicalOp::Or)?;

        if self.match_token(&Token::Question(start)) {
            let then_expr = self.parse_expression()?;
            self.expect_token(&Token::Colon(start), "Expected ':' in ternary expression")?;
            let else_expr = self.parse_assignment_expression()?;

            return Ok(Expr::new(
                ExprKind::Conditional {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                self.span_since(start),
            ));
        }

        Ok(condition)
    }

    /// Parse `||` / `&&` chains
    fn parse_logical(&mut self, op: LogicalOp) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let (token, next) = match op {
            LogicalOp::Or => (Token::OrOr(start), Some(LogicalOp::And)),
            LogicalOp::And => (Token::AndAnd(start), None),
        };
        let operand = |parser: &mut Parser| match next {
            Some(next) => parser.parse_logical(next),
            None => parser.parse_binary(0),
        };

        let mut left = operand(self)?;
        while self.match_token(&token) {
            let right = operand(self)?;
            left = Expr::new(
                ExprKind::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.span_since(start),
            );
        }
        Ok(left)
    }

    /// Binary operator for the current token with its precedence level
    /// (higher binds tighter).
    fn binary_operator(&self) -> Option<(BinOp, u8)> {
        let op = match self.peek() {
            Token::Pipe(_) => (BinOp::BitOr, 0),
            Token::Caret(_) => (BinOp::BitXor, 1),
            Token::Amp(_) => (BinOp::BitAnd, 2),
            Token::EqEq(_) => (BinOp::Eq, 3),
            Token::NotEq(_) => (BinOp::Ne, 3),
            Token::Lt(_) => (BinOp::Lt, 4),
            Token::Le(_) => (BinOp::Le, 4),
            Token::Gt(_) => (BinOp::Gt, 4),
            Token::Ge(_) => (BinOp::Ge, 4),
            Token::LtLt(_) => (BinOp::Shl, 5),
            Token::GtGt(_) => (BinOp::Shr, 5),
            Token::Plus(_) => (BinOp::Add, 6),
            Token::Minus(_) => (BinOp::Sub, 6),
            Token::Star(_) => (BinOp::Mul, 7),
            Token::Slash(_) => (BinOp::Div, 7),
            Token::Percent(_) => (BinOp::Mod, 7),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over the left-associative binary operators
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let mut left = self.parse_unary()?;

        while let Some((op, precedence)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.span_since(start),
            );
        }

        Ok(left)
    }

    /// True if the token after `(` begins a type (cast or `sizeof(type)`).
    fn paren_starts_type(&self) -> bool {
        match self.peek_ahead(1) {
            Some(Token::TypeWord(..) | Token::Specifier(..) | Token::Struct(_)) => true,
            Some(Token::Ident(name, _)) => {
                self.type_names.contains(name)
                    && matches!(
                        self.peek_ahead(2),
                        Some(Token::RParen(_) | Token::Star(_) | Token::Amp(_) | Token::LBracket(_))
                    )
            }
            _ => false,
        }
    }

    /// Parse unary and cast expressions
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();

        let op = match self.peek() {
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Plus(_) => Some(UnOp::Plus),
            Token::Bang(_) => Some(UnOp::Not),
            Token::Tilde(_) => Some(UnOp::BitNot),
            Token::Star(_) => Some(UnOp::Deref),
            Token::Amp(_) => Some(UnOp::AddrOf),
            Token::PlusPlus(_) => Some(UnOp::PreInc),
            Token::MinusMinus(_) => Some(UnOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                self.span_since(start),
            ));
        }

        if self.check(&Token::LParen(start)) && self.paren_starts_type() {
            self.advance();
            let target = self.parse_type_name()?;
            self.expect_rparen("after cast type")?;
            let expr = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Cast {
                    target,
                    expr: Box::new(expr),
                },
                self.span_since(start),
            ));
        }

        if self.match_token(&Token::Sizeof(start)) {
            if self.check(&Token::LParen(start)) && self.paren_starts_type() {
                self.advance();
                let target = self.parse_type_name()?;
                self.expect_rparen("after sizeof type")?;
                return Ok(Expr::new(ExprKind::SizeofType(target), self.span_since(start)));
            }
            let expr = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::SizeofExpr(Box::new(expr)),
                self.span_since(start),
            ));
        }

        self.parse_postfix()
    }

    /// Parse postfix operators: `[]`, `()`, `.`, `->`, `++`, `--`
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(&Token::LBracket(start)) {
                let index = self.parse_expression()?;
                self.expect_token(&Token::RBracket(start), "Expected ']' after index")?;
                expr = Expr::new(
                    ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    self.span_since(start),
                );
            } else if self.match_token(&Token::LParen(start)) {
                let mut args = Vec::new();
                while !self.check(&Token::RParen(start)) {
                    args.push(self.parse_assignment_expression()?);
                    if !self.match_token(&Token::Comma(start)) {
                        break;
                    }
                }
                self.expect_rparen("after call arguments")?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        template_args: Vec::new(),
                        args,
                    },
                    self.span_since(start),
                );
            } else if self.check(&Token::Dot(start)) || self.check(&Token::Arrow(start)) {
                let through_pointer = self.check(&Token::Arrow(start));
                self.advance();
                let member = self.expect_identifier()?;
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        member,
                        through_pointer,
                    },
                    self.span_since(start),
                );
            } else if self.check(&Token::PlusPlus(start)) || self.check(&Token::MinusMinus(start)) {
                let op = if self.check(&Token::PlusPlus(start)) {
                    UnOp::PostInc
                } else {
                    UnOp::PostDec
                };
                self.advance();
                expr = Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(expr),
                    },
                    self.span_since(start),
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse primary expressions
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();

        let literal = match self.peek().clone() {
            Token::IntLiteral {
                value,
                radix,
                unsigned,
                long,
                ..
            } => Some(Literal::Int {
                value,
                radix,
                unsigned,
                long,
            }),
            Token::FloatLiteral(value, single, _) => Some(Literal::Float { value, single }),
            Token::CharLiteral(value, width, _) => Some(Literal::Char(value, width)),
            Token::True(_) => Some(Literal::Bool(true)),
            Token::False(_) => Some(Literal::Bool(false)),
            Token::Null(_) => Some(Literal::Null),
            Token::StringLiteral(mut text, width, _) => {
                // Adjacent literals concatenate
                while let Some(Token::StringLiteral(more, _, _)) = self.peek_ahead(1) {
                    text.push_str(more);
                    self.advance();
                }
                Some(Literal::String(text, width))
            }
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::new(ExprKind::Literal(literal), self.span_since(start)));
        }

        match self.peek().clone() {
            Token::Ident(..) => {
                let mut parts = self.parse_qualified_name()?;
                let kind = if parts.len() == 1 {
                    ExprKind::Identifier(parts.remove(0))
                } else {
                    ExprKind::Qualified(parts)
                };
                Ok(Expr::new(kind, self.span_since(start)))
            }
            Token::ColonColon(_) => {
                self.advance();
                let parts = self.parse_qualified_name()?;
                Ok(Expr::new(ExprKind::Qualified(parts), self.span_since(start)))
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            Token::LBrace(_) => match self.parse_initializer()? {
                Initializer::List(items, span) => Ok(Expr::new(ExprKind::InitList(items), span)),
                Initializer::Expr(expr) => Ok(expr),
            },
            Token::StaticCast(_) => {
                self.advance();
                self.expect_token(&Token::Lt(start), "Expected '<' after 'static_cast'")?;
                let target = self.parse_type_name()?;
                self.expect_token(&Token::Gt(start), "Expected '>' after cast type")?;
                self.expect_lparen("after static_cast type")?;
                let expr = self.parse_expression()?;
                self.expect_rparen("after static_cast operand")?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        target,
                        expr: Box::new(expr),
                    },
                    self.span_since(start),
                ))
            }
            other => self.error(format!("Expected expression, found {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        let mut parser = Parser::new(source).unwrap();
        parser.parse_expression().unwrap()
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let e = expr("a = b += 2");
        let ExprKind::Assign { op: None, value, .. } = e.kind else {
            panic!("Expected assignment");
        };
        assert!(matches!(value.kind, ExprKind::Assign { op: Some(BinOp::Add), .. }));
    }

    #[test]
    fn test_shift_binds_tighter_than_comparison() {
        let e = expr("1 << 2 < 3");
        let ExprKind::Binary { op: BinOp::Lt, left, .. } = e.kind else {
            panic!("Expected comparison at the root");
        };
        assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Shl, .. }));
    }

    #[test]
    fn test_postfix_and_prefix_increment() {
        let e = expr("a++ + ++b");
        let ExprKind::Binary { left, right, .. } = e.kind else {
            panic!("Expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Unary { op: UnOp::PostInc, .. }));
        assert!(matches!(right.kind, ExprKind::Unary { op: UnOp::PreInc, .. }));
    }

    #[test]
    fn test_casts() {
        assert!(matches!(expr("(double)x").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("static_cast<int>(3.5)").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("(x)").kind, ExprKind::Identifier(_)));
        assert!(matches!(expr("sizeof(int)").kind, ExprKind::SizeofType(_)));
        assert!(matches!(expr("sizeof x").kind, ExprKind::SizeofExpr(_)));
    }

    #[test]
    fn test_member_and_call_chain() {
        let e = expr("p->next.value(1, 2)[0]");
        let ExprKind::Index { base, .. } = e.kind else {
            panic!("Expected index");
        };
        let ExprKind::Call { callee, args, .. } = base.kind else {
            panic!("Expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(callee.kind, ExprKind::Member { through_pointer: false, .. }));
    }

    #[test]
    fn test_qualified_name_and_string_concatenation() {
        assert!(matches!(expr("std::puts").kind, ExprKind::Qualified(ref p) if p.len() == 2));
        assert!(matches!(
            expr(r#""ab" "cd""#).kind,
            ExprKind::Literal(Literal::String(ref s, _)) if s == "abcd"
        ));
    }
}
