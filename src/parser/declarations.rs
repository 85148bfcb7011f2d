//! Declaration parsing implementation
//!
//! This module handles parsing of declarations:
//!
//! - Variable declarations and prototypes: `const int a = 1, *p, f(int);`
//! - Function definitions: `type name(params) { ... }`
//! - Struct definitions with member defaults and methods
//! - `typedef`, `using namespace`, namespace aliases
//! - Declarators: pointers, references, arrays, parameter lists and
//!   parenthesized declarators such as `int (*fp)(int)`
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= type_spec init_declarator ("," init_declarator)* ";"
//! function_def ::= type_spec declarator compound_statement
//! struct_def   ::= "struct" identifier "{" (member | method)* "}" ";"
//! type_spec    ::= (specifier | type_word+ | "struct"? type_name)+
//! declarator   ::= ("*" "const"?)* "&"? direct_declarator
//! direct_declarator ::= (identifier | "(" declarator ")") suffix*
//! suffix       ::= "[" expression? "]" | "(" param_list ")"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse anything that may appear at namespace scope.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();

        if self.match_token(&Token::Using(start)) {
            return self.parse_using(start);
        }

        if self.match_token(&Token::Namespace(start)) {
            return self.parse_namespace(start);
        }

        if self.match_token(&Token::Typedef(start)) {
            return self.parse_typedef(start);
        }

        if self.check(&Token::Struct(start))
            && matches!(self.peek_ahead(1), Some(Token::Ident(..)))
            && self.check_ahead(2, &Token::LBrace(start))
        {
            self.advance();
            return self.parse_struct_definition(start);
        }

        let spec = self.parse_type_spec()?;
        if self.match_token(&Token::Semicolon(start)) {
            // Bare `struct Name;` forward declaration
            return Ok(Stmt::new(
                StmtKind::Declaration(Declaration {
                    spec,
                    declarators: Vec::new(),
                }),
                self.span_since(start),
            ));
        }

        let declarator = self.parse_declarator(false)?;
        if declarator.function_params().is_some() && self.check(&Token::LBrace(start)) {
            let body = self.parse_compound_statement()?;
            return Ok(Stmt::new(
                StmtKind::FunctionDef(FunctionDef {
                    spec,
                    declarator,
                    body: Box::new(body),
                }),
                self.span_since(start),
            ));
        }

        let declaration = self.parse_init_declarators(spec, declarator)?;
        self.expect_semicolon("after declaration")?;
        Ok(Stmt::new(StmtKind::Declaration(declaration), self.span_since(start)))
    }

    /// Parse the rest of a declaration once its first declarator is known.
    pub(crate) fn parse_init_declarators(
        &mut self,
        spec: TypeSpec,
        first: Declarator,
    ) -> Result<Declaration, ParseError> {
        let mut declarators = Vec::new();
        let mut declarator = first;
        loop {
            let init = if self.match_token(&Token::Eq(Span::default())) {
                Some(self.parse_initializer()?)
            } else {
                None
            };
            declarators.push(InitDeclarator { declarator, init });

            if !self.match_token(&Token::Comma(Span::default())) {
                break;
            }
            declarator = self.parse_declarator(false)?;
        }
        Ok(Declaration { spec, declarators })
    }

    /// Parse `= expr` or `= { ... }` (the `=` is already consumed).
    pub(crate) fn parse_initializer(&mut self) -> Result<Initializer, ParseError> {
        let start = self.current_span();
        if self.match_token(&Token::LBrace(start)) {
            let mut items = Vec::new();
            while !self.check(&Token::RBrace(start)) {
                items.push(self.parse_initializer()?);
                if !self.match_token(&Token::Comma(start)) {
                    break;
                }
            }
            self.expect_rbrace("after initializer list")?;
            return Ok(Initializer::List(items, self.span_since(start)));
        }
        Ok(Initializer::Expr(self.parse_assignment_expression()?))
    }

    /// Parse declaration specifiers and the base type words.
    pub(crate) fn parse_type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        let start = self.current_span();
        let mut specifiers = Vec::new();
        let mut words: Vec<String> = Vec::new();

        loop {
            match self.peek().clone() {
                Token::Specifier(word, _) => {
                    self.advance();
                    specifiers.push(word);
                }
                Token::TypeWord(word, _) => {
                    self.advance();
                    words.push(word);
                }
                Token::Struct(_) if words.is_empty() => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    words.push(name);
                }
                Token::Ident(name, _) if words.is_empty() && self.type_names.contains(&name) => {
                    self.advance();
                    words.push(name);
                }
                _ => break,
            }
        }

        if words.is_empty() {
            return self.error(format!("Expected type name, found {}", self.peek()));
        }

        Ok(TypeSpec {
            specifiers,
            words,
            span: self.span_since(start),
        })
    }

    /// Parse a declarator. Abstract declarators (no name) are allowed for
    /// parameters, casts and `sizeof`.
    pub(crate) fn parse_declarator(&mut self, allow_abstract: bool) -> Result<Declarator, ParseError> {
        let start = self.current_span();
        let mut pointers = Vec::new();
        while self.match_token(&Token::Star(start)) {
            let mut is_const = false;
            while let Token::Specifier(word, _) = self.peek() {
                is_const |= word == "const";
                self.advance();
            }
            pointers.push(PointerLevel { is_const });
        }
        let reference = self.match_token(&Token::Amp(start));

        let base = match self.peek().clone() {
            Token::Ident(name, _) => {
                self.advance();
                DeclaratorBase::Name(name)
            }
            Token::LParen(_)
                if matches!(
                    self.peek_ahead(1),
                    Some(Token::Star(_) | Token::Amp(_) | Token::Ident(..))
                ) && (self.check_ahead(1, &Token::Star(start))
                    || self.check_ahead(1, &Token::Amp(start))
                    || self.check_ahead(2, &Token::RParen(start))) =>
            {
                self.advance();
                let inner = self.parse_declarator(allow_abstract)?;
                self.expect_rparen("after nested declarator")?;
                DeclaratorBase::Nested(Box::new(inner))
            }
            _ if allow_abstract => DeclaratorBase::Abstract,
            other => return self.error(format!("Expected declarator, found {}", other)),
        };

        let mut suffixes = Vec::new();
        loop {
            if self.match_token(&Token::LBracket(start)) {
                if self.match_token(&Token::RBracket(start)) {
                    suffixes.push(DeclaratorSuffix::Array(None));
                } else {
                    let size = self.parse_expression()?;
                    self.expect_token(&Token::RBracket(start), "Expected ']' after array size")?;
                    suffixes.push(DeclaratorSuffix::Array(Some(Box::new(size))));
                }
            } else if !matches!(base, DeclaratorBase::Abstract) && self.check(&Token::LParen(start)) {
                self.advance();
                suffixes.push(DeclaratorSuffix::Params(self.parse_param_list()?));
            } else {
                break;
            }
        }

        Ok(Declarator {
            pointers,
            reference,
            direct: DirectDeclarator { base, suffixes },
            span: self.span_since(start),
        })
    }

    /// Parse a parameter list (the `(` is already consumed).
    fn parse_param_list(&mut self) -> Result<ParamList, ParseError> {
        let mut params = Vec::new();
        let mut variadic = false;

        // `f(void)` declares no parameters
        if matches!(self.peek(), Token::TypeWord(w, _) if w == "void")
            && self.check_ahead(1, &Token::RParen(Span::default()))
        {
            self.advance();
        }

        while !self.check(&Token::RParen(Span::default())) {
            if self.match_token(&Token::Ellipsis(Span::default())) {
                variadic = true;
                break;
            }
            let start = self.current_span();
            let spec = self.parse_type_spec()?;
            let declarator = self.parse_declarator(true)?;
            let default = if self.match_token(&Token::Eq(start)) {
                Some(Box::new(self.parse_assignment_expression()?))
            } else {
                None
            };
            params.push(ParamDecl {
                spec,
                declarator,
                default,
                span: self.span_since(start),
            });
            if !self.match_token(&Token::Comma(start)) {
                break;
            }
        }
        self.expect_rparen("after parameter list")?;

        Ok(ParamList { params, variadic })
    }

    /// Parse a type in expression position: `unsigned int*`, `Point`
    pub(crate) fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let spec = self.parse_type_spec()?;
        let declarator = self.parse_declarator(true)?;
        Ok(TypeName { spec, declarator })
    }

    /// Parse struct definition (the `struct` keyword is already consumed)
    pub(crate) fn parse_struct_definition(&mut self, start: Span) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        self.type_names.insert(name.clone());
        self.expect_lbrace("after struct name")?;

        let mut members = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&Token::RBrace(start)) && !self.is_at_end() {
            // Access specifiers carry no meaning here
            if matches!(self.peek(), Token::Ident(w, _) if w == "public" || w == "private" || w == "protected")
                && self.check_ahead(1, &Token::Colon(start))
            {
                self.advance();
                self.advance();
                continue;
            }

            let spec = self.parse_type_spec()?;
            let declarator = self.parse_declarator(false)?;
            if declarator.function_params().is_some() && self.check(&Token::LBrace(start)) {
                let body = self.parse_compound_statement()?;
                methods.push(FunctionDef {
                    spec,
                    declarator,
                    body: Box::new(body),
                });
                continue;
            }

            let declaration = self.parse_init_declarators(spec, declarator)?;
            self.expect_semicolon("after struct member")?;
            for item in declaration.declarators {
                members.push(MemberDecl {
                    spec: declaration.spec.clone(),
                    declarator: item.declarator,
                    default: item.init,
                });
            }
        }
        self.expect_rbrace("after struct body")?;
        self.expect_semicolon("after struct definition")?;

        Ok(Stmt::new(
            StmtKind::StructDef(StructDef {
                name,
                members,
                methods,
            }),
            self.span_since(start),
        ))
    }

    /// `typedef <spec> <declarators>;` (keyword consumed)
    fn parse_typedef(&mut self, start: Span) -> Result<Stmt, ParseError> {
        let spec = self.parse_type_spec()?;
        let first = self.parse_declarator(false)?;
        let declaration = self.parse_init_declarators(spec, first)?;
        self.expect_semicolon("after typedef")?;
        for item in &declaration.declarators {
            if let Some(name) = item.declarator.name() {
                self.type_names.insert(name.to_string());
            }
        }
        Ok(Stmt::new(StmtKind::Typedef(declaration), self.span_since(start)))
    }

    /// `using namespace a::b;` or `using a::b;` (keyword consumed)
    fn parse_using(&mut self, start: Span) -> Result<Stmt, ParseError> {
        let kind = if self.match_token(&Token::Namespace(start)) {
            StmtKind::UsingDirective(self.parse_qualified_name()?)
        } else {
            StmtKind::UsingDeclaration(self.parse_qualified_name()?)
        };
        self.expect_semicolon("after using")?;
        Ok(Stmt::new(kind, self.span_since(start)))
    }

    /// `namespace a = b;` or `namespace a { ... }` (keyword consumed)
    fn parse_namespace(&mut self, start: Span) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        if self.match_token(&Token::Eq(start)) {
            let target = self.parse_qualified_name()?;
            self.expect_semicolon("after namespace alias")?;
            return Ok(Stmt::new(
                StmtKind::NamespaceAlias { alias: name, target },
                self.span_since(start),
            ));
        }

        self.expect_lbrace("after namespace name")?;
        while !self.check(&Token::RBrace(start)) && !self.is_at_end() {
            self.parse_external_declaration()?;
        }
        self.expect_rbrace("after namespace body")?;
        Ok(Stmt::new(StmtKind::NamespaceDef(name), self.span_since(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_item(source: &str) -> Stmt {
        let mut parser = Parser::new(source).unwrap();
        parser.parse_program().unwrap().items.remove(0)
    }

    #[test]
    fn test_parse_multi_word_type_and_specifiers() {
        let stmt = first_item("static const unsigned long long big = 1;");
        let StmtKind::Declaration(decl) = stmt.kind else {
            panic!("Expected declaration");
        };
        assert_eq!(decl.spec.specifiers, vec!["static", "const"]);
        assert_eq!(decl.spec.words, vec!["unsigned", "long", "long"]);
    }

    #[test]
    fn test_parse_default_arguments() {
        let stmt = first_item("int f(int a, int b = 2);");
        let StmtKind::Declaration(decl) = stmt.kind else {
            panic!("Expected declaration");
        };
        let params = decl.declarators[0].declarator.function_params().unwrap();
        assert!(params.params[0].default.is_none());
        assert!(params.params[1].default.is_some());
    }

    #[test]
    fn test_parse_typedef_registers_type_name() {
        let mut parser = Parser::new("typedef unsigned int uint; uint x = 3;").unwrap();
        let program = parser.parse_program().unwrap();
        assert!(matches!(program.items[0].kind, StmtKind::Typedef(_)));
        assert!(matches!(program.items[1].kind, StmtKind::Declaration(_)));
    }

    #[test]
    fn test_parse_multidimensional_array() {
        let stmt = first_item("int grid[][3] = {{1, 2, 3}, {4, 5, 6}};");
        let StmtKind::Declaration(decl) = stmt.kind else {
            panic!("Expected declaration");
        };
        let suffixes = &decl.declarators[0].declarator.direct.suffixes;
        assert!(matches!(suffixes[0], DeclaratorSuffix::Array(None)));
        assert!(matches!(suffixes[1], DeclaratorSuffix::Array(Some(_))));
        assert!(matches!(decl.declarators[0].init, Some(Initializer::List(ref items, _)) if items.len() == 2));
    }

    #[test]
    fn test_parse_struct_method() {
        let stmt = first_item("struct Counter { int n; int next() { return this->n + 1; } };");
        let StmtKind::StructDef(def) = stmt.kind else {
            panic!("Expected struct");
        };
        assert_eq!(def.members.len(), 1);
        assert_eq!(def.methods.len(), 1);
        assert_eq!(def.methods[0].name(), "next");
    }
}
