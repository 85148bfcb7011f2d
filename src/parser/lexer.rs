//! Lexer (tokenizer) for C++ source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! `#include` directives are recorded so the interpreter can load the matching
//! library modules; every other preprocessor directive is skipped.

use super::ast::{CharWidth, Span};
use std::fmt;
use thiserror::Error;

/// Built-in type words. Several may combine (`unsigned long long`).
pub const TYPE_WORDS: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char16_t", "char32_t", "short", "int",
    "long", "signed", "unsigned", "float", "double", "auto",
];

/// Declaration specifiers accepted before a type.
pub const SPECIFIER_WORDS: &[&str] =
    &["const", "inline", "_stdcall", "extern", "static", "register"];

/// All token variants produced by the lexer.
///
/// Every variant carries a [`Span`] so that parse errors and the stepping
/// cursor can report accurate positions without a separate token→span table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral {
        value: u128,
        radix: u32,
        unsigned: bool,
        long: bool,
        span: Span,
    },
    FloatLiteral(f64, bool, Span),
    CharLiteral(u32, CharWidth, Span),
    StringLiteral(String, CharWidth, Span),

    // Identifiers
    Ident(String, Span),
    TypeWord(String, Span),
    Specifier(String, Span),

    // Keywords
    Struct(Span),
    Typedef(Span),
    Namespace(Span),
    Using(Span),
    If(Span),
    Else(Span),
    While(Span),
    Do(Span),
    For(Span),
    Switch(Span),
    Case(Span),
    Default(Span),
    Break(Span),
    Continue(Span),
    Return(Span),
    Goto(Span),
    Sizeof(Span),
    StaticCast(Span),
    True(Span),
    False(Span),
    Null(Span),

    // Arithmetic
    Plus(Span),    // +
    Minus(Span),   // -
    Star(Span),    // *
    Slash(Span),   // /
    Percent(Span), // %

    // Comparison
    EqEq(Span),  // ==
    NotEq(Span), // !=
    Lt(Span),    // <
    Le(Span),    // <=
    Gt(Span),    // >
    Ge(Span),    // >=

    // Logical
    AndAnd(Span), // &&
    OrOr(Span),   // ||
    Bang(Span),   // !

    // Bitwise
    Amp(Span),   // &
    Pipe(Span),  // |
    Caret(Span), // ^
    Tilde(Span), // ~
    LtLt(Span),  // <<
    GtGt(Span),  // >>

    // Assignment
    Eq(Span),        // =
    PlusEq(Span),    // +=
    MinusEq(Span),   // -=
    StarEq(Span),    // *=
    SlashEq(Span),   // /=
    PercentEq(Span), // %=
    AmpEq(Span),     // &=
    PipeEq(Span),    // |=
    CaretEq(Span),   // ^=
    LtLtEq(Span),    // <<=
    GtGtEq(Span),    // >>=

    // Increment/Decrement
    PlusPlus(Span),   // ++
    MinusMinus(Span), // --

    // Member access
    Dot(Span),   // .
    Arrow(Span), // ->

    // Ternary
    Question(Span), // ?
    Colon(Span),    // :

    // Punctuation
    ColonColon(Span), // ::
    Ellipsis(Span),   // ...
    LParen(Span),     // (
    RParen(Span),     // )
    LBrace(Span),     // {
    RBrace(Span),     // }
    LBracket(Span),   // [
    RBracket(Span),   // ]
    Semicolon(Span),  // ;
    Comma(Span),      // ,

    // End of file
    Eof(Span),
}

impl Token {
    /// Returns the source span of this token.
    pub fn span(&self) -> Span {
        match self {
            Token::IntLiteral { span, .. } => *span,
            Token::FloatLiteral(_, _, span)
            | Token::CharLiteral(_, _, span)
            | Token::StringLiteral(_, _, span) => *span,
            Token::Ident(_, span)
            | Token::TypeWord(_, span)
            | Token::Specifier(_, span) => *span,
            Token::Struct(span)
            | Token::Typedef(span)
            | Token::Namespace(span)
            | Token::Using(span)
            | Token::If(span)
            | Token::Else(span)
            | Token::While(span)
            | Token::Do(span)
            | Token::For(span)
            | Token::Switch(span)
            | Token::Case(span)
            | Token::Default(span)
            | Token::Break(span)
            | Token::Continue(span)
            | Token::Return(span)
            | Token::Goto(span)
            | Token::Sizeof(span)
            | Token::StaticCast(span)
            | Token::True(span)
            | Token::False(span)
            | Token::Null(span)
            | Token::Plus(span)
            | Token::Minus(span)
            | Token::Star(span)
            | Token::Slash(span)
            | Token::Percent(span)
            | Token::EqEq(span)
            | Token::NotEq(span)
            | Token::Lt(span)
            | Token::Le(span)
            | Token::Gt(span)
            | Token::Ge(span)
            | Token::AndAnd(span)
            | Token::OrOr(span)
            | Token::Bang(span)
            | Token::Amp(span)
            | Token::Pipe(span)
            | Token::Caret(span)
            | Token::Tilde(span)
            | Token::LtLt(span)
            | Token::GtGt(span)
            | Token::Eq(span)
            | Token::PlusEq(span)
            | Token::MinusEq(span)
            | Token::StarEq(span)
            | Token::SlashEq(span)
            | Token::PercentEq(span)
            | Token::AmpEq(span)
            | Token::PipeEq(span)
            | Token::CaretEq(span)
            | Token::LtLtEq(span)
            | Token::GtGtEq(span)
            | Token::PlusPlus(span)
            | Token::MinusMinus(span)
            | Token::Dot(span)
            | Token::Arrow(span)
            | Token::Question(span)
            | Token::Colon(span)
            | Token::ColonColon(span)
            | Token::Ellipsis(span)
            | Token::LParen(span)
            | Token::RParen(span)
            | Token::LBrace(span)
            | Token::RBrace(span)
            | Token::LBracket(span)
            | Token::RBracket(span)
            | Token::Semicolon(span)
            | Token::Comma(span)
            | Token::Eof(span) => *span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral { value, .. } => write!(f, "int literal {}", value),
            Token::FloatLiteral(v, _, _) => write!(f, "float literal {}", v),
            Token::CharLiteral(c, _, _) => match char::from_u32(*c) {
                Some(ch) if ch.is_ascii_graphic() || ch == ' ' => {
                    write!(f, "char literal '{}'", ch)
                }
                _ => write!(f, "char literal '\\x{:02x}'", c),
            },
            Token::StringLiteral(s, _, _) => write!(f, "string literal \"{}\"", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::TypeWord(s, _) | Token::Specifier(s, _) => write!(f, "'{}'", s),
            Token::Struct(_) => write!(f, "'struct'"),
            Token::Typedef(_) => write!(f, "'typedef'"),
            Token::Namespace(_) => write!(f, "'namespace'"),
            Token::Using(_) => write!(f, "'using'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::Do(_) => write!(f, "'do'"),
            Token::For(_) => write!(f, "'for'"),
            Token::Switch(_) => write!(f, "'switch'"),
            Token::Case(_) => write!(f, "'case'"),
            Token::Default(_) => write!(f, "'default'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::Goto(_) => write!(f, "'goto'"),
            Token::Sizeof(_) => write!(f, "'sizeof'"),
            Token::StaticCast(_) => write!(f, "'static_cast'"),
            Token::True(_) => write!(f, "'true'"),
            Token::False(_) => write!(f, "'false'"),
            Token::Null(_) => write!(f, "'nullptr'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::AndAnd(_) => write!(f, "'&&'"),
            Token::OrOr(_) => write!(f, "'||'"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::Amp(_) => write!(f, "'&'"),
            Token::Pipe(_) => write!(f, "'|'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::Tilde(_) => write!(f, "'~'"),
            Token::LtLt(_) => write!(f, "'<<'"),
            Token::GtGt(_) => write!(f, "'>>'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::AmpEq(_) => write!(f, "'&='"),
            Token::PipeEq(_) => write!(f, "'|='"),
            Token::CaretEq(_) => write!(f, "'^='"),
            Token::LtLtEq(_) => write!(f, "'<<='"),
            Token::GtGtEq(_) => write!(f, "'>>='"),
            Token::PlusPlus(_) => write!(f, "'++'"),
            Token::MinusMinus(_) => write!(f, "'--'"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Arrow(_) => write!(f, "'->'"),
            Token::Question(_) => write!(f, "'?'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::ColonColon(_) => write!(f, "'::'"),
            Token::Ellipsis(_) => write!(f, "'...'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("Lexer error at line {}, column {}: {message}", .span.line, .span.column)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Position marker taken at the start of a token.
#[derive(Debug, Clone, Copy)]
struct Mark {
    position: usize,
    line: usize,
    column: usize,
}

/// Lexer for C++ source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    includes: Vec<String>,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            includes: Vec::new(),
        }
    }

    /// Library names collected from `#include` directives so far.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                let mark = self.mark();
                tokens.push(Token::Eof(self.span_from(mark)));
                break;
            }

            if self.peek() == Some('#') {
                self.preprocessor_directive();
                continue;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let mark = self.mark();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            span: self.span_from(mark),
        })?;

        match ch {
            '"' => self.string_literal(mark, CharWidth::Narrow),
            '\'' => self.char_literal(mark, CharWidth::Narrow),
            '0'..='9' => self.number_literal(mark, ch),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(mark, ch)
            }
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(mark, ch),

            '+' => Ok(self.pick(mark, &[('+', Token::PlusPlus), ('=', Token::PlusEq)], Token::Plus)),
            '-' => Ok(self.pick(
                mark,
                &[('-', Token::MinusMinus), ('=', Token::MinusEq), ('>', Token::Arrow)],
                Token::Minus,
            )),
            '*' => Ok(self.pick(mark, &[('=', Token::StarEq)], Token::Star)),
            '/' => Ok(self.pick(mark, &[('=', Token::SlashEq)], Token::Slash)),
            '%' => Ok(self.pick(mark, &[('=', Token::PercentEq)], Token::Percent)),
            '=' => Ok(self.pick(mark, &[('=', Token::EqEq)], Token::Eq)),
            '!' => Ok(self.pick(mark, &[('=', Token::NotEq)], Token::Bang)),
            '^' => Ok(self.pick(mark, &[('=', Token::CaretEq)], Token::Caret)),
            '&' => Ok(self.pick(mark, &[('&', Token::AndAnd), ('=', Token::AmpEq)], Token::Amp)),
            '|' => Ok(self.pick(mark, &[('|', Token::OrOr), ('=', Token::PipeEq)], Token::Pipe)),
            ':' => Ok(self.pick(mark, &[(':', Token::ColonColon)], Token::Colon)),
            '<' => {
                if self.peek() == Some('<') && self.peek_ahead(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::LtLtEq(self.span_from(mark)))
                } else {
                    Ok(self.pick(mark, &[('=', Token::Le), ('<', Token::LtLt)], Token::Lt))
                }
            }
            '>' => {
                if self.peek() == Some('>') && self.peek_ahead(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::GtGtEq(self.span_from(mark)))
                } else {
                    Ok(self.pick(mark, &[('=', Token::Ge), ('>', Token::GtGt)], Token::Gt))
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_ahead(1) == Some('.') {
                    self.advance();
                    self.advance();
                    Ok(Token::Ellipsis(self.span_from(mark)))
                } else {
                    Ok(Token::Dot(self.span_from(mark)))
                }
            }
            '~' => Ok(Token::Tilde(self.span_from(mark))),
            '?' => Ok(Token::Question(self.span_from(mark))),
            '(' => Ok(Token::LParen(self.span_from(mark))),
            ')' => Ok(Token::RParen(self.span_from(mark))),
            '{' => Ok(Token::LBrace(self.span_from(mark))),
            '}' => Ok(Token::RBrace(self.span_from(mark))),
            '[' => Ok(Token::LBracket(self.span_from(mark))),
            ']' => Ok(Token::RBracket(self.span_from(mark))),
            ';' => Ok(Token::Semicolon(self.span_from(mark))),
            ',' => Ok(Token::Comma(self.span_from(mark))),

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", ch),
                span: self.span_from(mark),
            }),
        }
    }

    /// Consume one of the two-character continuations, or fall back to the
    /// single-character token.
    fn pick(
        &mut self,
        mark: Mark,
        continuations: &[(char, fn(Span) -> Token)],
        single: fn(Span) -> Token,
    ) -> Token {
        for (next, make) in continuations {
            if self.peek() == Some(*next) {
                self.advance();
                return make(self.span_from(mark));
            }
        }
        single(self.span_from(mark))
    }

    fn escape_sequence(&mut self) -> Result<u32, LexError> {
        let mark = self.mark();
        let escaped = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in escape sequence".to_string(),
            span: self.span_from(mark),
        })?;

        let value = match escaped {
            'n' => '\n' as u32,
            't' => '\t' as u32,
            'r' => '\r' as u32,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            '\\' => '\\' as u32,
            '\'' => '\'' as u32,
            '"' => '"' as u32,
            '?' => '?' as u32,
            'x' => {
                let mut digits = String::new();
                while let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit()) {
                    digits.push(c);
                    self.advance();
                }
                u32::from_str_radix(&digits, 16).map_err(|_| LexError {
                    message: format!("Invalid hex escape sequence: \\x{}", digits),
                    span: self.span_from(mark),
                })?
            }
            '0'..='7' => {
                let mut digits = String::from(escaped);
                while digits.len() < 3 {
                    match self.peek().filter(|c| ('0'..='7').contains(c)) {
                        Some(c) => {
                            digits.push(c);
                            self.advance();
                        }
                        None => break,
                    }
                }
                u32::from_str_radix(&digits, 8).unwrap_or(0)
            }
            _ => {
                return Err(LexError {
                    message: format!("Unknown escape sequence: \\{}", escaped),
                    span: self.span_from(mark),
                });
            }
        };
        Ok(value)
    }

    /// Parse string literal (the opening quote is already consumed)
    fn string_literal(&mut self, mark: Mark, width: CharWidth) -> Result<Token, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(Token::StringLiteral(string, width, self.span_from(mark)));
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    let code = self.escape_sequence()?;
                    string.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                }
                _ => {
                    string.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            span: self.span_from(mark),
        })
    }

    /// Parse character literal (the opening quote is already consumed)
    fn char_literal(&mut self, mark: Mark, width: CharWidth) -> Result<Token, LexError> {
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in character literal".to_string(),
            span: self.span_from(mark),
        })?;

        let value = if ch == '\\' {
            self.escape_sequence()?
        } else {
            ch as u32
        };

        if self.advance() != Some('\'') {
            return Err(LexError {
                message: "Expected closing quote in character literal".to_string(),
                span: self.span_from(mark),
            });
        }

        Ok(Token::CharLiteral(value, width, self.span_from(mark)))
    }

    /// Parse numeric literal: decimal, hex, octal, binary integers and
    /// decimal floating point, with optional suffixes.
    fn number_literal(&mut self, mark: Mark, first: char) -> Result<Token, LexError> {
        let invalid = |lexer: &Lexer, text: &str| LexError {
            message: format!("Invalid numeric literal: {}", text),
            span: lexer.span_from(mark),
        };

        if first == '0' && matches!(self.peek(), Some('x' | 'X' | 'b' | 'B')) {
            let radix = if matches!(self.peek(), Some('x' | 'X')) { 16 } else { 2 };
            self.advance();
            let digits = self.take_while(|c| c.is_digit(radix) || c == '\'');
            let digits: String = digits.chars().filter(|c| *c != '\'').collect();
            let value = u128::from_str_radix(&digits, radix)
                .map_err(|_| invalid(self, &digits))?;
            let (unsigned, long) = self.integer_suffix();
            return Ok(Token::IntLiteral {
                value,
                radix,
                unsigned,
                long,
                span: self.span_from(mark),
            });
        }

        let mut text = String::from(first);
        text.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '\''));
        let mut is_float = first == '.';
        if self.peek() == Some('.') && !is_float {
            is_float = true;
            self.advance();
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        } else if is_float {
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.advance();
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.advance();
                text.push(sign);
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        let text: String = text.chars().filter(|c| *c != '\'').collect();

        if is_float {
            let value = text.parse::<f64>().map_err(|_| invalid(self, &text))?;
            let single = matches!(self.peek(), Some('f' | 'F'));
            if single || matches!(self.peek(), Some('l' | 'L')) {
                self.advance();
            }
            return Ok(Token::FloatLiteral(value, single, self.span_from(mark)));
        }

        let (radix, digits) = if text.len() > 1 && text.starts_with('0') {
            (8, &text[1..])
        } else {
            (10, text.as_str())
        };
        let value = u128::from_str_radix(digits, radix).map_err(|_| invalid(self, &text))?;
        let (unsigned, long) = self.integer_suffix();
        Ok(Token::IntLiteral {
            value,
            radix,
            unsigned,
            long,
            span: self.span_from(mark),
        })
    }

    fn integer_suffix(&mut self) -> (bool, bool) {
        let mut unsigned = false;
        let mut long = false;
        while let Some(c) = self.peek() {
            match c {
                'u' | 'U' => unsigned = true,
                'l' | 'L' => long = true,
                _ => break,
            }
            self.advance();
        }
        (unsigned, long)
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, mark: Mark, first_char: char) -> Result<Token, LexError> {
        let mut ident = String::from(first_char);
        ident.push_str(&self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'));

        // Encoding prefixes on string and character literals
        let width = match ident.as_str() {
            "L" => Some(CharWidth::Wide),
            "u" => Some(CharWidth::Utf16),
            "U" => Some(CharWidth::Utf32),
            "u8" => Some(CharWidth::Narrow),
            _ => None,
        };
        if let Some(width) = width {
            if self.peek() == Some('"') {
                self.advance();
                return self.string_literal(mark, width);
            }
            if self.peek() == Some('\'') {
                self.advance();
                return self.char_literal(mark, width);
            }
        }

        let span = self.span_from(mark);
        let token = match ident.as_str() {
            "struct" | "class" => Token::Struct(span),
            "typedef" => Token::Typedef(span),
            "namespace" => Token::Namespace(span),
            "using" => Token::Using(span),
            "if" => Token::If(span),
            "else" => Token::Else(span),
            "while" => Token::While(span),
            "do" => Token::Do(span),
            "for" => Token::For(span),
            "switch" => Token::Switch(span),
            "case" => Token::Case(span),
            "default" => Token::Default(span),
            "break" => Token::Break(span),
            "continue" => Token::Continue(span),
            "return" => Token::Return(span),
            "goto" => Token::Goto(span),
            "sizeof" => Token::Sizeof(span),
            "static_cast" => Token::StaticCast(span),
            "true" => Token::True(span),
            "false" => Token::False(span),
            "nullptr" | "NULL" => Token::Null(span),
            word if TYPE_WORDS.contains(&word) => Token::TypeWord(ident, span),
            word if SPECIFIER_WORDS.contains(&word) => Token::Specifier(ident, span),
            _ => Token::Ident(ident, span),
        };

        Ok(token)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip the rest of the current line, including the newline
    fn skip_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
        }
        text
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let mark = self.mark();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            span: self.span_from(mark),
        })
    }

    /// Record `#include <name>` / `#include "name"`; skip any other directive.
    fn preprocessor_directive(&mut self) {
        let line = self.skip_line();
        let directive = line.trim_start_matches('#').trim_start();
        if let Some(rest) = directive.strip_prefix("include") {
            let name = rest
                .trim()
                .trim_start_matches(['<', '"'])
                .trim_end_matches(['>', '"'])
                .trim();
            if !name.is_empty() {
                self.includes.push(name.to_string());
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek().filter(|c| pred(*c)) {
            text.push(ch);
            self.advance();
        }
        text
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn mark(&self) -> Mark {
        Mark {
            position: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(mark.position, self.position, mark.line, mark.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("int main() { return 0; }");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::TypeWord(ref s, _) if s == "int"));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "main"));
        assert!(matches!(tokens[2], Token::LParen(_)));
        assert!(matches!(tokens[3], Token::RParen(_)));
        assert!(matches!(tokens[4], Token::LBrace(_)));
        assert!(matches!(tokens[5], Token::Return(_)));
        assert!(matches!(tokens[6], Token::IntLiteral { value: 0, .. }));
        assert!(matches!(tokens[7], Token::Semicolon(_)));
        assert!(matches!(tokens[8], Token::RBrace(_)));
        assert!(matches!(tokens[9], Token::Eof(_)));
    }

    #[test]
    fn test_operators() {
        let mut lexer = Lexer::new("++ -- += <<= >>= :: ... -> &=");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::PlusPlus(_)));
        assert!(matches!(tokens[1], Token::MinusMinus(_)));
        assert!(matches!(tokens[2], Token::PlusEq(_)));
        assert!(matches!(tokens[3], Token::LtLtEq(_)));
        assert!(matches!(tokens[4], Token::GtGtEq(_)));
        assert!(matches!(tokens[5], Token::ColonColon(_)));
        assert!(matches!(tokens[6], Token::Ellipsis(_)));
        assert!(matches!(tokens[7], Token::Arrow(_)));
        assert!(matches!(tokens[8], Token::AmpEq(_)));
    }

    #[test]
    fn test_number_literals() {
        let mut lexer = Lexer::new("0x1F 017 0b101 42u 3.5 2.0f 1e3");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::IntLiteral { value: 31, radix: 16, .. }));
        assert!(matches!(tokens[1], Token::IntLiteral { value: 15, radix: 8, .. }));
        assert!(matches!(tokens[2], Token::IntLiteral { value: 5, radix: 2, .. }));
        assert!(matches!(tokens[3], Token::IntLiteral { value: 42, unsigned: true, .. }));
        assert!(matches!(tokens[4], Token::FloatLiteral(v, false, _) if v == 3.5));
        assert!(matches!(tokens[5], Token::FloatLiteral(v, true, _) if v == 2.0));
        assert!(matches!(tokens[6], Token::FloatLiteral(v, false, _) if v == 1000.0));
    }

    #[test]
    fn test_spans_track_offsets() {
        let mut lexer = Lexer::new("int x;\n  x = 10;");
        let tokens = lexer.tokenize().unwrap();

        let ten = tokens[5].span();
        assert_eq!(ten.line, 2);
        assert_eq!(ten.column, 7);
        assert_eq!((ten.start, ten.end), (13, 15));
    }

    #[test]
    fn test_string_literal_prefixes() {
        let mut lexer = Lexer::new(r#""hello\nworld" L"wide" 'a' '\x41'"#);
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(&tokens[0], Token::StringLiteral(s, CharWidth::Narrow, _) if s == "hello\nworld"));
        assert!(matches!(&tokens[1], Token::StringLiteral(s, CharWidth::Wide, _) if s == "wide"));
        assert!(matches!(tokens[2], Token::CharLiteral(97, CharWidth::Narrow, _)));
        assert!(matches!(tokens[3], Token::CharLiteral(65, _, _)));
    }

    #[test]
    fn test_include_directives_are_recorded() {
        let mut lexer = Lexer::new("#include <cstdio>\n#define X 1\nint x;");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(lexer.includes(), ["cstdio".to_string()]);
        assert!(matches!(tokens[0], Token::TypeWord(ref s, _) if s == "int"));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "x"));
    }
}
