use std::{collections::BTreeMap, str::Chars};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::frontend::SourceFile;

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    line_number: usize,
    chars: PeekNth<Chars<'source>>,
    peeked: Option<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // while
    Identifier,       // main

    /* Literals */
    IntegerLiteral, // 1
    FloatLiteral,   // 1.0
    CharLiteral,    // 'A'

    /* Delimiters */
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Semicolon,  // ;
    Comma,      // ,

    /* Unary + Binary Ops */
    Minus, // -

    /* Binary Ops */
    Plus,                 // +
    Asterisk,             // *
    Divide,               // /
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals, // =
}

impl TokenKind {
    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            Self::NotEquals
                | Self::DoubleEquals
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_term_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }

    pub fn is_factor_operator(&self) -> bool {
        matches!(self, Self::Asterisk | Self::Divide)
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Keyword(Keyword::Int | Keyword::Float | Keyword::Char)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Int,
    Float,
    Char,
    If,
    Else,
    While,
    Return,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        ('*', TokenKind::Asterisk),
        ('-', TokenKind::Minus),
        ('=', TokenKind::Equals),
        ('+', TokenKind::Plus),
        ('/', TokenKind::Divide),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

/// A byte range in a source file, tagged with the 1-indexed line it starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    /// Span covering `self` through the end of `other`
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            line: self.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character `{character}`")]
    UnexpectedCharacter { character: char, span: Span },
    #[error("reached end of line while reading character literal")]
    UnterminatedCharLiteral { span: Span },
    #[error("reached end of file while reading block comment")]
    UnterminatedComment { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedCharLiteral { span }
            | LexError::UnterminatedComment { span } => *span,
        }
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            line_number: 1,
            peeked: None,
        }
    }

    pub fn source(&self) -> &'source SourceFile {
        self.source
    }

    /// Lexes the whole file
    pub fn tokenize(source: &'source SourceFile) -> Result<Vec<Token>, LexError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();

        while let Some(token) = lexer.next()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Span of the end of the input, used for "unexpected end of file" errors
    pub fn eof_span(&self) -> Span {
        let end = self.source.contents.len();
        Span::new(end, end, self.source.row_for_position(end))
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;

        self.position += c.len_utf8();
        if c == '\n' {
            self.line_number += 1;
        }

        Some(c)
    }

    fn next_is(&mut self, n: usize, expected: char) -> bool {
        self.chars.peek_nth(n).is_some_and(|c| *c == expected)
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.advance();
        }
    }

    fn ignore_block_comment(&mut self) -> Result<(), LexError> {
        let start_position = self.position;
        let start_line = self.line_number;

        // Consume `/*`
        self.advance();
        self.advance();

        loop {
            if self.next_is(0, '*') && self.next_is(1, '/') {
                self.advance();
                self.advance();
                return Ok(());
            }

            if self.advance().is_none() {
                return Err(LexError::UnterminatedComment {
                    span: Span::new(start_position, start_position + 2, start_line),
                });
            }
        }
    }

    fn read_char_literal(&mut self) -> Result<Token, LexError> {
        let start_position = self.position;
        let start_line = self.line_number;

        // Consume opening quote
        self.advance();

        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.advance();

            // Skip whatever follows a backslash so `'\''` terminates correctly
            if c == '\\' {
                if self.chars.peek().is_some_and(|c| *c == '\n') {
                    break;
                }
                self.advance();
                continue;
            }

            if c == '\'' {
                return Ok(Token {
                    kind: TokenKind::CharLiteral,
                    span: self.new_span(start_position, start_line),
                });
            }
        }

        Err(LexError::UnterminatedCharLiteral {
            span: self.new_span(start_position, start_line),
        })
    }

    // Keyword or identifier
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }

            self.advance();
        }

        let span = self.new_span(start_position, self.line_number);
        let value = self.source.value_of_span(span);

        let kind = match value.parse() {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(_) => TokenKind::Identifier,
        };

        Token { kind, span }
    }

    fn read_number(&mut self) -> Token {
        let start_position = self.position;
        let mut kind = TokenKind::IntegerLiteral;

        while let Some(c) = self.chars.peek().copied() {
            // Only a dot followed by a digit continues the literal
            if c == '.' && kind == TokenKind::IntegerLiteral {
                if !self.chars.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                    break;
                }
                kind = TokenKind::FloatLiteral;
                self.advance();
                continue;
            }

            if !c.is_ascii_digit() {
                break;
            }

            self.advance();
        }

        Token {
            kind,
            span: self.new_span(start_position, self.line_number),
        }
    }

    fn read_fixed(&mut self, length: usize, kind: TokenKind) -> Token {
        let start_position = self.position;

        for _ in 0..length {
            self.advance();
        }

        Token {
            kind,
            span: self.new_span(start_position, self.line_number),
        }
    }

    fn new_span(&self, start: usize, line: usize) -> Span {
        Span {
            start,
            end: self.position,
            line,
        }
    }

    pub fn peek(&mut self) -> Result<Option<Token>, LexError> {
        if self.peeked.is_none() {
            self.peeked = self.lex_token()?;
        }

        Ok(self.peeked)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Token>, LexError> {
        if let Some(token) = self.peeked.take() {
            return Ok(Some(token));
        }

        self.lex_token()
    }

    fn lex_token(&mut self) -> Result<Option<Token>, LexError> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                // Ignore whitespace
                c if c.is_ascii_whitespace() => {
                    self.advance();
                    continue;
                }
                // Ignore comments
                '/' if self.next_is(1, '/') => {
                    self.ignore_line();
                    continue;
                }
                '/' if self.next_is(1, '*') => {
                    self.ignore_block_comment()?;
                    continue;
                }

                // Char literals
                '\'' => self.read_char_literal()?,

                // Integer and float literals
                n if n.is_ascii_digit() => self.read_number(),

                // Identifiers and keywords
                a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                // Double Equals (==)
                '=' if self.next_is(1, '=') => self.read_fixed(2, TokenKind::DoubleEquals),
                // Not Equals (!=)
                '!' if self.next_is(1, '=') => self.read_fixed(2, TokenKind::NotEquals),
                // Less than or equal (<=)
                '<' if self.next_is(1, '=') => self.read_fixed(2, TokenKind::LessThanOrEqualTo),
                // Greater than or equal (>=)
                '>' if self.next_is(1, '=') => {
                    self.read_fixed(2, TokenKind::GreaterThanOrEqualTo)
                }

                character => match SINGLE_TOKENS.get(&character) {
                    Some(kind) => self.read_fixed(1, *kind),
                    None => {
                        return Err(LexError::UnexpectedCharacter {
                            character,
                            span: Span::new(
                                self.position,
                                self.position + character.len_utf8(),
                                self.line_number,
                            ),
                        });
                    }
                },
            };

            return Ok(Some(token));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let source = SourceFile::new_in_memory(source);
        Lexer::tokenize(&source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_declarations_and_operators() {
        assert_eq!(
            kinds("int x = 10; if (x >= 2.5) { x = x / 1; }"),
            vec![
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
                TokenKind::Keyword(Keyword::If),
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::GreaterThanOrEqualTo,
                TokenKind::FloatLiteral,
                TokenKind::CloseParen,
                TokenKind::OpenBrace,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Identifier,
                TokenKind::Divide,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
                TokenKind::CloseBrace,
            ]
        );
    }

    #[test]
    fn skips_comments_and_tracks_lines() {
        let source = SourceFile::new_in_memory("// header\n/* a\n b */ char c = '\\'';\n");
        let tokens = Lexer::tokenize(&source).unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Char));
        assert_eq!(tokens[0].span.line, 3);
        assert_eq!(tokens[3].kind, TokenKind::CharLiteral);
        assert_eq!(source.value_of_span(tokens[3].span), "'\\''");
    }

    #[test]
    fn rejects_unknown_characters() {
        let source = SourceFile::new_in_memory("int a;\nint b = a @ 2;");
        let error = Lexer::tokenize(&source).unwrap_err();

        assert_eq!(
            error,
            LexError::UnexpectedCharacter {
                character: '@',
                span: Span::new(17, 18, 2)
            }
        );
    }

    #[test]
    fn rejects_unterminated_char_literal() {
        let source = SourceFile::new_in_memory("char c = 'a\n;");

        assert!(matches!(
            Lexer::tokenize(&source),
            Err(LexError::UnterminatedCharLiteral { .. })
        ));
    }
}
