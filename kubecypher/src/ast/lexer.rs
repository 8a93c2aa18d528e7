// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pull-based lexer for the kubecypher query language
//!
//! The lexer hands out one token per call to [`Lexer::next_token`]. Small `nom`
//! scanners recognize literals and identifiers on the remaining input; the
//! lexer itself decides which scanner applies.
//!
//! # Raw capture
//!
//! Projection and property paths such as `d.spec.template.metadata.labels`
//! are emitted as a single [`Token::PathLiteral`] instead of being split into
//! identifiers and dots. Capture is driven by an explicit state machine:
//!
//! | event                                         | next state               | context         |
//! |-----------------------------------------------|--------------------------|-----------------|
//! | `RETURN`                                      | `AfterReturn`            | `Projection`    |
//! | `WHERE`                                       | `AfterWhere`             | `Filter`        |
//! | `{`                                           | `AfterPropertyOpen`      | `PropertyBlock` |
//! | `}`                                           | `Normal`                 | `Pattern`       |
//! | `,` inside a block, projection or filter list | `AfterPropertySeparator` | unchanged       |
//! | `AND` inside a filter list                    | `AfterPropertySeparator` | unchanged       |
//! | path literal emitted                          | `Normal`                 | unchanged       |
//!
//! In every state other than `Normal` the next call skips whitespace and
//! returns the longest run of path characters, possibly empty.
//!
//! The lexer never fails. Characters it does not understand come back as
//! [`Token::Illegal`] and the parser reports them with their position.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, recognize},
    multi::many0,
    sequence::pair,
    IResult,
};
use std::fmt;

/// Token types for the query language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Keywords
    Match,
    Where,
    Return,
    Create,
    Set,
    Delete,
    And,

    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    Colon,        // :
    Comma,        // ,
    Semicolon,    // ;
    Dash,         // -
    Arrow,        // ->
    Equal,        // =
    NotEqual,     // !=

    // Literals
    String(String),
    /// Digits as written; the parser converts them.
    Integer(String),
    Boolean(bool),

    Identifier(String),

    /// Field path captured in raw mode
    PathLiteral(String),

    EOF,
    Illegal(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Match => write!(f, "MATCH"),
            Token::Where => write!(f, "WHERE"),
            Token::Return => write!(f, "RETURN"),
            Token::Create => write!(f, "CREATE"),
            Token::Set => write!(f, "SET"),
            Token::Delete => write!(f, "DELETE"),
            Token::And => write!(f, "AND"),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::LeftBracket => write!(f, "'['"),
            Token::RightBracket => write!(f, "']'"),
            Token::LeftBrace => write!(f, "'{{'"),
            Token::RightBrace => write!(f, "'}}'"),
            Token::Colon => write!(f, "':'"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Dash => write!(f, "'-'"),
            Token::Arrow => write!(f, "'->'"),
            Token::Equal => write!(f, "'='"),
            Token::NotEqual => write!(f, "'!='"),
            Token::String(s) => write!(f, "string \"{}\"", s),
            Token::Integer(n) => write!(f, "integer {}", n),
            Token::Boolean(b) => write!(f, "boolean {}", b),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::PathLiteral(path) => write!(f, "path '{}'", path),
            Token::EOF => write!(f, "end of input"),
            Token::Illegal(ch) => write!(f, "illegal character '{}'", ch),
        }
    }
}

/// Position of a token in the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset from the start of the input
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token together with where it started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Raw-capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Normal,
    AfterReturn,
    AfterWhere,
    AfterPropertyOpen,
    AfterPropertySeparator,
}

impl LexState {
    fn captures(self) -> bool {
        !matches!(self, LexState::Normal)
    }
}

/// Which kind of list a separator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexContext {
    Pattern,
    PropertyBlock,
    Projection,
    Filter,
}

/// Lexer state
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    state: LexState,
    context: LexContext,
    /// Last significant token, used to spot node/edge positions
    last: Option<Token>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            column: 1,
            state: LexState::Normal,
            context: LexContext::Pattern,
            last: None,
            finished: false,
        }
    }

    pub fn state(&self) -> LexState {
        self.state
    }

    pub fn context(&self) -> LexContext {
        self.context
    }

    /// Drain the lexer, including the trailing `EOF`
    pub fn tokenize(&mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();
        loop {
            let next = self.next_token();
            let done = next.token == Token::EOF;
            tokens.push(next);
            if done {
                return tokens;
            }
        }
    }

    /// Produce the next token. Once `EOF` has been returned, every later call
    /// returns `EOF` again without touching the input.
    pub fn next_token(&mut self) -> SpannedToken {
        if self.finished {
            return SpannedToken {
                token: Token::EOF,
                span: self.span(),
            };
        }

        if self.state.captures() {
            self.skip_whitespace();
            let span = self.span();
            let (rest, path) = path_literal(self.remaining()).unwrap_or((self.remaining(), ""));
            let mut consumed = self.remaining().len() - rest.len();
            let token = match rest.chars().next() {
                // Nothing captured and the next character cannot end a path
                Some(ch) if path.is_empty() && !ends_empty_path(ch) => {
                    consumed = ch.len_utf8();
                    Token::Illegal(ch)
                }
                _ => Token::PathLiteral(path.to_string()),
            };
            self.advance(consumed);
            log::trace!("lexer: {:?} captured {:?}", self.state, path);
            self.state = LexState::Normal;
            self.last = Some(token.clone());
            return SpannedToken { token, span };
        }

        self.skip_whitespace();
        let span = self.span();
        let remaining = self.remaining();
        let Some(first) = remaining.chars().next() else {
            self.finished = true;
            return SpannedToken {
                token: Token::EOF,
                span,
            };
        };

        let (consumed, token) = match first {
            '(' => (1, Token::LeftParen),
            ')' => (1, Token::RightParen),
            '[' => (1, Token::LeftBracket),
            ']' => (1, Token::RightBracket),
            '{' => (1, Token::LeftBrace),
            '}' => (1, Token::RightBrace),
            ':' => (1, Token::Colon),
            ',' => (1, Token::Comma),
            ';' => (1, Token::Semicolon),
            '=' => (1, Token::Equal),
            '-' if remaining.starts_with("->") => (2, Token::Arrow),
            '-' => (1, Token::Dash),
            '!' if remaining.starts_with("!=") => (2, Token::NotEqual),
            '"' | '\'' => match string_literal(remaining) {
                Ok((rest, raw)) => (remaining.len() - rest.len(), Token::String(unescape(raw))),
                // Unterminated string
                Err(_) => (first.len_utf8(), Token::Illegal(first)),
            },
            c if c.is_ascii_digit() => match integer_literal(remaining) {
                Ok((rest, digits)) => (remaining.len() - rest.len(), Token::Integer(digits.to_string())),
                Err(_) => (first.len_utf8(), Token::Illegal(first)),
            },
            c if c.is_alphabetic() || c == '_' => match identifier(remaining) {
                Ok((rest, word)) => (remaining.len() - rest.len(), self.classify_word(word)),
                Err(_) => (first.len_utf8(), Token::Illegal(first)),
            },
            other => (other.len_utf8(), Token::Illegal(other)),
        };

        self.advance(consumed);
        self.transition(&token);
        log::trace!("lexer: {:?} at {}", token, span);
        self.last = Some(token.clone());
        SpannedToken { token, span }
    }

    /// Words right after `(`, `:` or `[` in a pattern are bindings, kinds or
    /// relationship types and never keywords.
    fn classify_word(&self, word: &str) -> Token {
        let name_position = self.context == LexContext::Pattern
            && matches!(
                self.last,
                Some(Token::LeftParen | Token::Colon | Token::LeftBracket)
            );
        if name_position {
            return Token::Identifier(word.to_string());
        }

        match word.to_ascii_uppercase().as_str() {
            "MATCH" => Token::Match,
            "WHERE" => Token::Where,
            "RETURN" => Token::Return,
            "CREATE" => Token::Create,
            "SET" => Token::Set,
            "DELETE" => Token::Delete,
            "AND" => Token::And,
            "TRUE" => Token::Boolean(true),
            "FALSE" => Token::Boolean(false),
            _ => Token::Identifier(word.to_string()),
        }
    }

    fn transition(&mut self, token: &Token) {
        match token {
            Token::Return => {
                self.state = LexState::AfterReturn;
                self.context = LexContext::Projection;
            }
            Token::Where => {
                self.state = LexState::AfterWhere;
                self.context = LexContext::Filter;
            }
            Token::LeftBrace => {
                self.state = LexState::AfterPropertyOpen;
                self.context = LexContext::PropertyBlock;
            }
            Token::RightBrace => {
                self.state = LexState::Normal;
                self.context = LexContext::Pattern;
            }
            Token::Comma if self.context != LexContext::Pattern => {
                self.state = LexState::AfterPropertySeparator;
            }
            Token::And if self.context == LexContext::Filter => {
                self.state = LexState::AfterPropertySeparator;
            }
            _ => {}
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.offset..]
    }

    fn span(&self) -> Span {
        Span {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        let remaining = self.remaining();
        let trimmed = remaining.trim_start();
        self.advance(remaining.len() - trimmed.len());
    }

    fn advance(&mut self, bytes: usize) {
        let consumed = &self.input[self.offset..self.offset + bytes];
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset += bytes;
    }
}

/// Characters allowed inside a raw-captured path. `-` and `/` cover label
/// keys such as `app.kubernetes.io/part-of`.
pub fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '.' | '[' | ']' | '_' | '"' | '*' | '$' | '#' | '-' | '/')
}

/// Characters that may directly follow an empty capture, such as the `}`
/// of `{}` or a `;` after a bare `RETURN`
fn ends_empty_path(c: char) -> bool {
    matches!(c, '(' | ')' | '{' | '}' | ':' | ',' | ';' | '=' | '!')
}

fn path_literal(input: &str) -> IResult<&str, &str> {
    take_while(is_path_char)(input)
}

/// Parse string literals, returning the content between the quotes
fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        map(
            recognize(pair(
                char('"'),
                pair(escaped_string_content('"'), char('"')),
            )),
            |s: &str| &s[1..s.len() - 1],
        ),
        map(
            recognize(pair(
                char('\''),
                pair(escaped_string_content('\''), char('\'')),
            )),
            |s: &str| &s[1..s.len() - 1],
        ),
    ))(input)
}

/// Parse string content up to the closing quote, skipping escaped characters
fn escaped_string_content(quote_char: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut pos = 0;
        let input_bytes = input.as_bytes();

        while pos < input_bytes.len() {
            if input_bytes[pos] == b'\\' && pos + 1 < input_bytes.len() {
                pos += 2;
            } else if input_bytes[pos] == quote_char as u8 {
                break;
            } else {
                pos += 1;
            }
        }

        // An escape before a multi-byte character could leave us mid-char
        while !input.is_char_boundary(pos) {
            pos += 1;
        }
        Ok((&input[pos..], &input[0..pos]))
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn integer_literal(input: &str) -> IResult<&str, &str> {
    digit1(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Tokenize a whole query
pub fn tokenize(input: &str) -> Vec<SpannedToken> {
    Lexer::new(input).tokenize()
}
