//! Token stream for FGD text.
//!
//! Classification is done by logos; [`Tokenizer`] adds line/column positions,
//! a one-token push-back and the error constructor the grammar relies on.

use std::fmt;
use std::path::{Path, PathBuf};

use logos::Logos;

use crate::error::{ParseError, ParseErrorCode, SourceLocation};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r#""([^"\\\n]|\\.)*""#, unquote)]
    #[regex(r#"[^\s"\[\]():=+/][^\s"\[\]():=+]*"#, |lex| lex.slice().to_string())]
    String(String),

    #[regex(r"\([^)]*\)", |lex| {
        let raw = lex.slice();
        raw[1..raw.len() - 1].to_string()
    })]
    ParenArgs(String),

    #[token("[")]
    BrackOpen,

    #[token("]")]
    BrackClose,

    #[token(":")]
    Colon,

    #[token("=")]
    Equals,

    #[token("+")]
    Plus,
}

fn unquote(lex: &mut logos::Lexer<RawToken>) -> String {
    let raw = lex.slice();
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Classified token. Quoted and bare words are both [`Token::String`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Newline,
    String(String),
    ParenArgs(String),
    BrackOpen,
    BrackClose,
    Colon,
    Equals,
    Plus,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newline => f.write_str("newline"),
            Self::String(value) => write!(f, "string {value:?}"),
            Self::ParenArgs(value) => write!(f, "arguments ({value})"),
            Self::BrackOpen => f.write_str("'['"),
            Self::BrackClose => f.write_str("']'"),
            Self::Colon => f.write_str("':'"),
            Self::Equals => f.write_str("'='"),
            Self::Plus => f.write_str("'+'"),
            Self::Eof => f.write_str("end of file"),
        }
    }
}

impl From<RawToken> for Token {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Newline => Self::Newline,
            RawToken::String(value) => Self::String(value),
            RawToken::ParenArgs(value) => Self::ParenArgs(value),
            RawToken::BrackOpen => Self::BrackOpen,
            RawToken::BrackClose => Self::BrackClose,
            RawToken::Colon => Self::Colon,
            RawToken::Equals => Self::Equals,
            RawToken::Plus => Self::Plus,
        }
    }
}

pub struct Tokenizer<'s> {
    lexer: logos::Lexer<'s, RawToken>,
    file_path: PathBuf,
    line_starts: Vec<usize>,
    last_location: SourceLocation,
}

impl<'s> Tokenizer<'s> {
    pub fn new(source: &'s str, file_path: &Path) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self {
            lexer: RawToken::lexer(source),
            file_path: file_path.to_path_buf(),
            line_starts,
            last_location: SourceLocation { line: 1, column: 1 },
        }
    }

    pub fn next_token(&mut self) -> Result<(Token, SourceLocation), ParseError> {
        match self.lexer.next() {
            None => {
                let location = self.location_of(self.lexer.source().len());
                self.last_location = location;
                Ok((Token::Eof, location))
            }
            Some(result) => {
                let location = self.location_of(self.lexer.span().start);
                self.last_location = location;
                match result {
                    Ok(raw) => Ok((raw.into(), location)),
                    Err(()) => Err(self.error(
                        ParseErrorCode::UnexpectedToken,
                        format!("unrecognised text {:?}", self.lexer.slice()),
                    )),
                }
            }
        }
    }

    /// Next token that is not a newline.
    pub fn next_significant(&mut self) -> Result<(Token, SourceLocation), ParseError> {
        loop {
            let (token, location) = self.next_token()?;
            if token != Token::Newline {
                return Ok((token, location));
            }
        }
    }

    pub fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.next_significant()? {
            (Token::String(value), _) => Ok(value),
            (other, _) => Err(self.unexpected(&other, "a string")),
        }
    }

    pub fn expect_paren_args(&mut self) -> Result<String, ParseError> {
        match self.next_significant()? {
            (Token::ParenArgs(value), _) => Ok(value),
            (other, _) => Err(self.unexpected(&other, "parenthesised arguments")),
        }
    }

    pub fn expect_brack_open(&mut self) -> Result<(), ParseError> {
        match self.next_significant()? {
            (Token::BrackOpen, _) => Ok(()),
            (other, _) => Err(self.unexpected(&other, "'['")),
        }
    }

    /// Error located at the most recently returned token.
    pub fn error(&self, code: ParseErrorCode, message: impl Into<String>) -> ParseError {
        ParseError {
            code,
            message: message.into(),
            file_path: self.file_path.clone(),
            location: Some(self.last_location),
        }
    }

    pub fn unexpected(&self, token: &Token, expected: &str) -> ParseError {
        let code = if *token == Token::Eof {
            ParseErrorCode::UnexpectedEof
        } else {
            ParseErrorCode::UnexpectedToken
        };
        self.error(code, format!("unexpected {token}, expected {expected}"))
    }

    fn location_of(&self, offset: usize) -> SourceLocation {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        let column = self
            .lexer
            .source()
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        SourceLocation {
            line: line_index + 1,
            column: column + 1,
        }
    }
}
