//! The scanner: source text to tokens, including `#include` expansion.
//!
//! Source files are scanned left-to-right into a flat token stream for the
//! parser. `#include` directives are handled here: the named file is lexed
//! recursively and its tokens spliced in place, with every token carrying a
//! position that records the include chain, so errors inside includes report
//! where they came from.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use num_bigint::BigInt;

use crate::{number::Number, types::Identifier};

/// Hard bound on scientific-notation exponents; larger literals are refused
/// rather than materialised.
const MAX_EXPONENT: i64 = 1024;

/// Includes nested deeper than this are assumed to be cyclic.
const MAX_INCLUDE_DEPTH: usize = 100;

/// A source coordinate: a file in the [`SourceMap`] plus line and column
/// (both 1-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub file: u16,
    pub line: u32,
    pub column: u32,
}

/// One scanned file: where it lives and, for includes, where it was pulled
/// in from.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: Option<PathBuf>,
    pub included_at: Option<Position>,
}

/// The registry of every file that participated in a compilation.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_file(&mut self, path: Option<PathBuf>, included_at: Option<Position>) -> u16 {
        self.files.push(SourceFile { path, included_at });
        u16::try_from(self.files.len() - 1).expect("include explosion")
    }

    /// Renders `position` with its include chain, e.g.
    /// `lib/zk.cc:12:3 (included from init.cc:4:1)`.
    pub fn describe(&self, position: Position) -> String {
        let mut output = self.describe_site(position);
        if let Some(included_at) = self
            .files
            .get(usize::from(position.file))
            .and_then(|file| file.included_at)
        {
            output.push_str(&format!(" (included from {})", self.describe_site(included_at)));
        }
        output
    }

    fn describe_site(&self, position: Position) -> String {
        let name = self
            .files
            .get(usize::from(position.file))
            .and_then(|file| file.path.as_ref())
            .map_or_else(|| "<input>".to_owned(), |p| p.display().to_string());
        format!("{name}:{}:{}", position.line, position.column)
    }
}

/// A lexical error; scanning stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(Identifier),
    Number(Number),
    String(String),
    True,
    False,
    While,
    For,
    If,
    Else,
    Return,
    Namespace,
    Class,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    ColonColon,
    Question,
    Assign,
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Plus,
    Minus,
    Times,
    Divide,
    PlusEq,
    MinusEq,
    TimesEq,
    DivideEq,
    PlusPlus,
    MinusMinus,
    And,
    Or,
    Not,
    Arrow,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "`{name}`"),
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::While => f.write_str("while"),
            Self::For => f.write_str("for"),
            Self::If => f.write_str("if"),
            Self::Else => f.write_str("else"),
            Self::Return => f.write_str("return"),
            Self::Namespace => f.write_str("namespace"),
            Self::Class => f.write_str("class"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::LBrace => f.write_str("{"),
            Self::RBrace => f.write_str("}"),
            Self::LBracket => f.write_str("["),
            Self::RBracket => f.write_str("]"),
            Self::Semicolon => f.write_str(";"),
            Self::Comma => f.write_str(","),
            Self::Dot => f.write_str("."),
            Self::Colon => f.write_str(":"),
            Self::ColonColon => f.write_str("::"),
            Self::Question => f.write_str("?"),
            Self::Assign => f.write_str("="),
            Self::Equals => f.write_str("=="),
            Self::NotEquals => f.write_str("!="),
            Self::LessThan => f.write_str("<"),
            Self::LessOrEqual => f.write_str("<="),
            Self::GreaterThan => f.write_str(">"),
            Self::GreaterOrEqual => f.write_str(">="),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Times => f.write_str("*"),
            Self::Divide => f.write_str("/"),
            Self::PlusEq => f.write_str("+="),
            Self::MinusEq => f.write_str("-="),
            Self::TimesEq => f.write_str("*="),
            Self::DivideEq => f.write_str("/="),
            Self::PlusPlus => f.write_str("++"),
            Self::MinusMinus => f.write_str("--"),
            Self::And => f.write_str("&&"),
            Self::Or => f.write_str("||"),
            Self::Not => f.write_str("!"),
            Self::Arrow => f.write_str("->"),
        }
    }
}

pub type SpannedToken = (Position, Token, Position);

/// Lexes an in-memory source (no path; quoted includes resolve relative to
/// the working directory).
pub fn lex_string(source: &str, map: &mut SourceMap) -> Result<Vec<SpannedToken>, LexError> {
    let file = map.add_file(None, None);
    let mut output = Vec::new();
    Scanner::new(source, file).run(map, &mut output, 0)?;
    Ok(output)
}

/// Lexes a file from disk.
pub fn lex_file(path: &Path, map: &mut SourceMap) -> Result<Vec<SpannedToken>, LexError> {
    let mut output = Vec::new();
    lex_file_at(path, None, map, &mut output, 0)?;
    Ok(output)
}

fn lex_file_at(
    path: &Path,
    included_at: Option<Position>,
    map: &mut SourceMap,
    output: &mut Vec<SpannedToken>,
    depth: usize,
) -> Result<(), LexError> {
    let position = included_at.unwrap_or_default();
    if depth > MAX_INCLUDE_DEPTH {
        return Err(LexError {
            position,
            message: format!("{}: #include nesting too deep", path.display()),
        });
    }
    let source = fs::read_to_string(path).map_err(|_| LexError {
        position,
        message: format!("{}: open failed", path.display()),
    })?;
    let file = map.add_file(Some(path.to_owned()), included_at);
    Scanner::new(&source, file).run(map, output, depth)
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    file: u16,
}

impl Scanner {
    fn new(source: &str, file: u16) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file,
        }
    }

    fn position(&self) -> Position {
        Position {
            file: self.file,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, position: Position, message: impl Into<String>) -> LexError {
        LexError {
            position,
            message: message.into(),
        }
    }

    fn run(
        &mut self,
        map: &mut SourceMap,
        output: &mut Vec<SpannedToken>,
        depth: usize,
    ) -> Result<(), LexError> {
        while let Some(c) = self.peek() {
            let start = self.position();
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                '#' => {
                    self.advance();
                    self.directive(start, map, output, depth)?;
                }
                '"' => {
                    let token = self.string_literal(start)?;
                    output.push((start, token, self.position()));
                }
                '0'..='9' => {
                    let token = self.number_literal(start)?;
                    output.push((start, token, self.position()));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let token = self.identifier_or_keyword();
                    output.push((start, token, self.position()));
                }
                _ => {
                    let token = self.punctuation(start)?;
                    output.push((start, token, self.position()));
                }
            }
        }
        Ok(())
    }

    fn identifier_or_keyword(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match name.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "while" => Token::While,
            "for" => Token::For,
            "if" => Token::If,
            "else" => Token::Else,
            "return" => Token::Return,
            "namespace" => Token::Namespace,
            "class" => Token::Class,
            _ => Token::Identifier(Identifier::new(name)),
        }
    }

    fn string_literal(&mut self, start: Position) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(self.error(start, "Missing terminating \" character."));
                }
                Some('"') => return Ok(Token::String(value)),
                Some('\\') => match self.advance() {
                    None => {
                        return Err(self.error(start, "Missing terminating \" character."));
                    }
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('"') => value.push('"'),
                    Some(other) => value.push(other),
                },
                Some(other) => value.push(other),
            }
        }
    }

    fn decimal_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn number_literal(&mut self, start: Position) -> Result<Token, LexError> {
        let integral = self.decimal_digits();
        let mut value = Number::from_bigint(
            BigInt::parse_bytes(integral.as_bytes(), 10).expect("digits scanned"),
        );
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            let fraction = self.decimal_digits();
            let numerator = Number::from_bigint(
                BigInt::parse_bytes(fraction.as_bytes(), 10).expect("digits scanned"),
            );
            let denominator = Number::from_bigint(BigInt::from(10).pow(fraction.len() as u32));
            value = &value
                + &numerator
                    .checked_div(&denominator)
                    .expect("power of ten is non-zero");
        }
        if self.peek() == Some('e') {
            self.advance();
            let mut positive = true;
            match self.peek() {
                Some('+') => {
                    self.advance();
                }
                Some('-') => {
                    positive = false;
                    self.advance();
                }
                _ => {}
            }
            let digits = self.decimal_digits();
            if digits.is_empty() {
                return Err(self.error(start, "Expected digits in exponent."));
            }
            let exponent: i64 = digits.parse().map_err(|_| {
                self.error(
                    start,
                    "Exponent (in scientific notation) can't be converted to integer",
                )
            })?;
            if exponent > MAX_EXPONENT {
                return Err(self.error(
                    start,
                    format!(
                        "Cowardly refusing to create a number with very large exponent: {exponent}"
                    ),
                ));
            }
            let factor = Number::from_bigint(BigInt::from(10).pow(exponent as u32));
            value = if positive {
                &value * &factor
            } else {
                value
                    .checked_div(&factor)
                    .expect("power of ten is non-zero")
            };
        }
        Ok(Token::Number(value))
    }

    fn punctuation(&mut self, start: Position) -> Result<Token, LexError> {
        let c = self.advance().expect("caller peeked");
        let next_is = |scanner: &Self, expected: char| scanner.peek() == Some(expected);
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '?' => Token::Question,
            ':' => {
                if next_is(self, ':') {
                    self.advance();
                    Token::ColonColon
                } else {
                    Token::Colon
                }
            }
            '=' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::Equals
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::NotEquals
                } else {
                    Token::Not
                }
            }
            '<' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::LessOrEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::GreaterOrEqual
                } else {
                    Token::GreaterThan
                }
            }
            '+' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::PlusEq
                } else if next_is(self, '+') {
                    self.advance();
                    Token::PlusPlus
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::MinusEq
                } else if next_is(self, '-') {
                    self.advance();
                    Token::MinusMinus
                } else if next_is(self, '>') {
                    self.advance();
                    Token::Arrow
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::TimesEq
                } else {
                    Token::Times
                }
            }
            '/' => {
                if next_is(self, '=') {
                    self.advance();
                    Token::DivideEq
                } else {
                    Token::Divide
                }
            }
            '&' => {
                if next_is(self, '&') {
                    self.advance();
                    Token::And
                } else {
                    return Err(self.error(start, "Unhandled character: &"));
                }
            }
            '|' => {
                if next_is(self, '|') {
                    self.advance();
                    Token::Or
                } else {
                    return Err(self.error(start, "Unhandled character: |"));
                }
            }
            other => {
                return Err(self.error(start, format!("Unhandled character: {other}")));
            }
        };
        Ok(token)
    }

    /// Handles a `#` preprocessor directive; only `#include` exists.
    fn directive(
        &mut self,
        start: Position,
        map: &mut SourceMap,
        output: &mut Vec<SpannedToken>,
        depth: usize,
    ) -> Result<(), LexError> {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if word != "include" {
            return Err(self.error(start, format!("Invalid preprocessing directive #{word}")));
        }
        while self.peek() == Some(' ') {
            self.advance();
        }
        let delimiter = match self.peek() {
            Some('"') => '"',
            Some('<') => '>',
            _ => {
                return Err(self.error(start, "#include expects \"FILENAME\" or <FILENAME>"));
            }
        };
        self.advance();
        let mut path = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(self.error(
                        start,
                        "#include expects \"FILENAME\" or <FILENAME>, failed to find closing character",
                    ));
                }
                Some(c) if c == delimiter => break,
                Some(c) => path.push(c),
            }
        }
        let mut path = PathBuf::from(path);
        // The quoted form resolves relative to the including file.
        if delimiter == '"' && path.is_relative() {
            let current = &map.files[usize::from(self.file)];
            if let Some(directory) = current.path.as_ref().and_then(|p| p.parent()) {
                path = directory.join(path);
            }
        }
        lex_file_at(&path, Some(start), map, output, depth + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let mut map = SourceMap::new();
        lex_string(source, &mut map)
            .unwrap()
            .into_iter()
            .map(|(_, token, _)| token)
            .collect()
    }

    #[test]
    fn punctuation_and_keywords() {
        assert_eq!(
            lex("while (x <= 4) x += 1;"),
            vec![
                Token::While,
                Token::LParen,
                Token::Identifier(Identifier::new("x")),
                Token::LessOrEqual,
                Token::Number(Number::from_i64(4)),
                Token::RParen,
                Token::Identifier(Identifier::new("x")),
                Token::PlusEq,
                Token::Number(Number::from_i64(1)),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(lex("1 // the rest is ignored ++ --\n2"), vec![
            Token::Number(Number::from_i64(1)),
            Token::Number(Number::from_i64(2)),
        ]);
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(lex("1.5e2"), vec![Token::Number(Number::from_i64(150))]);
        assert_eq!(
            lex("25e-2"),
            vec![Token::Number(
                Number::from_i64(1).checked_div(&Number::from_i64(4)).unwrap()
            )]
        );
    }

    #[test]
    fn oversized_exponent_is_refused() {
        let mut map = SourceMap::new();
        let error = lex_string("1e99999", &mut map).unwrap_err();
        assert!(error.message.contains("very large exponent"));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex(r#""a\nb\t\"\\""#),
            vec![Token::String("a\nb\t\"\\".to_owned())]
        );
    }

    #[test]
    fn unterminated_string() {
        let mut map = SourceMap::new();
        let error = lex_string("\"abc", &mut map).unwrap_err();
        assert!(error.message.contains("Missing terminating"));
    }

    #[test]
    fn lone_ampersand_is_an_error() {
        let mut map = SourceMap::new();
        let error = lex_string("a & b", &mut map).unwrap_err();
        assert_eq!(error.message, "Unhandled character: &");
    }
}
