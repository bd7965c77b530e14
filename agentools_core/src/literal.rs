//! Tolerant literal parser for model output.
//!
//! Language models asked for "a list of JSON objects" frequently answer in
//! Python literal syntax instead: single-quoted strings, `True`/`None`,
//! tuples, trailing commas. [`parse`] accepts both notations and produces a
//! [`serde_json::Value`]. It only reads data; nothing is ever evaluated.

use std::fmt;

use serde_json::{Map, Number, Value};

use crate::error::FormatError;

/// Position-tagged failure of [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    /// Byte offset into the parsed text.
    pub position: usize,
    pub message: String,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for LiteralError {}

impl From<LiteralError> for FormatError {
    fn from(err: LiteralError) -> Self {
        FormatError(err.to_string().into())
    }
}

/// Parses a single JSON or Python-style literal. Surrounding whitespace is
/// allowed, any other trailing content is an error.
pub fn parse(text: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        text,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_blank();
    if parser.pos < text.len() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

/// Deepest container nesting accepted, same limit as serde_json.
const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and `#` line comments.
    fn skip_blank(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_blank();
        match self.peek() {
            Some('{') => self.nested(Self::mapping),
            Some('[') => self.nested(|p| p.sequence('[', ']').map(|(items, _)| Value::Array(items))),
            Some('(') => self.nested(Self::tuple),
            Some('"') | Some('\'') => self.strings().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.constant(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        container: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = container(self);
        self.depth -= 1;
        value
    }

    fn mapping(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_blank();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key_pos = self.pos;
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => (if b { "True" } else { "False" }).to_owned(),
                _ => {
                    return Err(LiteralError {
                        position: key_pos,
                        message: "mapping keys must be strings or numbers".into(),
                    })
                }
            };
            self.skip_blank();
            if !self.eat(':') {
                return Err(self.error("expected ':' after mapping key"));
            }
            let value = self.value()?;
            map.insert(key, value);
            self.skip_blank();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            return Err(self.error("expected ',' or '}' in mapping"));
        }
    }

    /// Comma separated values up to `close`; a trailing comma is allowed
    /// and reported in the second field.
    fn sequence(&mut self, open: char, close: char) -> Result<(Vec<Value>, bool), LiteralError> {
        debug_assert_eq!(self.peek(), Some(open));
        self.bump();
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_blank();
            if self.eat(close) {
                return Ok((items, trailing_comma));
            }
            items.push(self.value()?);
            self.skip_blank();
            if self.eat(',') {
                trailing_comma = true;
                continue;
            }
            if self.eat(close) {
                return Ok((items, false));
            }
            return Err(self.error(format!("expected ',' or '{close}'")));
        }
    }

    /// `(a, b)` becomes an array, `(a)` is just a parenthesised `a`.
    fn tuple(&mut self) -> Result<Value, LiteralError> {
        let (mut items, trailing_comma) = self.sequence('(', ')')?;
        if items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    /// One string literal, or several adjacent ones concatenated.
    fn strings(&mut self) -> Result<String, LiteralError> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_blank();
            match self.peek() {
                Some('"') | Some('\'') => out.push_str(&self.string()?),
                _ => {
                    self.pos = save;
                    return Ok(out);
                }
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let triple = self.text[self.pos..].starts_with(&format!("{quote}{quote}"));
        if triple {
            self.pos += 2 * quote.len_utf8();
        }

        let mut out = String::new();
        loop {
            let c = self.bump().ok_or(LiteralError {
                position: start,
                message: "unterminated string".into(),
            })?;
            match c {
                '\\' => self.escape(&mut out)?,
                c if c == quote && !triple => return Ok(out),
                c if c == quote && self.text[self.pos..].starts_with(&format!("{quote}{quote}")) => {
                    self.pos += 2 * quote.len_utf8();
                    return Ok(out);
                }
                '\n' if !triple => {
                    return Err(LiteralError {
                        position: start,
                        message: "newline in single-line string".into(),
                    })
                }
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '0' => out.push('\0'),
            '/' => out.push('/'),
            '\\' | '\'' | '"' => out.push(c),
            // line continuation
            '\n' => {}
            'x' => out.push(self.code_point(2)?),
            'u' => {
                let first = self.code_point_raw(4)?;
                if (0xD800..0xDC00).contains(&first) && self.text[self.pos..].starts_with("\\u") {
                    self.pos += 2;
                    let second = self.code_point_raw(4)?;
                    if !(0xDC00..0xE000).contains(&second) {
                        return Err(self.error("high surrogate without a low surrogate"));
                    }
                    let combined = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                    out.push(char::from_u32(combined).ok_or_else(|| self.error("invalid surrogate pair"))?);
                } else {
                    out.push(char::from_u32(first).ok_or_else(|| self.error("invalid code point"))?);
                }
            }
            'U' => out.push(self.code_point(8)?),
            // unknown escapes are kept verbatim, as Python does
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn code_point_raw(&mut self, digits: usize) -> Result<u32, LiteralError> {
        let hex = self
            .text
            .get(self.pos..self.pos + digits)
            .ok_or_else(|| self.error("truncated escape"))?;
        let value = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += digits;
        Ok(value)
    }

    fn code_point(&mut self, digits: usize) -> Result<char, LiteralError> {
        let value = self.code_point_raw(digits)?;
        char::from_u32(value).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-') | Some('+')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        let literal: String = self.text[start..self.pos].chars().filter(|c| *c != '_').collect();
        let invalid = || LiteralError {
            position: start,
            message: format!("invalid number {literal:?}"),
        };

        if !is_float {
            let trimmed = literal.strip_prefix('+').unwrap_or(&literal);
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            if let Ok(n) = trimmed.parse::<u64>() {
                return Ok(Value::Number(n.into()));
            }
        }
        let float: f64 = literal.parse().map_err(|_| invalid())?;
        Number::from_f64(float).map(Value::Number).ok_or_else(invalid)
    }

    fn constant(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.text[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            word => Err(LiteralError {
                position: start,
                message: format!("unsupported name {word:?}"),
            }),
        }
    }
}
