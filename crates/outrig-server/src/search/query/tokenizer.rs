// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lexes a query string into [`Token`]s.

use std::iter::Peekable;
use std::str::Chars;

use crate::search::query::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    QuotedExact(String),
    Regex { pattern: String, case_sensitive: bool },
    Fuzzy { word: String, case_sensitive: bool },
    Tag { name: String, exact: bool, case_sensitive: bool },
    Field { name: String, value: String, case_sensitive: bool },
    Not,
    Or,
    LParen,
    RParen,
}

const STOP_CHARS: [char; 3] = ['(', ')', '|'];

pub fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let mut chars = input.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Or);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Not);
            }
            _ => tokens.push(read_token(&mut chars)?),
        }
    }

    Ok(tokens)
}

/// Reads one non-structural token, handling the optional leading `c`
/// case-sensitivity modifier before dispatching on the prefix character.
fn read_token(chars: &mut Peekable<Chars<'_>>) -> Result<Token, QueryError> {
    let mut case_sensitive = false;
    if chars.peek() == Some(&'c') {
        let mut lookahead = chars.clone();
        lookahead.next();
        if matches!(lookahead.peek(), Some('\'') | Some('/') | Some('~') | Some('#') | Some('$')) {
            chars.next();
            case_sensitive = true;
        }
    }

    match chars.peek().copied() {
        Some('\'') => {
            chars.next();
            let body = read_until(chars, '\'')?;
            Ok(Token::QuotedExact(body))
        }
        Some('/') => {
            chars.next();
            let pattern = read_until(chars, '/')?;
            Ok(Token::Regex { pattern, case_sensitive })
        }
        Some('~') => {
            chars.next();
            let word = read_word(chars);
            Ok(Token::Fuzzy { word, case_sensitive })
        }
        Some('#') => {
            chars.next();
            let name = read_word(chars);
            let exact = chars.peek() == Some(&'/');
            if exact {
                chars.next();
            }
            Ok(Token::Tag { name, exact, case_sensitive })
        }
        Some('$') => {
            chars.next();
            let name = read_word_until(chars, &[':']);
            if chars.peek() != Some(&':') {
                return Err(QueryError::InvalidToken(format!("${name} missing ':value'")));
            }
            chars.next();
            let value = read_word(chars);
            Ok(Token::Field { name, value, case_sensitive })
        }
        Some(_) => {
            let word = read_word(chars);
            if word.is_empty() {
                let unexpected = chars.next().unwrap_or_default();
                return Err(QueryError::InvalidToken(unexpected.to_string()));
            }
            Ok(Token::Word(word))
        }
        None => Err(QueryError::InvalidToken("unexpected end of query".to_string())),
    }
}

/// Reads a bare word: anything up to whitespace or a structural
/// character (`( ) |`).
fn read_word(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || STOP_CHARS.contains(&c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn read_word_until(chars: &mut Peekable<Chars<'_>>, extra_stop: &[char]) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || STOP_CHARS.contains(&c) || extra_stop.contains(&c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/// Reads until (and consumes) the closing delimiter. Errors if the
/// input ends first.
fn read_until(chars: &mut Peekable<Chars<'_>>, delim: char) -> Result<String, QueryError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            Some(c) if c == delim => return Ok(out),
            Some(c) => out.push(c),
            None => return Err(QueryError::UnterminatedToken(delim)),
        }
    }
}
