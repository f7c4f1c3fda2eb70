// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser over the token stream:
//! `expr := or; or := and ("|" and)*; and := term (WS term)*;
//! term := not | primary; not := "-" primary; primary := "(" or ")" | token`.

use crate::search::query::ast::{Expr, Term};
use crate::search::query::tokenizer::{tokenize, Token};
use crate::search::query::QueryError;

pub fn parse(input: &str) -> Result<Expr, QueryError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(Expr::Term(Term::MatchAll));
    }
    let mut pos = 0;
    let expr = parse_or(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(QueryError::UnbalancedParens);
    }
    Ok(expr)
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> Result<Expr, QueryError> {
    let mut parts = vec![parse_and(tokens, pos)?];
    while matches!(tokens.get(*pos), Some(Token::Or)) {
        *pos += 1;
        parts.push(parse_and(tokens, pos)?);
    }
    Ok(if parts.len() == 1 { parts.pop().unwrap_or(Expr::Term(Term::MatchAll)) } else { Expr::Or(parts) })
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Result<Expr, QueryError> {
    let mut parts = vec![parse_not(tokens, pos)?];
    while let Some(t) = tokens.get(*pos) {
        if matches!(t, Token::Or | Token::RParen) {
            break;
        }
        parts.push(parse_not(tokens, pos)?);
    }
    Ok(if parts.len() == 1 { parts.pop().unwrap_or(Expr::Term(Term::MatchAll)) } else { Expr::And(parts) })
}

fn parse_not(tokens: &[Token], pos: &mut usize) -> Result<Expr, QueryError> {
    if matches!(tokens.get(*pos), Some(Token::Not)) {
        *pos += 1;
        let inner = parse_primary(tokens, pos)?;
        Ok(Expr::Not(Box::new(inner)))
    } else {
        parse_primary(tokens, pos)
    }
}

fn parse_primary(tokens: &[Token], pos: &mut usize) -> Result<Expr, QueryError> {
    match tokens.get(*pos) {
        Some(Token::LParen) => {
            *pos += 1;
            let inner = parse_or(tokens, pos)?;
            match tokens.get(*pos) {
                Some(Token::RParen) => {
                    *pos += 1;
                    Ok(inner)
                }
                _ => Err(QueryError::UnbalancedParens),
            }
        }
        Some(_) => {
            let term = token_to_term(tokens, pos)?;
            Ok(Expr::Term(term))
        }
        None => Err(QueryError::InvalidToken("unexpected end of query".to_string())),
    }
}

fn token_to_term(tokens: &[Token], pos: &mut usize) -> Result<Term, QueryError> {
    let token = tokens.get(*pos).ok_or_else(|| QueryError::InvalidToken("expected a term".to_string()))?;
    *pos += 1;
    Ok(match token {
        Token::Word(word) => Term::Exact { word: word.clone(), case_sensitive: false },
        Token::QuotedExact(word) => Term::Exact { word: word.clone(), case_sensitive: true },
        Token::Regex { pattern, case_sensitive } => {
            Term::Regex { pattern: pattern.clone(), case_sensitive: *case_sensitive }
        }
        Token::Fuzzy { word, case_sensitive } => Term::Fuzzy { word: word.clone(), case_sensitive: *case_sensitive },
        Token::Tag { name, exact, .. } if name == "marked" && !exact => Term::Marked,
        Token::Tag { name, exact, .. } if name == "userquery" && !exact => Term::UserQuery,
        Token::Tag { name, exact, case_sensitive } => {
            Term::Tag { name: name.clone(), exact: *exact, case_sensitive: *case_sensitive }
        }
        Token::Field { name, value, case_sensitive } => {
            Term::Field { name: name.clone(), value: value.clone(), case_sensitive: *case_sensitive }
        }
        Token::Not | Token::Or | Token::LParen | Token::RParen => {
            return Err(QueryError::InvalidToken("unexpected structural token in term position".to_string()));
        }
    })
}
