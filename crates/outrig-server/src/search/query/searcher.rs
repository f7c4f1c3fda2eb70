// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled searchers and the object/context they evaluate against
//! -> bool`").

use std::collections::HashSet;

use outrig_protocol::LogLine;
use regex::RegexBuilder;

use crate::search::query::ast::{Expr, Term};
use crate::search::query::QueryError;

/// One candidate line plus lazily-materialized, cached field views.
///
/// The raw message is always available; a lowercased copy is computed
/// once and reused across the searchers that ask for it, keeping the hot
/// path allocation-free for queries that never need case folding.
pub struct SearchObject<'a> {
    line: &'a LogLine,
    lower_msg: Option<String>,
}

impl<'a> SearchObject<'a> {
    pub fn new(line: &'a LogLine) -> Self {
        Self { line, lower_msg: None }
    }

    pub fn line(&self) -> &LogLine {
        self.line
    }

    fn msg(&mut self, case_sensitive: bool) -> &str {
        if case_sensitive {
            return &self.line.msg;
        }
        if self.lower_msg.is_none() {
            self.lower_msg = Some(self.line.msg.to_lowercase());
        }
        self.lower_msg.as_deref().unwrap_or_default()
    }

    /// Named-field lookup for `$field:value` terms. Log lines expose
    /// `source` and `linenum`; unknown field names match nothing rather
    /// than erroring, since a system query may reference fields that
    /// don't apply to every object kind this grammar could evaluate.
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "source" => Some(self.line.source.as_str().to_string()),
            "linenum" => Some(self.line.line_num.to_string()),
            _ => None,
        }
    }

    /// Log lines carry no tag set of their own, so a
    /// `#tag` term never matches a log line.
    fn tags(&self) -> &[String] {
        &[]
    }
}

/// The marked-line set and, for system queries, the compiled user query.
pub struct SearchContext<'a> {
    pub marked: &'a HashSet<i64>,
    pub user_query: Option<&'a dyn Searcher>,
}

pub trait Searcher: Send + Sync {
    fn matches(&self, ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool;
}

struct AndSearcher(Vec<Box<dyn Searcher>>);
impl Searcher for AndSearcher {
    fn matches(&self, ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        self.0.iter().all(|s| s.matches(ctx, obj))
    }
}

struct OrSearcher(Vec<Box<dyn Searcher>>);
impl Searcher for OrSearcher {
    fn matches(&self, ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        self.0.iter().any(|s| s.matches(ctx, obj))
    }
}

struct NotSearcher(Box<dyn Searcher>);
impl Searcher for NotSearcher {
    fn matches(&self, ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        !self.0.matches(ctx, obj)
    }
}

struct MatchAllSearcher;
impl Searcher for MatchAllSearcher {
    fn matches(&self, _ctx: &SearchContext<'_>, _obj: &mut SearchObject<'_>) -> bool {
        true
    }
}

struct ExactSearcher {
    needle: String,
    case_sensitive: bool,
}
impl Searcher for ExactSearcher {
    fn matches(&self, _ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        obj.msg(self.case_sensitive).contains(&self.needle)
    }
}

struct RegexSearcher(regex::Regex);
impl Searcher for RegexSearcher {
    fn matches(&self, _ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        // Case-insensitivity is an inline regex flag; always evaluated
        // against the raw message.
        self.0.is_match(&obj.line().msg)
    }
}

struct FuzzySearcher {
    needle: String,
    case_sensitive: bool,
}
impl Searcher for FuzzySearcher {
    fn matches(&self, _ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        subsequence_match(obj.msg(self.case_sensitive), &self.needle)
    }
}

/// True if every character of `needle` appears in `haystack` in order,
/// not necessarily contiguously (the common "fuzzy finder" definition).
fn subsequence_match(haystack: &str, needle: &str) -> bool {
    let mut needle_chars = needle.chars();
    let mut want = needle_chars.next();
    for c in haystack.chars() {
        match want {
            None => return true,
            Some(w) if c == w => want = needle_chars.next(),
            _ => {}
        }
    }
    want.is_none()
}

struct TagSearcher {
    name: String,
    exact: bool,
    case_sensitive: bool,
}
impl Searcher for TagSearcher {
    fn matches(&self, _ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        obj.tags().iter().any(|tag| {
            let (tag, name): (String, String) = if self.case_sensitive {
                (tag.clone(), self.name.clone())
            } else {
                (tag.to_lowercase(), self.name.to_lowercase())
            };
            if self.exact {
                tag == name
            } else {
                tag.contains(&name)
            }
        })
    }
}

struct FieldSearcher {
    name: String,
    value: String,
    case_sensitive: bool,
}
impl Searcher for FieldSearcher {
    fn matches(&self, _ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        match obj.field(&self.name) {
            Some(actual) if self.case_sensitive => actual == self.value,
            Some(actual) => actual.eq_ignore_ascii_case(&self.value),
            None => false,
        }
    }
}

struct MarkedSearcher;
impl Searcher for MarkedSearcher {
    fn matches(&self, ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        ctx.marked.contains(&obj.line().line_num)
    }
}

/// `#userquery` delegates to whatever searcher the session's user query
/// currently compiles to; absent a user query it matches nothing, so a
/// system query composing `#userquery` degrades to "no results" rather
/// than "everything" when no user filter is active.
struct UserQueryRef;
impl Searcher for UserQueryRef {
    fn matches(&self, ctx: &SearchContext<'_>, obj: &mut SearchObject<'_>) -> bool {
        ctx.user_query.is_some_and(|s| s.matches(ctx, obj))
    }
}

pub fn compile(expr: &Expr) -> Result<Box<dyn Searcher>, QueryError> {
    Ok(match expr {
        Expr::Or(parts) => Box::new(OrSearcher(parts.iter().map(compile).collect::<Result<_, _>>()?)),
        Expr::And(parts) => Box::new(AndSearcher(parts.iter().map(compile).collect::<Result<_, _>>()?)),
        Expr::Not(inner) => Box::new(NotSearcher(compile(inner)?)),
        Expr::Term(term) => compile_term(term)?,
    })
}

fn compile_term(term: &Term) -> Result<Box<dyn Searcher>, QueryError> {
    Ok(match term {
        Term::MatchAll => Box::new(MatchAllSearcher),
        Term::Exact { word, case_sensitive } => {
            let needle = if *case_sensitive { word.clone() } else { word.to_lowercase() };
            Box::new(ExactSearcher { needle, case_sensitive: *case_sensitive })
        }
        Term::Regex { pattern, case_sensitive } => {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .build()
                .map_err(|e| QueryError::InvalidRegex(e.to_string()))?;
            Box::new(RegexSearcher(regex))
        }
        Term::Fuzzy { word, case_sensitive } => {
            let needle = if *case_sensitive { word.clone() } else { word.to_lowercase() };
            Box::new(FuzzySearcher { needle, case_sensitive: *case_sensitive })
        }
        Term::Tag { name, exact, case_sensitive } => {
            Box::new(TagSearcher { name: name.clone(), exact: *exact, case_sensitive: *case_sensitive })
        }
        Term::Field { name, value, case_sensitive } => Box::new(FieldSearcher {
            name: name.clone(),
            value: value.clone(),
            case_sensitive: *case_sensitive,
        }),
        Term::Marked => Box::new(MarkedSearcher),
        Term::UserQuery => Box::new(UserQueryRef),
    })
}
