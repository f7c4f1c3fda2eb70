// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-widget search session.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use outrig_protocol::{AppRunId, LogLine};
use tokio::sync::Mutex;
use tracing::debug;

use crate::apprun::{AppRunPeer, PeerEvent};
use crate::events::{EventHub, ServerEvent};
use crate::search::query::{compile_query, QueryError, SearchContext, Searcher};

/// Extra headroom past the log ring's own capacity before the filtered
/// window starts trimming its own front").
const FILTERED_WINDOW_SLACK: usize = 1000;

pub struct SearchRequest {
    pub user_query: String,
    pub system_query: Option<String>,
    /// Page numbers to return; negative counts from the end. Duplicates
    /// are de-duplicated, out-of-range entries silently skipped.
    pub request_pages: Vec<i64>,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub page_num: i64,
    pub lines: Vec<LogLine>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub filtered_count: usize,
    pub searched_count: usize,
    pub total_count: usize,
    pub max_count: usize,
    pub pages: Vec<SearchPage>,
}

/// Cached compiled query plus the live filtered window it produced.
struct CompiledQuery {
    user_query: String,
    system_query: Option<String>,
    user_searcher: Arc<dyn Searcher>,
    effective_searcher: Arc<dyn Searcher>,
}

struct ManagerState {
    compiled: Option<CompiledQuery>,
    filtered: VecDeque<LogLine>,
    trimmed_lines: u64,
    marked: HashSet<i64>,
}

/// Per-widget search session over one app-run's log ring.
/// `Search`/`OnNewLine` share a single mutex, so a live stream update
/// can never race a full re-search on the same manager.
pub struct SearchManager {
    pub app_run_id: AppRunId,
    pub widget_id: String,
    peer: Arc<AppRunPeer>,
    window_bound: usize,
    events: EventHub,
    state: Mutex<ManagerState>,
}

impl SearchManager {
    pub fn new(peer: Arc<AppRunPeer>, widget_id: String, ring_capacity: usize, events: EventHub) -> Self {
        Self {
            app_run_id: peer.app_run_id.clone(),
            widget_id,
            peer,
            window_bound: ring_capacity + FILTERED_WINDOW_SLACK,
            events,
            state: Mutex::new(ManagerState {
                compiled: None,
                filtered: VecDeque::new(),
                trimmed_lines: 0,
                marked: HashSet::new(),
            }),
        }
    }

    pub fn peer(&self) -> &Arc<AppRunPeer> {
        &self.peer
    }

    /// `MergeMarkedLines` — set/unset marks.
    pub async fn merge_marked_lines(&self, marks: impl IntoIterator<Item = (i64, bool)>) {
        let mut state = self.state.lock().await;
        for (line_num, marked) in marks {
            if marked {
                state.marked.insert(line_num);
            } else {
                state.marked.remove(&line_num);
            }
        }
    }

    /// `GetMarkedLogLines` — marked lines, in `lineNum` order.
    pub async fn get_marked_log_lines(&self) -> Vec<LogLine> {
        let state = self.state.lock().await;
        if state.marked.is_empty() {
            return Vec::new();
        }
        let mut lines: Vec<LogLine> =
            self.peer.logs.get_all().await.into_iter().filter(|l| state.marked.contains(&l.line_num)).collect();
        lines.sort_by_key(|l| l.line_num);
        lines
    }

    /// `Search(req) -> result`. Re-parses and re-evaluates
    /// over the full retained log window when `(userQuery, systemQuery)`
    /// differs from the cached pair; a malformed query poisons the
    /// cache so the next request re-parses rather than reusing stale
    /// compiled state.
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResult, QueryError> {
        let mut state = self.state.lock().await;

        let cache_hit = state
            .compiled
            .as_ref()
            .is_some_and(|c| c.user_query == req.user_query && c.system_query == req.system_query);

        if !cache_hit {
            match Self::compile(&req.user_query, req.system_query.as_deref()) {
                Ok(compiled) => {
                    let all = self.peer.logs.get_all().await;
                    let marked = state.marked.clone();
                    let ctx = SearchContext { marked: &marked, user_query: Some(compiled.user_searcher.as_ref()) };
                    let mut filtered = VecDeque::new();
                    for line in &all {
                        let mut obj = crate::search::query::SearchObject::new(line);
                        if compiled.effective_searcher.matches(&ctx, &mut obj) {
                            filtered.push_back(line.clone());
                        }
                    }
                    let mut trimmed_lines = 0u64;
                    while filtered.len() > self.window_bound {
                        filtered.pop_front();
                        trimmed_lines += 1;
                    }
                    state.compiled = Some(compiled);
                    state.filtered = filtered;
                    state.trimmed_lines = trimmed_lines;
                }
                Err(err) => {
                    // Poison the cache: force a re-parse on the next call.
                    state.compiled = None;
                    return Err(err);
                }
            }
        }

        let (total_count, _oldest) = self.peer.logs.total_and_oldest().await;
        let searched_count = self.peer.logs.size().await;
        let filtered_count = state.filtered.len();
        let pages = Self::paginate(&state.filtered, &req.request_pages, req.page_size);

        Ok(SearchResult {
            filtered_count,
            searched_count,
            total_count: total_count as usize,
            max_count: self.window_bound,
            pages,
        })
    }

    /// `OnNewLine(line)` — called for each newly ingested log line
    ///. Evaluated against the currently cached query only;
    /// a manager that has never run `Search` has no compiled query to
    /// evaluate against yet, so new lines are dropped until one does.
    pub async fn on_new_line(&self, line: LogLine) {
        let mut state = self.state.lock().await;
        let Some(compiled) = state.compiled.as_ref() else { return };

        let marked = state.marked.clone();
        let ctx = SearchContext { marked: &marked, user_query: Some(compiled.user_searcher.as_ref()) };
        let mut obj = crate::search::query::SearchObject::new(&line);
        if !compiled.effective_searcher.matches(&ctx, &mut obj) {
            return;
        }

        state.filtered.push_back(line.clone());
        let mut trimmed = false;
        if state.filtered.len() > self.window_bound {
            state.filtered.pop_front();
            state.trimmed_lines += 1;
            trimmed = true;
        }
        let filtered_count = state.filtered.len();
        let trimmed_lines = state.trimmed_lines;
        drop(state);

        let searched_count = self.peer.logs.size().await;
        let (total_count, _) = self.peer.logs.total_and_oldest().await;
        debug!(widget_id = %self.widget_id, trimmed, "search manager streamed a new line");
        self.events.publish(ServerEvent::StreamUpdate {
            app_run_id: self.app_run_id.clone(),
            widget_id: self.widget_id.clone(),
            filtered_count,
            searched_count,
            total_count: total_count as usize,
            trimmed_lines,
            // Absolute index of the newly matched line across every match
            // this manager has ever seen, trimmed or not.
            offset: trimmed_lines as usize + filtered_count - 1,
            lines: vec![line],
        });
    }

    fn compile(user_query: &str, system_query: Option<&str>) -> Result<CompiledQuery, QueryError> {
        let user_searcher: Arc<dyn Searcher> = Arc::from(compile_query(user_query)?);
        let effective_searcher: Arc<dyn Searcher> = match system_query {
            Some(sq) => Arc::from(compile_query(sq)?),
            None => user_searcher.clone(),
        };
        Ok(CompiledQuery {
            user_query: user_query.to_string(),
            system_query: system_query.map(str::to_string),
            user_searcher,
            effective_searcher,
        })
    }

    fn paginate(filtered: &VecDeque<LogLine>, request_pages: &[i64], page_size: usize) -> Vec<SearchPage> {
        if page_size == 0 || filtered.is_empty() {
            return Vec::new();
        }
        let total_pages = ((filtered.len() + page_size - 1) / page_size) as i64;
        let mut seen = HashSet::new();
        let mut pages = Vec::new();
        for &requested in request_pages {
            let resolved = if requested < 0 { total_pages + requested } else { requested };
            if resolved < 0 || resolved >= total_pages || !seen.insert(resolved) {
                continue;
            }
            let start = resolved as usize * page_size;
            let end = (start + page_size).min(filtered.len());
            let lines: Vec<LogLine> = filtered.iter().skip(start).take(end - start).cloned().collect();
            pages.push(SearchPage { page_num: resolved, lines });
        }
        pages
    }
}

/// Listens for ring appends on `peer` and feeds them to `manager`'s
/// `OnNewLine`. Runs out-of-band via `AppRunPeer`'s own notification
/// channel so the ingest path never has to know `SearchManager` exists.
pub async fn run_live_feed(manager: Arc<SearchManager>) {
    let mut rx = manager.peer().subscribe();
    let mut last_seen = manager.peer().logs.total_and_oldest().await.0;
    loop {
        match rx.recv().await {
            Ok(PeerEvent::Appended(outrig_protocol::PacketKind::Log)) => {
                let (total, _) = manager.peer().logs.total_and_oldest().await;
                if total <= last_seen {
                    continue;
                }
                for line in manager.peer().logs.get_range(last_seen, total).await {
                    manager.on_new_line(line).await;
                }
                last_seen = total;
            }
            Ok(PeerEvent::Done) => break,
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                // Missed some notifications; catch up by re-pulling the
                // whole delta since last_seen on the next tick.
                let (total, _) = manager.peer().logs.total_and_oldest().await;
                for line in manager.peer().logs.get_range(last_seen, total).await {
                    manager.on_new_line(line).await;
                }
                last_seen = total;
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
