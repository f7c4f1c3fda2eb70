// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1–S3: log search basic, regex vs. exact case, and live streaming.

use std::sync::Arc;

use outrig_server::events::ServerEvent;
use outrig_server::search::{SearchManager, SearchRequest};
use outrig_specs::{log_line, peer_with_lines};

fn request(query: &str) -> SearchRequest {
    SearchRequest { user_query: query.to_string(), system_query: None, request_pages: vec![0], page_size: 100 }
}

#[tokio::test]
async fn s1_log_search_basic() {
    let peer = peer_with_lines(
        100,
        &["connecting to db", "db ready", "user login ok", "ERROR db timeout", "retrying db"],
    )
    .await;
    let manager = SearchManager::new(peer, "w1".to_string(), 100, outrig_server::EventHub::new());

    let result = manager.search(request("db")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 4);
    assert_eq!(result.searched_count, 5);
    let msgs: Vec<&str> = result.pages[0].lines.iter().map(|l| l.msg.as_str()).collect();
    assert_eq!(msgs, vec!["connecting to db", "db ready", "ERROR db timeout", "retrying db"]);

    let result = manager.search(request("error db")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 1);
    assert_eq!(result.pages[0].lines[0].msg, "ERROR db timeout");

    let result = manager.search(request("login | timeout")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 2);
    let msgs: Vec<&str> = result.pages[0].lines.iter().map(|l| l.msg.as_str()).collect();
    assert_eq!(msgs, vec!["user login ok", "ERROR db timeout"]);

    let result = manager.search(request("-db")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 1);
    assert_eq!(result.pages[0].lines[0].msg, "user login ok");
}

#[tokio::test]
async fn s2_regex_vs_exact_case() {
    let peer = peer_with_lines(100, &["Error: X", "error: y"]).await;
    let manager = SearchManager::new(peer, "w1".to_string(), 100, outrig_server::EventHub::new());

    let result = manager.search(request("Error:")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 2);

    let result = manager.search(request("'Error:'")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 1);
    assert_eq!(result.pages[0].lines[0].msg, "Error: X");

    let result = manager.search(request("/^error:/")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 2);

    let result = manager.search(request("c/^Error:/")).await.expect("query should parse");
    assert_eq!(result.filtered_count, 1);
    assert_eq!(result.pages[0].lines[0].msg, "Error: X");
}

#[tokio::test]
async fn s3_streaming_emits_increasing_filtered_counts() {
    let peer = Arc::new(outrig_server::AppRunPeer::new(
        outrig_protocol::AppRunId::generate(),
        100,
    ));
    let hub = outrig_server::EventHub::new();
    let mut events = hub.subscribe();
    let manager = Arc::new(SearchManager::new(peer.clone(), "w1".to_string(), 100, hub));

    manager.search(request("boom")).await.expect("query should parse");

    for (i, msg) in ["ok", "boom!", "ok", "boom boom"].iter().enumerate() {
        let line = log_line(i as i64, msg);
        peer.ingest(outrig_protocol::PacketBody::Log(line.clone())).await;
        manager.on_new_line(line).await;
    }

    let first = events.recv().await.expect("first stream update");
    match first {
        ServerEvent::StreamUpdate { filtered_count, searched_count, lines, .. } => {
            assert_eq!(filtered_count, 1);
            assert_eq!(searched_count, 2);
            assert_eq!(lines[0].msg, "boom!");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let second = events.recv().await.expect("second stream update");
    match second {
        ServerEvent::StreamUpdate { filtered_count, searched_count, lines, .. } => {
            assert_eq!(filtered_count, 2);
            assert_eq!(searched_count, 4);
            assert_eq!(lines[0].msg, "boom boom");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
