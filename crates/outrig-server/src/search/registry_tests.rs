// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::apprun::AppRunRegistry;
use crate::events::EventHub;

fn new_registry() -> (Arc<AppRunRegistry>, SearchManagerRegistry) {
    let apprun_registry = Arc::new(AppRunRegistry::new(16, EventHub::new()));
    let registry = SearchManagerRegistry::new(apprun_registry.clone(), EventHub::new(), 16);
    (apprun_registry, registry)
}

#[tokio::test]
async fn unknown_app_run_is_rejected() {
    let (_apprun, registry) = new_registry();
    let err = registry.get_or_create(AppRunId::generate(), "w1".to_string()).await.unwrap_err();
    assert_eq!(err, ServerError::UnknownAppRun);
}

#[tokio::test]
async fn reuses_manager_for_same_key() {
    let (apprun, registry) = new_registry();
    let id = AppRunId::generate();
    apprun.get_or_create(id.clone()).await;

    let a = registry.get_or_create(id.clone(), "w1".to_string()).await.expect("app run is registered");
    let b = registry.get_or_create(id.clone(), "w1".to_string()).await.expect("app run is registered");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn distinct_widgets_get_distinct_managers() {
    let (apprun, registry) = new_registry();
    let id = AppRunId::generate();
    apprun.get_or_create(id.clone()).await;

    registry.get_or_create(id.clone(), "w1".to_string()).await.expect("app run is registered");
    registry.get_or_create(id.clone(), "w2".to_string()).await.expect("app run is registered");
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn evicts_oldest_when_over_capacity() {
    let (apprun, registry) = new_registry();
    let id = AppRunId::generate();
    apprun.get_or_create(id.clone()).await;

    for i in 0..DEFAULT_MAX_MANAGERS {
        registry.get_or_create(id.clone(), format!("w{i}")).await.expect("app run is registered");
    }
    assert_eq!(registry.len().await, DEFAULT_MAX_MANAGERS);

    // One more over capacity evicts the oldest-lastUsed entry (w0, since
    // none are idle past the threshold yet) to make room.
    registry.get_or_create(id.clone(), "overflow".to_string()).await.expect("app run is registered");
    assert_eq!(registry.len().await, DEFAULT_MAX_MANAGERS);
}

#[tokio::test]
async fn sweep_idle_evicts_managers_past_the_threshold() {
    let (apprun, registry) = new_registry();
    let id = AppRunId::generate();
    apprun.get_or_create(id.clone()).await;
    registry.get_or_create(id.clone(), "w1".to_string()).await.expect("app run is registered");

    {
        let mut entries = registry.entries.write().await;
        for entry in entries.values_mut() {
            *entry.last_used.lock() = Instant::now() - Duration::from_secs(120);
        }
    }

    registry.sweep_idle().await;
    assert_eq!(registry.len().await, 0);
}
