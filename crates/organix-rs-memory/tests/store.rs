use chrono::Duration;
use futures_util::future::join_all;
use organix_rs_config::MemoryConfig;
use organix_rs_memory::{FileMemoryBackend, MemoryKind, MemoryStore, Metadata};
use organix_rs_test_utils::{clock_at, memory_store_with_clock};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn added_records_are_found_by_timeframe_for_every_kind_and_importance() {
    let clock = clock_at(2023, 6, 1);
    let store = memory_store_with_clock(clock.clone()).await;

    for kind in MemoryKind::ALL {
        for importance in 1..=5u8 {
            let content = format!("{kind} memory at importance {importance}");
            let id = store
                .add(kind, content.clone(), Metadata::new(), importance)
                .await
                .expect("add");
            let created_at = store.get(id).expect("record").created_at;

            let found = store
                .retrieve_by_timeframe(created_at, Some(created_at), Some(kind), 100)
                .await
                .expect("timeframe");
            assert!(found.iter().any(|record| record.content == content));
            clock.advance(Duration::seconds(1));
        }
    }
    assert_eq!(store.len(), 15);
}

#[tokio::test]
async fn concurrent_adds_produce_distinct_ids_without_lost_writes() {
    let temp = tempdir().expect("tempdir");
    let backend = Arc::new(FileMemoryBackend::new(temp.path()).expect("backend"));
    let store = Arc::new(
        MemoryStore::builder(MemoryConfig::default())
            .backend(backend.clone())
            .build()
            .await
            .expect("store"),
    );

    let handles = (0..100)
        .map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                let kind = MemoryKind::ALL[n % 3];
                store
                    .add(kind, format!("concurrent note {n}"), Metadata::new(), 2)
                    .await
            })
        })
        .collect::<Vec<_>>();
    let ids = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("join").expect("add"))
        .collect::<HashSet<_>>();

    assert_eq!(ids.len(), 100);
    assert_eq!(store.len(), 100);
    assert_eq!(store.stats().total, 100);

    let reopened = MemoryStore::builder(MemoryConfig::default())
        .backend(Arc::new(FileMemoryBackend::new(temp.path()).expect("backend")))
        .build()
        .await
        .expect("reopen");
    assert_eq!(reopened.len(), 100);
}

#[tokio::test]
async fn important_facts_survive_pruning_and_chatter_does_not() {
    let clock = clock_at(2023, 6, 1);
    let store = memory_store_with_clock(clock.clone()).await;

    let paris = store
        .add(
            MemoryKind::Semantic,
            "Paris is the capital of France",
            Metadata::new(),
            5,
        )
        .await
        .expect("add");
    clock.advance(Duration::days(365 * 2 - 31));
    let hello = store
        .add(MemoryKind::Episodic, "said hello", Metadata::new(), 1)
        .await
        .expect("add");
    clock.advance(Duration::days(31));

    let removed = store.prune(Some(30)).await.expect("prune");

    assert_eq!(removed, 1);
    assert!(store.get(paris).is_some());
    assert!(store.get(hello).is_none());
    assert!(
        store
            .get(paris)
            .map(|record| record.importance.get() >= 4)
            .unwrap_or(false)
    );
}

#[tokio::test]
async fn frequently_recalled_memories_are_kept() {
    let clock = clock_at(2023, 6, 1);
    let store = memory_store_with_clock(clock.clone()).await;
    let id = store
        .add(MemoryKind::Episodic, "favourite editor is helix", Metadata::new(), 1)
        .await
        .expect("add");
    for _ in 0..6 {
        store.clear_cache();
        store
            .retrieve_relevant("which editor is favourite", None, 3, 0)
            .await
            .expect("recall");
    }
    assert_eq!(store.get(id).expect("record").access_count, 6);

    clock.advance(Duration::days(60));
    assert_eq!(store.prune(Some(30)).await.expect("prune"), 0);
}

#[tokio::test]
async fn records_survive_restart() {
    let temp = tempdir().expect("tempdir");
    let config = MemoryConfig {
        path: Some(temp.path().display().to_string()),
        ..MemoryConfig::default()
    };

    let store = MemoryStore::open(&config).await.expect("open");
    let id = store
        .add(MemoryKind::Procedural, "ran cargo fmt", Metadata::new(), 2)
        .await
        .expect("add");
    store.set_importance(id, 3).await.expect("importance");
    let deleted = store
        .add(MemoryKind::Procedural, "temporary", Metadata::new(), 1)
        .await
        .expect("add");
    store.delete(deleted).await.expect("delete");
    drop(store);

    let reopened = MemoryStore::open(&config).await.expect("reopen");
    assert_eq!(reopened.len(), 1);
    let record = reopened.get(id).expect("record");
    assert_eq!(record.content, "ran cargo fmt");
    assert_eq!(record.importance.get(), 3);
}

#[tokio::test]
async fn store_reembeds_when_dimensions_change() {
    let temp = tempdir().expect("tempdir");
    let small = MemoryConfig {
        path: Some(temp.path().display().to_string()),
        embedding_dimensions: 16,
        ..MemoryConfig::default()
    };
    let store = MemoryStore::open(&small).await.expect("open");
    let id = store
        .add(MemoryKind::Semantic, "vectors get resized", Metadata::new(), 2)
        .await
        .expect("add");
    drop(store);

    let large = MemoryConfig {
        embedding_dimensions: 64,
        ..small
    };
    let reopened = MemoryStore::open(&large).await.expect("reopen");
    assert_eq!(reopened.get(id).expect("record").embedding.len(), 64);
    let hits = reopened
        .retrieve_relevant("resized vectors", None, 1, 0)
        .await
        .expect("recall");
    assert_eq!(hits.len(), 1);
}
