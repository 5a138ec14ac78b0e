//! Integration tests for cache/store consistency of CatalogService.

use std::sync::Arc;

use chrono::NaiveDate;
use folio_cache::testing::FailingCache;
use folio_catalog::{
    BookDraft, BookId, BookStore, BookUpdate, CacheKey, CachedValue, CatalogError, CatalogService,
    SharedStore,
};
use folio_store::MemoryStore;
use folio_store::testing::{CountingStore, FlakyStore, ReadGate};
use proptest::prelude::*;

fn draft(title: &str) -> BookDraft {
    BookDraft::new(
        title,
        "Test Author",
        "123-1234567890",
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
    )
}

fn counting_catalog() -> (Arc<CountingStore<MemoryStore>>, Arc<CatalogService>) {
    let store = Arc::new(CountingStore::new(MemoryStore::new()));
    let shared: SharedStore = store.clone();
    (store, Arc::new(CatalogService::with_memory_cache(shared)))
}

#[tokio::test]
async fn test_repeated_get_reads_store_once() {
    let (store, catalog) = counting_catalog();
    let book = store.insert(draft("Cached")).await.unwrap();

    for _ in 0..3 {
        assert_eq!(catalog.get_by_id(&book.id).await.unwrap(), book);
    }

    assert_eq!(store.calls().find_by_id, 1);
    let stats = catalog.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[tokio::test]
async fn test_repeated_list_reads_store_once() {
    let (store, catalog) = counting_catalog();
    store.insert(draft("One")).await.unwrap();

    assert_eq!(catalog.list_all().await.unwrap().len(), 1);
    assert_eq!(catalog.list_all().await.unwrap().len(), 1);
    assert_eq!(store.calls().find_all, 1);
}

#[tokio::test]
async fn test_create_invalidates_listing() {
    let (_store, catalog) = counting_catalog();
    assert!(catalog.list_all().await.unwrap().is_empty());

    let book = catalog.create(draft("Fresh")).await.unwrap();

    let listed = catalog.list_all().await.unwrap();
    assert_eq!(listed.as_slice(), &[book]);
}

#[tokio::test]
async fn test_update_invalidates_listing() {
    let (_store, catalog) = counting_catalog();
    let book = catalog.create(draft("Old Title")).await.unwrap();
    catalog.list_all().await.unwrap();

    catalog
        .update(&book.id, BookUpdate::new().with_title("New Title"))
        .await
        .unwrap();

    let listed = catalog.list_all().await.unwrap();
    assert_eq!(listed[0].title, "New Title");
}

#[tokio::test]
async fn test_update_of_uncached_record_refreshes_cache() {
    let (store, catalog) = counting_catalog();
    let book = store.insert(draft("Direct")).await.unwrap();

    let updated = catalog
        .update(&book.id, BookUpdate::new().with_author("Someone Else"))
        .await
        .unwrap();

    assert_eq!(catalog.get_by_id(&book.id).await.unwrap(), updated);
    // The update's own store read; the get was served by the write-through
    assert_eq!(store.calls().find_by_id, 1);
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let (_store, catalog) = counting_catalog();
    let book = catalog.create(draft("Doomed")).await.unwrap();
    catalog.get_by_id(&book.id).await.unwrap();
    catalog.list_all().await.unwrap();

    assert!(catalog.delete(&book.id).await.unwrap());

    assert!(catalog.get_by_id(&book.id).await.unwrap_err().is_not_found());
    assert!(catalog.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_noop_delete_still_invalidates_listing() {
    let (store, catalog) = counting_catalog();
    assert!(catalog.list_all().await.unwrap().is_empty());

    // Written behind the catalog's back: the cached listing is now stale
    store.insert(draft("Sneaky")).await.unwrap();
    assert!(catalog.list_all().await.unwrap().is_empty());

    assert!(!catalog.delete(&BookId::new("does-not-exist")).await.unwrap());
    assert_eq!(catalog.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_does_not_resurrect_through_in_flight_read() {
    let (store, catalog) = counting_catalog();
    let book = store.insert(draft("Racy")).await.unwrap();

    // Park a get_by_id after it read the record but before it fills the cache
    let gate = ReadGate::new();
    store.gate_next_read(gate.clone());
    let reader = {
        let catalog = Arc::clone(&catalog);
        let id = book.id.clone();
        tokio::spawn(async move { catalog.get_by_id(&id).await })
    };
    gate.reached.notified().await;

    assert!(catalog.delete(&book.id).await.unwrap());
    gate.release.notify_one();

    // The in-flight read may return what it saw...
    assert_eq!(reader.await.unwrap().unwrap(), book);
    // ...but must not have cached it
    assert!(catalog.get_by_id(&book.id).await.unwrap_err().is_not_found());
    assert_eq!(catalog.cache_stats().rejected_fills, 1);
}

#[tokio::test]
async fn test_overlapping_reads_of_distinct_ids_both_cache() {
    let (store, catalog) = counting_catalog();
    let first = store.insert(draft("First")).await.unwrap();
    let second = store.insert(draft("Second")).await.unwrap();

    // Hold the first read between its store call and its fill
    let gate = ReadGate::new();
    store.gate_next_read(gate.clone());
    let reader = {
        let catalog = Arc::clone(&catalog);
        let id = first.id.clone();
        tokio::spawn(async move { catalog.get_by_id(&id).await })
    };
    gate.reached.notified().await;

    assert_eq!(catalog.get_by_id(&second.id).await.unwrap(), second);
    gate.release.notify_one();
    assert_eq!(reader.await.unwrap().unwrap(), first);

    assert_eq!(catalog.get_by_id(&first.id).await.unwrap(), first);
    assert_eq!(catalog.get_by_id(&second.id).await.unwrap(), second);
    assert_eq!(store.calls().find_by_id, 2);
    assert_eq!(catalog.cache_stats().rejected_fills, 0);
}

#[tokio::test]
async fn test_create_does_not_block_in_flight_read_fill() {
    let (store, catalog) = counting_catalog();
    let existing = store.insert(draft("Existing")).await.unwrap();

    let gate = ReadGate::new();
    store.gate_next_read(gate.clone());
    let reader = {
        let catalog = Arc::clone(&catalog);
        let id = existing.id.clone();
        tokio::spawn(async move { catalog.get_by_id(&id).await })
    };
    gate.reached.notified().await;

    let created = catalog.create(draft("Created")).await.unwrap();
    gate.release.notify_one();
    reader.await.unwrap().unwrap();

    // Both records are now served from the cache
    assert_eq!(catalog.get_by_id(&existing.id).await.unwrap(), existing);
    assert_eq!(catalog.get_by_id(&created.id).await.unwrap(), created);
    assert_eq!(store.calls().find_by_id, 1);
    assert_eq!(catalog.cache_stats().rejected_fills, 0);
}

#[tokio::test]
async fn test_cache_failures_never_fail_requests() {
    let cache = Arc::new(FailingCache::<CacheKey, CachedValue>::new());
    let catalog = CatalogService::new(Arc::new(MemoryStore::new()), cache.clone());

    let book = catalog.create(draft("Resilient")).await.unwrap();
    assert_eq!(catalog.get_by_id(&book.id).await.unwrap(), book);
    assert_eq!(catalog.list_all().await.unwrap().len(), 1);

    let updated = catalog
        .update(&book.id, BookUpdate::new().with_title("Still Fine"))
        .await
        .unwrap();
    assert_eq!(catalog.get_by_id(&book.id).await.unwrap(), updated);

    assert!(catalog.delete(&book.id).await.unwrap());
    assert!(catalog.get_by_id(&book.id).await.unwrap_err().is_not_found());

    assert!(cache.failures() > 0);
    assert!(cache.inner().is_empty());
}

#[tokio::test]
async fn test_cache_recovers_after_outage() {
    let cache = Arc::new(FailingCache::<CacheKey, CachedValue>::new());
    let catalog = CatalogService::new(Arc::new(MemoryStore::new()), cache.clone());
    let book = catalog.create(draft("Later")).await.unwrap();

    cache.set_failing(false);
    catalog.get_by_id(&book.id).await.unwrap();
    catalog.get_by_id(&book.id).await.unwrap();

    assert!(cache.inner().contains(&CacheKey::Record(book.id.clone())));
    assert_eq!(catalog.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_store_read_failure_surfaces_as_unavailable() {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let shared: SharedStore = store.clone();
    let catalog = CatalogService::with_memory_cache(shared);
    let book = store.inner().insert(draft("Unreachable")).await.unwrap();

    store.fail_reads(true);
    let err = catalog.get_by_id(&book.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::StoreUnavailable(_)));
    assert_eq!(err.status_code(), 503);
    assert!(catalog.list_all().await.is_err());

    store.fail_reads(false);
    assert_eq!(catalog.get_by_id(&book.id).await.unwrap(), book);
}

#[tokio::test]
async fn test_store_write_failure_leaves_cache_untouched() {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let shared: SharedStore = store.clone();
    let catalog = CatalogService::with_memory_cache(shared);
    let book = catalog.create(draft("Kept")).await.unwrap();

    store.fail_writes(true);
    assert!(catalog.create(draft("Lost")).await.is_err());
    assert!(
        catalog
            .update(&book.id, BookUpdate::new().with_title("Lost"))
            .await
            .is_err()
    );
    assert!(catalog.delete(&book.id).await.is_err());

    store.fail_writes(false);
    assert_eq!(catalog.get_by_id(&book.id).await.unwrap().title, "Kept");
    assert_eq!(store.inner().len(), 1);
}

#[tokio::test]
async fn test_concurrent_updates_converge_on_store() {
    let (_store, catalog) = counting_catalog();
    let book = catalog.create(draft("Contended")).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let catalog = Arc::clone(&catalog);
        let id = book.id.clone();
        tasks.push(tokio::spawn(async move {
            catalog
                .update(&id, BookUpdate::new().with_title(format!("Title {i}")))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let cached = catalog.get_by_id(&book.id).await.unwrap();
    let stored = catalog.store().find_by_id(&book.id).await.unwrap().unwrap();
    assert_eq!(cached, stored);
}

// ── Property: the cache never answers differently from the store ────

#[derive(Debug, Clone)]
enum Op {
    Create(u8),
    Update(usize, u8),
    Delete(usize),
    Get(usize),
    List,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Create),
        (any::<usize>(), any::<u8>()).prop_map(|(i, t)| Op::Update(i, t)),
        any::<usize>().prop_map(Op::Delete),
        any::<usize>().prop_map(Op::Get),
        Just(Op::List),
    ]
}

fn pick(ids: &[BookId], i: usize) -> BookId {
    if ids.is_empty() {
        BookId::new("missing")
    } else {
        ids[i % ids.len()].clone()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cache_agrees_with_store(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let shared: SharedStore = store.clone();
            let catalog = CatalogService::with_memory_cache(shared);
            let mut ids: Vec<BookId> = Vec::new();

            for op in ops {
                match op {
                    Op::Create(t) => {
                        let book = catalog.create(draft(&format!("Book {t}"))).await.unwrap();
                        ids.push(book.id);
                    }
                    Op::Update(i, t) => {
                        let update = BookUpdate::new().with_title(format!("Renamed {t}"));
                        let _ = catalog.update(&pick(&ids, i), update).await;
                    }
                    Op::Delete(i) => {
                        catalog.delete(&pick(&ids, i)).await.unwrap();
                    }
                    Op::Get(i) => {
                        let _ = catalog.get_by_id(&pick(&ids, i)).await;
                    }
                    Op::List => {
                        catalog.list_all().await.unwrap();
                    }
                }

                for id in &ids {
                    let truth = store.find_by_id(id).await.unwrap();
                    match (truth, catalog.get_by_id(id).await) {
                        (Some(expected), Ok(seen)) => prop_assert_eq!(seen, expected),
                        (None, Err(e)) => prop_assert!(e.is_not_found()),
                        (truth, seen) => prop_assert!(
                            false,
                            "store has {:?} but catalog answered {:?}",
                            truth,
                            seen
                        ),
                    }
                }
                let listed = catalog.list_all().await.unwrap();
                let stored = store.find_all().await.unwrap();
                prop_assert_eq!(listed.as_slice(), stored.as_slice());
            }
            Ok(())
        })?;
    }
}
