//! Durability behavior of the ledger against slow and failing storage.

use std::sync::Arc;
use std::time::Duration;

use tally_ledger::codec::decode_items;
use tally_ledger::{Change, Field, LedgerConfig, LedgerError, LedgerEvent, LedgerStore};
use tally_store::testing::ControlledAdapter;
use tally_store::{FileAdapter, InMemoryAdapter};
use tally_types::{Item, ItemId};

fn controlled() -> (Arc<ControlledAdapter>, LedgerStore<ControlledAdapter>) {
    let adapter = Arc::new(ControlledAdapter::new());
    let store = LedgerStore::new(Arc::clone(&adapter), LedgerConfig::no_backoff());
    (adapter, store)
}

fn persisted(adapter: &ControlledAdapter) -> Vec<Item> {
    decode_items(&adapter.blob().expect("blob should exist")).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn book_revenue_scenario() {
    let (adapter, store) = controlled();
    assert_eq!(store.load().await.unwrap(), 0);

    let book_a = store.add("Book A", 500).unwrap().await.unwrap();
    let book_b = store.add("Book B", 300).unwrap().await.unwrap();
    for _ in 0..3 {
        store.increment(&book_a.id).unwrap().await.unwrap();
    }
    let b_after = store.decrement(&book_b.id).unwrap().await.unwrap();

    assert_eq!(b_after.count, 0);
    assert_eq!(store.total_revenue(), 500 * 3 + 300 * 0);
    assert_eq!(persisted(&adapter), store.snapshot());
}

#[tokio::test]
async fn empty_name_is_rejected_without_state_change() {
    let (adapter, store) = controlled();
    store.add("Existing", 10).unwrap().await.unwrap();
    let attempts = adapter.write_attempts();

    let err = store.add("", 100).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: Field::Name, .. }));
    assert_eq!(store.len(), 1);

    store.flush().await.unwrap();
    assert_eq!(adapter.write_attempts(), attempts);
}

#[tokio::test]
async fn removed_item_is_gone_for_every_mutation() {
    let (_adapter, store) = controlled();
    let item = store.add("Temp", 1).unwrap().await.unwrap();
    store.remove(&item.id).unwrap().await.unwrap();

    let not_found = LedgerError::NotFound {
        id: item.id.clone(),
    };
    assert_eq!(store.increment(&item.id).unwrap_err(), not_found);
    assert_eq!(store.decrement(&item.id).unwrap_err(), not_found);
    assert_eq!(store.update(&item.id, "Again", 2).unwrap_err(), not_found);
    assert_eq!(store.remove(&item.id).unwrap_err(), not_found);
}

// ---------------------------------------------------------------------------
// Overlapping writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_increments_both_persist() {
    let (adapter, store) = controlled();
    let item = store.add("X", 100).unwrap().await.unwrap();
    adapter.pause_writes();

    let first = store.increment(&item.id).unwrap();
    let second = store.increment(&item.id).unwrap();
    assert_eq!(store.get(&item.id).unwrap().count, 2);

    tokio::task::yield_now().await;
    assert_eq!(persisted(&adapter)[0].count, 0);

    adapter.resume_writes();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(persisted(&adapter)[0].count, 2);
}

#[tokio::test]
async fn rapid_increments_against_slow_storage_lose_nothing() {
    const N: u64 = 25;
    let (adapter, store) = controlled();
    let item = store.add("Hot item", 40).unwrap().await.unwrap();
    adapter.set_write_delay(Duration::from_millis(2));

    let tickets: Vec<_> = (0..N)
        .map(|_| store.increment(&item.id).unwrap())
        .collect();
    for ticket in tickets {
        ticket.await.unwrap();
    }

    assert_eq!(persisted(&adapter)[0].count, N);
    assert_eq!(store.total_revenue(), 40 * N);
}

#[tokio::test]
async fn increments_on_different_items_both_persist() {
    let (adapter, store) = controlled();
    let a = store.add("A", 1).unwrap().await.unwrap();
    let b = store.add("B", 1).unwrap().await.unwrap();
    adapter.push_write_delays([Duration::from_millis(30), Duration::from_millis(1)]);

    let ta = store.increment(&a.id).unwrap();
    let tb = store.increment(&b.id).unwrap();
    tb.await.unwrap();
    ta.await.unwrap();

    let items = persisted(&adapter);
    assert_eq!(items[0].count, 1);
    assert_eq!(items[1].count, 1);
}

#[tokio::test]
async fn writes_execute_in_mutation_order() {
    let (adapter, store) = controlled();
    let item = store.add("Seq", 1).unwrap().await.unwrap();
    adapter.push_write_delays((0..10).map(|i| Duration::from_millis(10 - i)));

    let tickets: Vec<_> = (0..10)
        .map(|_| store.increment(&item.id).unwrap())
        .collect();
    for ticket in tickets {
        ticket.await.unwrap();
    }

    // Every blob reflects at least as many increments as the one before it.
    let counts: Vec<u64> = adapter
        .history()
        .iter()
        .map(|blob| decode_items(blob).unwrap()[0].count)
        .collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "counts: {counts:?}");
    assert_eq!(*counts.last().unwrap(), 10);
}

#[tokio::test]
async fn mutations_are_visible_before_their_write() {
    let (adapter, store) = controlled();
    adapter.pause_writes();

    let ticket = store.add("Pending", 9).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.snapshot()[0].name, "Pending");
    assert!(adapter.blob().is_none());

    adapter.resume_writes();
    ticket.await.unwrap();
    assert_eq!(persisted(&adapter).len(), 1);
}

// ---------------------------------------------------------------------------
// Write failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_failure_is_retried() {
    let (adapter, store) = controlled();
    adapter.fail_next_writes(1);

    let item = store.add("Retry", 5).unwrap().await.unwrap();
    assert_eq!(adapter.write_attempts(), 2);
    assert_eq!(persisted(&adapter), vec![item]);
    store.flush().await.unwrap();
}

#[tokio::test]
async fn exhausted_retry_surfaces_but_keeps_memory() {
    let (adapter, store) = controlled();
    adapter.fail_next_writes(2);

    let ticket = store.add("Unlucky", 5).unwrap();
    let revision = ticket.revision();
    let err = ticket.await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::PersistenceWriteFailed {
            revision,
            attempts: 2,
            reason: "injected failure: write attempt 2 failed".into(),
        }
    );
    assert!(err.is_durability_warning());
    assert_eq!(store.len(), 1);
    assert!(adapter.blob().is_none());
    assert!(store.flush().await.is_err());

    // The next successful write carries the earlier change too.
    store.add("Lucky", 6).unwrap().await.unwrap();
    store.flush().await.unwrap();
    let names: Vec<_> = persisted(&adapter).into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["Unlucky", "Lucky"]);
}

#[tokio::test]
async fn dropped_ticket_failure_is_parked() {
    let (adapter, store) = controlled();
    adapter.fail_next_writes(2);

    let _ = store.add("Detached", 1).unwrap().into_value();
    assert!(matches!(
        store.flush().await,
        Err(LedgerError::PersistenceWriteFailed { .. })
    ));
    assert!(matches!(
        store.take_write_failure(),
        Some(LedgerError::PersistenceWriteFailed { .. })
    ));
    assert!(store.take_write_failure().is_none());
    store.flush().await.unwrap();
}

#[tokio::test]
async fn retry_count_is_configurable() {
    let adapter = Arc::new(ControlledAdapter::new());
    let config = LedgerConfig {
        write_retries: 3,
        ..LedgerConfig::no_backoff()
    };
    let store = LedgerStore::new(Arc::clone(&adapter), config);
    adapter.fail_next_writes(3);

    store.add("Stubborn", 1).unwrap().await.unwrap();
    assert_eq!(adapter.write_attempts(), 4);
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_round_trips_through_a_fresh_ledger() {
    let adapter = Arc::new(ControlledAdapter::new());
    let expected = {
        let store = LedgerStore::new(Arc::clone(&adapter), LedgerConfig::no_backoff());
        let a = store.add("A", 100).unwrap().await.unwrap();
        let b = store.add("B", 200).unwrap().await.unwrap();
        let c = store.add("C", 300).unwrap().await.unwrap();
        store.increment(&c.id).unwrap().await.unwrap();
        store.update(&a.id, "A+", 150).unwrap().await.unwrap();
        store.remove(&b.id).unwrap().await.unwrap();
        let snapshot = store.snapshot();
        store.close().await.unwrap();
        snapshot
    };

    let reopened = LedgerStore::new(Arc::clone(&adapter), LedgerConfig::no_backoff());
    assert_eq!(reopened.load().await.unwrap(), 2);
    assert_eq!(reopened.snapshot(), expected);
    assert!(!reopened.is_degraded());
}

#[tokio::test]
async fn failed_read_degrades_but_keeps_writing() {
    let (adapter, store) = controlled();
    adapter.set_fail_reads(true);

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, LedgerError::PersistenceUnavailable(_)));
    assert!(store.is_degraded());
    assert!(store.is_empty());

    store.add("Offline", 1).unwrap().await.unwrap();
    assert_eq!(persisted(&adapter).len(), 1);
}

#[tokio::test]
async fn corrupt_blob_degrades() {
    let adapter = Arc::new(ControlledAdapter::with_blob(b"{not json".to_vec()));
    let store = LedgerStore::new(Arc::clone(&adapter), LedgerConfig::no_backoff());

    let err = store.load().await.unwrap_err();
    assert!(err.to_string().contains("corrupt"));
    assert!(store.is_degraded());
}

#[tokio::test]
async fn successful_load_clears_degraded_mode() {
    let (adapter, store) = controlled();
    adapter.set_fail_reads(true);
    assert!(store.load().await.is_err());

    adapter.set_fail_reads(false);
    store.load().await.unwrap();
    assert!(!store.is_degraded());
}

#[tokio::test]
async fn legacy_blob_loads() {
    let blob = br#"[{"id":"1712345678901k3j9","name":"Tea","price":300},{"id":"1712345678999zz","name":"Cake","price":450,"count":2}]"#;
    let adapter = Arc::new(InMemoryAdapter::with_blob(blob.to_vec()));
    let store = LedgerStore::new(adapter, LedgerConfig::default());

    assert_eq!(store.load().await.unwrap(), 2);
    assert_eq!(store.total_revenue(), 900);

    let tea = ItemId::parse("1712345678901k3j9").unwrap();
    let tea = store.increment(&tea).unwrap().await.unwrap();
    assert_eq!(tea.count, 1);
}

#[tokio::test]
async fn load_waits_for_queued_writes() {
    let (adapter, store) = controlled();
    adapter.set_write_delay(Duration::from_millis(5));
    let item = store.add("Slow", 1).unwrap().into_value();
    let _ = store.increment(&item.id).unwrap();

    store.load().await.unwrap();
    assert_eq!(store.get(&item.id).unwrap().count, 1);
}

#[tokio::test]
async fn file_backed_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FileAdapter::new(dir.path(), "items").unwrap());
    let store = LedgerStore::new(Arc::clone(&adapter), LedgerConfig::default());
    store.load().await.unwrap();
    let item = store.add("Notebook", 250).unwrap().await.unwrap();
    store.increment(&item.id).unwrap().await.unwrap();
    store.close().await.unwrap();

    let reopened = LedgerStore::new(adapter, LedgerConfig::default());
    reopened.load().await.unwrap();
    assert_eq!(reopened.get(&item.id).unwrap().count, 1);
    assert_eq!(reopened.total_revenue(), 250);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribers_see_changes_and_writes() {
    let (adapter, store) = controlled();
    let mut events = store.subscribe();

    store.load().await.unwrap();
    let item = store.add("Watched", 1).unwrap().await.unwrap();
    adapter.fail_next_writes(2);
    let _ = store.increment(&item.id).unwrap().await;

    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::Loaded {
            items: 0,
            degraded: false
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::Changed {
            revision: 1,
            change: Change::Added(item.id.clone())
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::Persisted {
            revision: 1,
            serialized: 1
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::Changed {
            revision: 2,
            change: Change::Incremented(item.id.clone())
        }
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        LedgerEvent::WriteFailed { revision: 2, .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn changed_always_precedes_persisted_across_threads() {
    for round in 0..200 {
        let adapter = Arc::new(InMemoryAdapter::new());
        let store = LedgerStore::new(adapter, LedgerConfig::no_backoff());
        let mut events = store.subscribe();

        let item = store.add("Racy", 1).unwrap().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            LedgerEvent::Changed {
                revision: 1,
                change: Change::Added(item.id.clone())
            },
            "round {round}"
        );
        assert_eq!(
            events.recv().await.unwrap(),
            LedgerEvent::Persisted {
                revision: 1,
                serialized: 1
            },
            "round {round}"
        );
    }
}
