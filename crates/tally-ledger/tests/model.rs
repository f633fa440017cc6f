//! Property tests: random mutation sequences against a plain `Vec` model.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tally_ledger::codec::decode_items;
use tally_ledger::{LedgerConfig, LedgerStore};
use tally_store::testing::ControlledAdapter;
use tally_types::Item;

#[derive(Clone, Debug)]
enum Op {
    Add(String, u64),
    Update(usize, String, u64),
    Increment(usize),
    Decrement(usize),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        ("[a-z]{1,8}", 0u64..1_000).prop_map(|(n, p)| Op::Add(n, p)),
        (any::<usize>(), "[a-z]{1,8}", 0u64..1_000).prop_map(|(i, n, p)| Op::Update(i, n, p)),
        any::<usize>().prop_map(Op::Increment),
        any::<usize>().prop_map(Op::Increment),
        any::<usize>().prop_map(Op::Decrement),
        any::<usize>().prop_map(Op::Remove),
    ]
}

/// Run `ops` against a ledger with jittery storage; return
/// (ledger snapshot, persisted items, expected revenue, model items).
fn run(ops: Vec<Op>, delays: Vec<u64>) -> (Vec<Item>, Vec<Item>, u64, Vec<Item>) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async move {
        let adapter = Arc::new(ControlledAdapter::new());
        adapter.push_write_delays(delays.into_iter().map(Duration::from_micros));
        let store = LedgerStore::new(Arc::clone(&adapter), LedgerConfig::no_backoff());

        let mut model: Vec<Item> = Vec::new();
        let mut tickets = Vec::new();

        for op in ops {
            match op {
                Op::Add(name, price) => {
                    let ticket = store.add(&name, price).unwrap();
                    model.push(ticket.value().clone());
                    tickets.push(ticket);
                }
                Op::Update(i, name, price) if !model.is_empty() => {
                    let idx = i % model.len();
                    tickets.push(store.update(&model[idx].id, &name, price).unwrap());
                    model[idx].name = name;
                    model[idx].price = price;
                }
                Op::Increment(i) if !model.is_empty() => {
                    let idx = i % model.len();
                    tickets.push(store.increment(&model[idx].id).unwrap());
                    model[idx].count += 1;
                }
                Op::Decrement(i) if !model.is_empty() => {
                    let idx = i % model.len();
                    tickets.push(store.decrement(&model[idx].id).unwrap());
                    model[idx].count = model[idx].count.saturating_sub(1);
                }
                Op::Remove(i) if !model.is_empty() => {
                    let idx = i % model.len();
                    tickets.push(store.remove(&model[idx].id).unwrap());
                    model.remove(idx);
                }
                _ => {}
            }
        }

        for ticket in tickets {
            ticket.await.unwrap();
        }
        store.flush().await.unwrap();

        let expected_revenue = model.iter().map(|i| i.price * i.count).sum();
        let persisted = adapter
            .blob()
            .map(|blob| decode_items(&blob).unwrap())
            .unwrap_or_default();
        (store.snapshot(), persisted, expected_revenue, model)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_matches_model(
        ops in proptest::collection::vec(op(), 0..40),
        delays in proptest::collection::vec(0u64..300, 0..40),
    ) {
        let (snapshot, persisted, expected_revenue, model) = run(ops, delays);
        prop_assert_eq!(&snapshot, &model);
        prop_assert_eq!(&persisted, &model);
        prop_assert_eq!(tally_types::total_revenue(&snapshot), expected_revenue);
        prop_assert!(snapshot.iter().all(|i| !i.name.is_empty()));
    }
}
