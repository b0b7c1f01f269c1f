//! Integration tests for the order ledger under concurrent writers.
//!
//! These tests drive the public `handy_core` API from many Tokio tasks at once
//! and check the ledger's ordering and atomicity guarantees:
//!
//! - Orders to distinct tables all land, each item exactly `count` times, in
//!   per-table submission order.
//! - Orders to the same table never interleave inside one order.
//! - A snapshot taken after an append returns always includes it.

use std::sync::Arc;

use handy_core::{decode_message, ClientMessage, OrderLedger, OrderMessage};

fn validated(table: &str, lines: &[(&str, i64)]) -> handy_core::ValidatedOrder {
    OrderMessage::new(table, lines)
        .validate()
        .expect("fixture order must be valid")
}

/// Many tables, many orders each, all submitted concurrently.
///
/// Each table's orders are submitted sequentially by a single task, so the
/// per-table order of entries must match submission order exactly.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_to_distinct_tables_all_apply() {
    // Arrange
    let ledger = Arc::new(OrderLedger::new());
    let tables = 32;
    let orders_per_table = 20;

    // Act: one task per table.
    let mut handles = Vec::with_capacity(tables);
    for table in 0..tables {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            let table_id = table.to_string();
            for n in 0..orders_per_table {
                let item = format!("item-{n}");
                let order = validated(&table_id, &[(item.as_str(), 2)]);
                ledger.append_order(&order).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task must not panic");
    }

    // Assert
    let snapshot = ledger.snapshot().await;
    assert_eq!(snapshot.len(), tables);
    for table in 0..tables {
        let expected: Vec<String> = (0..orders_per_table)
            .flat_map(|n| std::iter::repeat(format!("item-{n}")).take(2))
            .collect();
        assert_eq!(snapshot[&table.to_string()], expected, "table {table}");
    }
}

/// Two writers hammer the same table with multi-line orders.
///
/// The final sequence must be a concatenation of whole orders: each order's
/// block of entries appears contiguously, never split by the other writer.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_to_same_table_never_interleave() {
    // Arrange
    let ledger = Arc::new(OrderLedger::new());
    let rounds = 200;

    let spawn_writer = |name: &'static str| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for _ in 0..rounds {
                let order = validated("9", &[(name, 3), (name, 2)]);
                ledger.append_order(&order).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    // Act
    let a = spawn_writer("ビール");
    let b = spawn_writer("日本酒");
    a.await.unwrap();
    b.await.unwrap();

    // Assert: walk the sequence in blocks of 5 (one whole order each).
    let snapshot = ledger.snapshot().await;
    let items = &snapshot["9"];
    assert_eq!(items.len(), rounds * 2 * 5);
    for block in items.chunks(5) {
        assert!(
            block.iter().all(|item| item == &block[0]),
            "order split by another writer: {block:?}"
        );
    }
}

/// Readers running alongside writers only ever see whole orders.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshots_never_contain_partial_orders() {
    let ledger = Arc::new(OrderLedger::new());

    let writer = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for _ in 0..500 {
                ledger.append_order(&validated("1", &[("唐揚げ", 4)])).await.unwrap();
            }
        })
    };

    let reader = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for _ in 0..500 {
                let snapshot = ledger.snapshot().await;
                let len = snapshot.get("1").map_or(0, Vec::len);
                assert_eq!(len % 4, 0, "snapshot saw a partial order ({len} entries)");
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(ledger.snapshot().await["1"].len(), 2000);
}

/// Read-after-write: once `append_order` returns, every later snapshot has it.
#[tokio::test]
async fn test_snapshot_after_append_includes_order() {
    let ledger = OrderLedger::new();
    ledger.append_order(&validated("4", &[("刺身", 1)])).await.unwrap();
    assert_eq!(ledger.snapshot().await["4"], vec!["刺身"]);
}

/// The documented wire example, decoded and applied end to end.
#[tokio::test]
async fn test_wire_order_applies_to_ledger() {
    // Arrange
    let ledger = OrderLedger::new();
    let bytes = r#"{"type":"order","table":"5","items":[["焼き鳥",2]],"timestamp":1000}"#;

    // Act
    let ClientMessage::Order(order) = decode_message(bytes.as_bytes()).unwrap() else {
        panic!("expected an order");
    };
    ledger.append_order(&order.validate().unwrap()).await.unwrap();

    // Assert
    assert_eq!(ledger.snapshot().await["5"], vec!["焼き鳥", "焼き鳥"]);
}
