//! The order ledger: every item each table has ordered since startup.
//!
//! # Representation
//!
//! A quantity of N for an item is stored as N repeated entries in the table's
//! sequence.  There is no count field.  Entries are only ever appended, never
//! removed or edited, so the sequence doubles as the display order.
//!
//! # Concurrency
//!
//! One `tokio::sync::Mutex` guards the whole mapping, not each table.  Two
//! writers to different tables therefore wait on each other.  That is a
//! throughput limit only: every append and every snapshot are totally ordered,
//! and a snapshot never shows half of an order.
//!
//! The ledger is created empty at process start and lives until shutdown.
//! Nothing is persisted.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::trace;

use crate::protocol::messages::ValidatedOrder;

/// Point-in-time copy of the ledger: table id → item names in append order.
///
/// Tables are kept in a `BTreeMap` so serialized snapshots list tables in a
/// stable (lexical) order.
pub type LedgerSnapshot = BTreeMap<String, Vec<String>>;

/// Errors returned by ledger writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The table's sequence could not grow by `requested` entries.
    #[error("table {table_id} cannot hold {requested} more entries")]
    CapacityExceeded { table_id: String, requested: usize },
}

/// Shared, append-only order ledger.
///
/// Wrap it in an `Arc` and hand a clone to every connection task and to the
/// status endpoint.  The mapping itself is private: `append`, `append_order`
/// and `snapshot` are the only way in.
///
/// # Example
///
/// ```rust
/// use handy_core::OrderLedger;
///
/// # tokio_test_block(async {
/// let ledger = OrderLedger::new();
/// ledger.append("5", "焼き鳥", 2).await.unwrap();
/// let snapshot = ledger.snapshot().await;
/// assert_eq!(snapshot["5"], vec!["焼き鳥", "焼き鳥"]);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct OrderLedger {
    tables: Mutex<LedgerSnapshot>,
}

impl OrderLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item_name` to `table_id`'s sequence `count` times.
    ///
    /// All repetitions are written while the lock is held, so no reader can
    /// observe only some of them.  A `count` of zero or less appends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CapacityExceeded`] if the table cannot grow by
    /// `count` entries.  The ledger is unchanged in that case.
    pub async fn append(
        &self,
        table_id: &str,
        item_name: &str,
        count: i64,
    ) -> Result<usize, LedgerError> {
        let count = entry_count(count);
        let mut tables = self.tables.lock().await;
        reserve(&mut tables, table_id, count)?;
        Ok(push_repeated(&mut tables, table_id, item_name, count))
    }

    /// Applies every line of an already-validated order in one critical section.
    ///
    /// Space for the whole order is reserved before the first entry is
    /// written, so the order is applied completely or not at all.  Returns the
    /// number of entries appended.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CapacityExceeded`] if the table cannot grow by
    /// the order's total entry count.  The ledger is unchanged in that case.
    pub async fn append_order(&self, order: &ValidatedOrder) -> Result<usize, LedgerError> {
        let table_id = order.table_id();
        let total = order
            .lines()
            .iter()
            .try_fold(0usize, |acc, line| acc.checked_add(entry_count(line.count)))
            .ok_or_else(|| LedgerError::CapacityExceeded {
                table_id: table_id.to_string(),
                requested: usize::MAX,
            })?;

        let mut tables = self.tables.lock().await;
        reserve(&mut tables, table_id, total)?;
        Ok(order
            .lines()
            .iter()
            .map(|line| {
                push_repeated(
                    &mut tables,
                    table_id,
                    &line.item_name,
                    entry_count(line.count),
                )
            })
            .sum())
    }

    /// Returns an independent copy of the full mapping.
    ///
    /// The copy is taken under the lock, so it reflects every append that
    /// completed before this call and none that started after.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.tables.lock().await.clone()
    }
}

/// Number of entries a line count produces.  Zero or negative gives none.
fn entry_count(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

/// Makes room for `additional` more entries in `table_id`'s sequence.
///
/// A table that does not exist yet is only inserted once the allocation has
/// succeeded, so a failure never leaves an empty table behind.
fn reserve(
    tables: &mut LedgerSnapshot,
    table_id: &str,
    additional: usize,
) -> Result<(), LedgerError> {
    if additional == 0 {
        return Ok(());
    }
    let exceeded = |_| LedgerError::CapacityExceeded {
        table_id: table_id.to_string(),
        requested: additional,
    };
    match tables.get_mut(table_id) {
        Some(items) => items.try_reserve(additional).map_err(exceeded),
        None => {
            let mut items = Vec::new();
            items.try_reserve(additional).map_err(exceeded)?;
            tables.insert(table_id.to_string(), items);
            Ok(())
        }
    }
}

/// Pushes `count` copies of `item_name` onto `table_id`'s sequence.
///
/// Caller must hold the ledger lock and have reserved the space.  Returns the
/// number of entries written.
fn push_repeated(
    tables: &mut LedgerSnapshot,
    table_id: &str,
    item_name: &str,
    count: usize,
) -> usize {
    if count == 0 {
        return 0;
    }
    let items = tables.entry(table_id.to_string()).or_default();
    items.extend(std::iter::repeat(item_name.to_string()).take(count));
    trace!(table = table_id, item = item_name, count, "ledger append");
    count
}

// ── Tests ─────────────────────────────────────────────────────────────────────
