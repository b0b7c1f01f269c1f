//! OrderService: turns decoded messages into ledger operations and replies.
//!
//! This is the transport-independent half of the protocol handler.  The
//! connection loop in `infrastructure::connection` does the socket reads and
//! writes; everything between "a message was decoded" and "these bytes should
//! be written back" happens here.
//!
//! # Dispatch table
//!
//! | Message        | Ledger effect            | Reply                         |
//! |----------------|--------------------------|-------------------------------|
//! | valid order    | append whole order       | `{"status":"success","message":…}` |
//! | invalid order  | none                     | none (dropped)                |
//! | order too big  | none                     | none (dropped)                |
//! | inquiry        | snapshot                 | `{"status":"success","orders":…}`  |
//! | anything else  | none                     | none                          |

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use handy_core::{
    ClientMessage, LedgerError, OrderLedger, OrderLine, ServerResponse, ValidationError,
};

/// Buffered order notifications per subscriber before the slowest one starts
/// losing events.
const EVENT_CAPACITY: usize = 256;

/// What the connection loop should do after a message was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Write this response back to the terminal.
    Reply(ServerResponse),

    /// The order failed validation.  Nothing was written to the ledger and no
    /// reply is sent; the connection stays open.
    Rejected(ValidationError),

    /// The ledger could not take the order.  Nothing was written and no reply
    /// is sent; the connection stays open.
    Failed(LedgerError),

    /// Unknown or untyped message.  No action, no reply.
    Ignored,
}

/// Notification published after an order has been committed to the ledger.
///
/// The front-desk display subscribes to these to show incoming orders as they
/// arrive instead of polling the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    OrderAccepted {
        table_id: String,
        lines: Vec<OrderLine>,
        /// Number of ledger entries the order produced.
        entries: usize,
    },
}

/// Shared order-handling use case.
///
/// One instance serves every connection; share it as `Arc<OrderService>`.
pub struct OrderService {
    ledger: Arc<OrderLedger>,
    events: broadcast::Sender<OrderEvent>,
}

impl OrderService {
    /// Creates a service over the given ledger.
    pub fn new(ledger: Arc<OrderLedger>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { ledger, events }
    }

    /// The ledger this service writes to.
    pub fn ledger(&self) -> &Arc<OrderLedger> {
        &self.ledger
    }

    /// Subscribes to [`OrderEvent`]s for every order accepted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    /// Processes one decoded message.
    ///
    /// For an order, the ledger mutation has completed before this returns,
    /// so an inquiry dispatched afterwards always sees it.
    pub async fn dispatch(&self, message: ClientMessage) -> Dispatch {
        match message {
            ClientMessage::Order(order) => {
                let order = match order.validate() {
                    Ok(order) => order,
                    Err(e) => {
                        debug!("order dropped: {e}");
                        return Dispatch::Rejected(e);
                    }
                };

                let entries = match self.ledger.append_order(&order).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("order dropped: {e}");
                        return Dispatch::Failed(e);
                    }
                };
                info!(
                    table = order.table_id(),
                    entries,
                    "order accepted: {:?}",
                    order.lines()
                );

                // Having no subscribers is normal; `send` only fails then.
                let _ = self.events.send(OrderEvent::OrderAccepted {
                    table_id: order.table_id().to_string(),
                    lines: order.lines().to_vec(),
                    entries,
                });

                Dispatch::Reply(ServerResponse::accepted())
            }

            ClientMessage::Inquiry => {
                let snapshot = self.ledger.snapshot().await;
                debug!(tables = snapshot.len(), "inquiry served");
                Dispatch::Reply(ServerResponse::orders(snapshot))
            }

            unknown @ ClientMessage::Unknown(_) => {
                debug!("ignoring message of type {}", unknown.kind());
                Dispatch::Ignored
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
