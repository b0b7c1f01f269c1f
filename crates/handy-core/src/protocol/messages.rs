//! Message types for the handy ↔ server JSON protocol.
//!
//! # Message flow
//!
//! ```text
//! Handy  → Server:  {"type":"order","table":"5","items":[["焼き鳥",2]],"timestamp":1000}
//! Server → Handy:   {"status":"success","message":"注文を受け付けました"}
//!
//! Handy  → Server:  {"type":"inquiry"}
//! Server → Handy:   {"status":"success","orders":{"5":["焼き鳥","焼き鳥"]}}
//! ```
//!
//! Only success responses exist.  A rejected order gets no reply at all, and a
//! malformed message gets the connection closed; terminals have to tell those
//! two cases apart on their side.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::LedgerSnapshot;

/// Acknowledgement text sent back for every accepted order ("order accepted").
pub const ORDER_ACCEPTED_MESSAGE: &str = "注文を受け付けました";

/// Largest number of ledger entries one order may add, summed over its lines.
pub const MAX_ENTRIES_PER_ORDER: usize = 1_000;

// ── Handy → Server ────────────────────────────────────────────────────────────

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `{"type":"order", ...}`: add items to a table's ledger.
    Order(OrderMessage),

    /// `{"type":"inquiry"}`: ask for the whole ledger.
    Inquiry,

    /// Any other `type` value, or none at all.  Carries the raw type string
    /// when there was one.  The server ignores these.
    Unknown(Option<String>),
}

impl ClientMessage {
    /// Short type-name string for log lines.
    pub fn kind(&self) -> &str {
        match self {
            ClientMessage::Order(_) => "order",
            ClientMessage::Inquiry => "inquiry",
            ClientMessage::Unknown(Some(kind)) => kind.as_str(),
            ClientMessage::Unknown(None) => "<untyped>",
        }
    }
}

/// Body of an order message, before validation.
///
/// `table` and `items` are optional here on purpose: a message missing either
/// one still decodes, and is then dropped by [`OrderMessage::validate`] rather
/// than closing the connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderMessage {
    /// Table identifier.  Called `table` on the wire.
    #[serde(rename = "table", default)]
    pub table_id: Option<String>,

    /// `[item_name, count]` pairs in the order the guest picked them.
    #[serde(default)]
    pub items: Option<Vec<OrderLine>>,

    /// Terminal-side send time.  Accepted and ignored.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl OrderMessage {
    /// Builds an order message from `(item_name, count)` pairs.
    pub fn new(table_id: &str, lines: &[(&str, i64)]) -> Self {
        Self {
            table_id: Some(table_id.to_string()),
            items: Some(
                lines
                    .iter()
                    .map(|(name, count)| OrderLine::new(*name, *count))
                    .collect(),
            ),
            timestamp: None,
        }
    }

    /// Checks that the order names a table, has at least one item, and stays
    /// within [`MAX_ENTRIES_PER_ORDER`].
    ///
    /// Item names are not checked: an empty name is stored as-is.  A count of
    /// zero or less contributes no entries and does not count towards the cap.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingTable`] if `table` is absent, `null`, or `""`.
    /// - [`ValidationError::NoItems`] if `items` is absent, `null`, or `[]`.
    /// - [`ValidationError::TooManyEntries`] if the positive counts add up to
    ///   more than [`MAX_ENTRIES_PER_ORDER`].
    pub fn validate(self) -> Result<ValidatedOrder, ValidationError> {
        let table_id = self
            .table_id
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingTable)?;
        let lines = self
            .items
            .filter(|items| !items.is_empty())
            .ok_or(ValidationError::NoItems)?;

        let entries = lines
            .iter()
            .try_fold(0u64, |acc, line| acc.checked_add(line.count.max(0).unsigned_abs()));
        match entries {
            Some(n) if n <= MAX_ENTRIES_PER_ORDER as u64 => {}
            _ => return Err(ValidationError::TooManyEntries),
        }

        Ok(ValidatedOrder { table_id, lines })
    }
}

/// One `[item_name, count]` pair.
///
/// On the wire this is a two-element JSON array, not an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, i64)", into = "(String, i64)")]
pub struct OrderLine {
    pub item_name: String,
    pub count: i64,
}

impl OrderLine {
    pub fn new(item_name: impl Into<String>, count: i64) -> Self {
        Self {
            item_name: item_name.into(),
            count,
        }
    }
}

impl From<(String, i64)> for OrderLine {
    fn from((item_name, count): (String, i64)) -> Self {
        Self { item_name, count }
    }
}

impl From<OrderLine> for (String, i64) {
    fn from(line: OrderLine) -> Self {
        (line.item_name, line.count)
    }
}

/// An order that passed validation: non-empty table id, at least one line.
///
/// Only [`OrderMessage::validate`] can build one, so the ledger never sees an
/// order without a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    table_id: String,
    lines: Vec<OrderLine>,
}

impl ValidatedOrder {
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }
}

/// Reasons an order is dropped without a reply.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("order has no table id")]
    MissingTable,

    #[error("order has no items")]
    NoItems,

    #[error("order adds more than {} entries", MAX_ENTRIES_PER_ORDER)]
    TooManyEntries,
}

// ── Server → Handy ────────────────────────────────────────────────────────────

/// Value of the `status` field.  `success` is the only status the server sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
}

/// Every response the server can send.
///
/// # Serde representation
///
/// `untagged`: the variant is recognised by which of `message` / `orders` is
/// present.
///
/// ```json
/// {"status":"success","message":"注文を受け付けました"}
/// {"status":"success","orders":{"5":["焼き鳥","焼き鳥"]}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerResponse {
    /// The order was applied to the ledger.
    Accepted {
        status: ResponseStatus,
        message: String,
    },

    /// Full ledger contents, in reply to an inquiry.
    Orders {
        status: ResponseStatus,
        orders: LedgerSnapshot,
    },
}

impl ServerResponse {
    /// The acknowledgement sent after an order is applied.
    pub fn accepted() -> Self {
        ServerResponse::Accepted {
            status: ResponseStatus::Success,
            message: ORDER_ACCEPTED_MESSAGE.to_string(),
        }
    }

    /// Wraps a ledger snapshot for an inquiry reply.
    pub fn orders(snapshot: LedgerSnapshot) -> Self {
        ServerResponse::Orders {
            status: ResponseStatus::Success,
            orders: snapshot,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
