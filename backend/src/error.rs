use thiserror::Error;
use uuid::Uuid;

use crate::movement::model::MovementKind;

/// Why the validator turned a movement line down.
///
/// `Display` strings are user-facing and stable; callers surface them verbatim,
/// so they name the failed constraint and the numbers behind it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("quantity must be a positive number of units (got {got})")]
    InvalidQuantity { got: i64 },

    #[error("product '{product}' is not stocked in origin warehouse '{warehouse}'")]
    ProductNotInOriginWarehouse { product: String, warehouse: String },

    #[error(
        "insufficient stock of '{product}' in origin warehouse: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error(
        "destination warehouse '{warehouse}' cannot take {requested} more units: remaining capacity {remaining}"
    )]
    CapacityExceeded {
        warehouse: String,
        remaining: i64,
        requested: i64,
    },
}

impl Rejection {
    /// Business denials land in the failed-attempt log. A nonsensical quantity
    /// is caller sloppiness, not a denied stock decision, and is not recorded.
    pub fn is_recordable(&self) -> bool {
        !matches!(self, Rejection::InvalidQuantity { .. })
    }
}

/// Failure surface of `MovementEngine::submit`.
///
/// `Rejected` is the only expected outcome besides success; the reference
/// errors mean the submission pointed at rows that do not exist, and `Infra`
/// carries storage failures through unchanged.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("movement rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("movement {0} not found")]
    MovementNotFound(Uuid),

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("warehouse {0} not found")]
    WarehouseNotFound(Uuid),

    #[error("{kind} movement has no {missing} warehouse")]
    IncompleteMovement {
        kind: MovementKind,
        missing: &'static str,
    },

    #[error(transparent)]
    Infra(#[from] anyhow::Error),
}
