use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Direction of a stock movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementKind {
    Inbound,
    Outbound,
    Transfer,
}

impl MovementKind {
    /// Kinds that take stock out of an origin warehouse.
    pub fn draws_from_origin(&self) -> bool {
        matches!(self, MovementKind::Outbound | MovementKind::Transfer)
    }

    /// Kinds that put stock into a destination warehouse.
    pub fn feeds_destination(&self) -> bool {
        matches!(self, MovementKind::Inbound | MovementKind::Transfer)
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MovementKind::Inbound => "INBOUND",
            MovementKind::Outbound => "OUTBOUND",
            MovementKind::Transfer => "TRANSFER",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown movement kind: {0}")]
pub struct ParseMovementKindError(String);

impl FromStr for MovementKind {
    type Err = ParseMovementKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INBOUND" => Ok(MovementKind::Inbound),
            "OUTBOUND" => Ok(MovementKind::Outbound),
            "TRANSFER" => Ok(MovementKind::Transfer),
            other => Err(ParseMovementKindError(other.to_string())),
        }
    }
}

/// A stock-changing event header. The quantities live in its
/// [`MovementDetail`] lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Movement {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: MovementKind,
    /// Acting account; `None` when the line came in under the system identity.
    pub user_id: Option<Uuid>,
    /// Required for outbound/transfer, ignored otherwise.
    pub origin_warehouse_id: Option<Uuid>,
    /// Required for inbound/transfer, ignored otherwise.
    pub destination_warehouse_id: Option<Uuid>,
}

/// One validated-and-applied line of a movement. Immutable once persisted;
/// corrections are compensating movements, never edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementDetail {
    pub id: Uuid,
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
}

/// A proposed line, before validation. Ids are resolved by the engine.
#[derive(Clone, Copy, Debug)]
pub struct NewMovementDetail {
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
}
