use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Rejection;
use crate::identity::User;
use crate::movement::model::{Movement, MovementKind};
use crate::product::model::Product;

/// Reasons longer than this are truncated before persisting.
pub const MAX_REASON_LEN: usize = 500;

/// Structured numbers behind a rejection, stored as the attempt's JSON detail
/// column so ops tooling does not have to parse the reason string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AttemptDetail {
    WrongWarehouse { origin_warehouse: String },
    InsufficientStock { available: i64, requested: i64 },
    CapacityExceeded { remaining: i64, requested: i64 },
}

impl AttemptDetail {
    /// `None` for rejections that carry no recordable numbers.
    pub fn for_rejection(rejection: &Rejection) -> Option<AttemptDetail> {
        match rejection {
            Rejection::InvalidQuantity { .. } => None,
            Rejection::ProductNotInOriginWarehouse { warehouse, .. } => {
                Some(AttemptDetail::WrongWarehouse {
                    origin_warehouse: warehouse.clone(),
                })
            }
            Rejection::InsufficientStock {
                available,
                requested,
                ..
            } => Some(AttemptDetail::InsufficientStock {
                available: *available,
                requested: *requested,
            }),
            Rejection::CapacityExceeded {
                remaining,
                requested,
                ..
            } => Some(AttemptDetail::CapacityExceeded {
                remaining: *remaining,
                requested: *requested,
            }),
        }
    }
}

/// A denied movement line, kept for operational review.
///
/// Rows are append-only and denormalized: `username` and `product_name` are
/// snapshots taken at record time, so the log still reads cleanly after the
/// referenced rows change or disappear.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedAttempt {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub kind: MovementKind,
    /// User-displayable reason; capped at [`MAX_REASON_LEN`] when stored.
    pub reason: String,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub origin_warehouse_id: Option<Uuid>,
    pub destination_warehouse_id: Option<Uuid>,
    pub quantity: i64,
    pub detail: Option<AttemptDetail>,
}

impl FailedAttempt {
    /// Snapshot a rejection into a log entry.
    pub fn for_rejection(
        movement: &Movement,
        product: &Product,
        rejection: &Rejection,
        quantity: i64,
        user: &User,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            kind: movement.kind,
            reason: rejection.to_string(),
            user_id: user.id,
            username: user.username.clone(),
            product_id: product.id,
            product_name: product.name.clone(),
            origin_warehouse_id: movement.origin_warehouse_id,
            destination_warehouse_id: movement.destination_warehouse_id,
            quantity,
            detail: AttemptDetail::for_rejection(rejection),
        }
    }
}
