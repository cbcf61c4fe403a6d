use tracing::{debug, instrument};

use crate::error::Rejection;
use crate::movement::model::MovementKind;
use crate::product::model::Product;
use crate::warehouse::model::Warehouse;

/// Snapshot of everything one movement-line decision needs.
///
/// The engine assembles this under the warehouse locks so the decision runs
/// against fresh state; the validator itself never touches storage.
#[derive(Clone, Copy, Debug)]
pub struct MovementIntent<'a> {
    pub kind: MovementKind,
    pub origin: Option<&'a Warehouse>,
    pub destination: Option<&'a Warehouse>,
    /// The product row the line points at (in its home warehouse).
    pub product: &'a Product,
    pub quantity: i64,
    /// Current stock total across the destination's rows; 0 when there is no
    /// destination.
    pub destination_stock_total: i64,
}

/// Decide a proposed movement line against a ledger snapshot.
///
/// Rules run in a fixed order and the first failure wins:
/// 1. the quantity must be positive
/// 2. outbound/transfer: the product must sit in the stated origin
/// 3. outbound/transfer: the origin row must hold enough units
/// 4. inbound/transfer: the destination ceiling must hold after the add
///
/// Pure and deterministic: the same snapshot always yields the same verdict.
#[instrument(
    target = "validator",
    skip(intent),
    fields(kind = %intent.kind, product_id = %intent.product.id, quantity = intent.quantity)
)]
pub fn validate(intent: &MovementIntent<'_>) -> Result<(), Rejection> {
    if intent.quantity <= 0 {
        return Err(Rejection::InvalidQuantity {
            got: intent.quantity,
        });
    }

    if intent.kind.draws_from_origin() {
        if let Some(origin) = intent.origin {
            if intent.product.warehouse_id != origin.id {
                debug!(origin = %origin.name, "product lives in another warehouse");
                return Err(Rejection::ProductNotInOriginWarehouse {
                    product: intent.product.name.clone(),
                    warehouse: origin.name.clone(),
                });
            }
        }

        if intent.product.quantity < intent.quantity {
            debug!(
                available = intent.product.quantity,
                "origin row cannot cover the draw"
            );
            return Err(Rejection::InsufficientStock {
                product: intent.product.name.clone(),
                available: intent.product.quantity,
                requested: intent.quantity,
            });
        }
    }

    if intent.kind.feeds_destination() {
        if let Some(dest) = intent.destination {
            let after = intent.destination_stock_total.saturating_add(intent.quantity);
            if after > dest.capacity {
                debug!(
                    total = intent.destination_stock_total,
                    capacity = dest.capacity,
                    "destination ceiling would be breached"
                );
                return Err(Rejection::CapacityExceeded {
                    warehouse: dest.name.clone(),
                    remaining: dest.remaining_capacity(intent.destination_stock_total),
                    requested: intent.quantity,
                });
            }
        }
    }

    Ok(())
}
