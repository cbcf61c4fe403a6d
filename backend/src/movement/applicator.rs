use anyhow::Context;

use crate::movement::model::MovementKind;
use crate::product::model::Product;
use crate::product::repository::{ProductRepository, StockWrite};
use crate::warehouse::model::Warehouse;

/// Rows as persisted after an accepted movement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedStock {
    /// Origin row after the decrement (outbound/transfer).
    pub source: Option<Product>,
    /// Destination row after the increment or creation (inbound/transfer).
    pub destination: Option<Product>,
}

/// Mutate product quantities for a movement line the validator accepted.
///
/// Plans absolute final quantities and lands them through one
/// `apply_writes` call, so a transfer's two-row change is all-or-nothing.
/// Never touches movement or detail rows.
pub async fn apply(
    ledger: &dyn ProductRepository,
    kind: MovementKind,
    product: &Product,
    destination: Option<&Warehouse>,
    quantity: i64,
) -> anyhow::Result<AppliedStock> {
    match kind {
        MovementKind::Outbound => {
            let source = drained(product, quantity)?;
            ledger
                .apply_writes(&[StockWrite::SetQuantity {
                    product_id: source.id,
                    quantity: source.quantity,
                }])
                .await?;

            Ok(AppliedStock {
                source: Some(source),
                destination: None,
            })
        }

        MovementKind::Inbound => {
            let dest = destination.context("inbound movement without destination warehouse")?;
            let received = receive_into(ledger, product, dest, quantity).await?;

            let write = match &received {
                Received::Incremented(row) => StockWrite::SetQuantity {
                    product_id: row.id,
                    quantity: row.quantity,
                },
                Received::Created(row) => StockWrite::Insert(row.clone()),
            };
            ledger.apply_writes(&[write]).await?;

            Ok(AppliedStock {
                source: None,
                destination: Some(received.into_row()),
            })
        }

        MovementKind::Transfer => {
            let dest = destination.context("transfer movement without destination warehouse")?;
            let source = drained(product, quantity)?;
            let received = receive_into(ledger, product, dest, quantity).await?;

            if let Received::Incremented(row) = &received {
                if row.id == product.id {
                    // The destination row is the origin row itself (transfer
                    // within one warehouse): the decrement and the increment
                    // cancel out, so nothing is written.
                    return Ok(AppliedStock {
                        source: Some(product.clone()),
                        destination: Some(product.clone()),
                    });
                }
            }

            let second = match &received {
                Received::Incremented(row) => StockWrite::SetQuantity {
                    product_id: row.id,
                    quantity: row.quantity,
                },
                Received::Created(row) => StockWrite::Insert(row.clone()),
            };
            ledger
                .apply_writes(&[
                    StockWrite::SetQuantity {
                        product_id: source.id,
                        quantity: source.quantity,
                    },
                    second,
                ])
                .await?;

            Ok(AppliedStock {
                source: Some(source),
                destination: Some(received.into_row()),
            })
        }
    }
}

enum Received {
    /// An existing destination row, with the increment applied.
    Incremented(Product),
    /// A fresh row seeded from the source product's catalog fields.
    Created(Product),
}

impl Received {
    fn into_row(self) -> Product {
        match self {
            Received::Incremented(row) | Received::Created(row) => row,
        }
    }
}

/// Find-or-create the destination-side row for `product`'s good.
async fn receive_into(
    ledger: &dyn ProductRepository,
    product: &Product,
    dest: &Warehouse,
    quantity: i64,
) -> anyhow::Result<Received> {
    let existing = ledger
        .fetch_by_name_in_warehouse(&product.name, &dest.id)
        .await?;

    Ok(match existing {
        Some(mut row) => {
            row.quantity += quantity;
            Received::Incremented(row)
        }
        None => Received::Created(product.sibling_in_warehouse(dest.id, quantity)),
    })
}

/// Source row after drawing `quantity` units. The validator has already
/// accepted the draw; a shortfall here means the snapshot went stale, which
/// the engine's locking is supposed to make impossible.
fn drained(product: &Product, quantity: i64) -> anyhow::Result<Product> {
    let remaining = product
        .quantity
        .checked_sub(quantity)
        .filter(|q| *q >= 0)
        .with_context(|| {
            format!(
                "stock underflow drawing {} units from product {}",
                quantity, product.id
            )
        })?;

    let mut source = product.clone();
    source.quantity = remaining;
    Ok(source)
}
