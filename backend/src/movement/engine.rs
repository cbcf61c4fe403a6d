//! Movement intake.
//!
//! Responsibilities:
//! - Resolve a submitted line against movements, products and warehouses.
//! - Serialize stock decisions per warehouse.
//! - Validate each line against a fresh in-lock snapshot.
//! - Apply accepted mutations and persist the line.
//! - Record rejected attempts.
//!
//! Non-responsibilities:
//! - Creating movements, products or warehouses (callers own reference data).
//! - Authorization (the ambient identity is read, never enforced).
//! - Transport concerns (HTTP shaping happens in front of this crate).
//!
//! Safety/liveness properties:
//! - Warehouse locks are acquired in sorted id order, so two submissions
//!   touching the same pair of warehouses cannot deadlock.
//! - Validation and mutation happen under the locks of every touched
//!   warehouse; no interleaving can oversell a row or breach a ceiling.
//! - A rejection reaches the caller even when the attempt log is down.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;
use tracing::{Span, field, info, instrument, warn};
use uuid::Uuid;

use crate::attempts::model::FailedAttempt;
use crate::attempts::recorder::FailedAttemptRecorder;
use crate::error::{Rejection, SubmitError};
use crate::identity::{IdentityProvider, system_user};
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::movement::applicator;
use crate::movement::model::{Movement, MovementDetail, NewMovementDetail};
use crate::movement::repository::MovementRepository;
use crate::movement::validator::{self, MovementIntent};
use crate::product::model::Product;
use crate::product::repository::ProductRepository;
use crate::warehouse::model::Warehouse;
use crate::warehouse::registry::WarehouseRegistry;

/// Lock table serializing stock decisions per warehouse.
///
/// Entries are created on first touch and kept for the process lifetime; the
/// warehouse population is small and stable.
struct WarehouseLocks {
    by_warehouse: parking_lot::Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl WarehouseLocks {
    fn new() -> Self {
        Self {
            by_warehouse: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.by_warehouse.lock().entry(id).or_default())
    }

    /// Guards for every given warehouse, taken in sorted id order.
    async fn acquire(&self, mut ids: Vec<Uuid>) -> Vec<OwnedMutexGuard<()>> {
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.handle(id).lock_owned().await);
        }
        guards
    }
}

/// Sole entry point for stock-changing movement lines.
pub struct MovementEngine {
    /// Movement headers and detail lines.
    movements: Arc<dyn MovementRepository>,

    /// Product stock rows; all quantity mutations go through its atomic
    /// write-set operation.
    ledger: Arc<dyn ProductRepository>,

    /// Warehouse reference data (read-only here).
    warehouses: Arc<dyn WarehouseRegistry>,

    /// Append-only log of denied attempts.
    attempts: Arc<dyn FailedAttemptRecorder>,

    /// Ambient acting identity; degraded to the system user on failure.
    identity: Arc<dyn IdentityProvider>,

    locks: WarehouseLocks,

    /// Observability counters (does not affect behavior).
    counters: Counters,
}

impl MovementEngine {
    pub fn new(
        movements: Arc<dyn MovementRepository>,
        ledger: Arc<dyn ProductRepository>,
        warehouses: Arc<dyn WarehouseRegistry>,
        attempts: Arc<dyn FailedAttemptRecorder>,
        identity: Arc<dyn IdentityProvider>,
        counters: Counters,
    ) -> Self {
        Self {
            movements,
            ledger,
            warehouses,
            attempts,
            identity,
            locks: WarehouseLocks::new(),
            counters,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Validate and apply one movement line, all-or-nothing.
    ///
    /// Returns the persisted detail on acceptance. A business rejection comes
    /// back as `SubmitError::Rejected` with a user-displayable reason and, for
    /// everything except a nonsensical quantity, a failed-attempt record.
    /// Storage failures propagate unchanged.
    #[instrument(
        skip(self, submission),
        target = "engine",
        fields(
            movement_id = %submission.movement_id,
            product_id = %submission.product_id,
            quantity = submission.quantity,
            kind = field::Empty,
            verdict = field::Empty,
        )
    )]
    pub async fn submit(
        &self,
        submission: NewMovementDetail,
    ) -> Result<MovementDetail, SubmitError> {
        self.counters.submissions.fetch_add(1, Ordering::Relaxed);

        let movement = self
            .movements
            .fetch_movement(&submission.movement_id)
            .await?
            .ok_or(SubmitError::MovementNotFound(submission.movement_id))?;

        Span::current().record("kind", field::display(movement.kind));

        // Resolve-time read; re-read under the locks before deciding.
        let product = self
            .ledger
            .fetch_by_id(&submission.product_id)
            .await?
            .ok_or(SubmitError::ProductNotFound(submission.product_id))?;

        let (origin, destination) = self.resolve_warehouses(&movement).await?;

        let mut touched = Vec::new();
        if let Some(w) = &origin {
            touched.push(w.id);
        }
        if let Some(w) = &destination {
            touched.push(w.id);
        }
        let _guards = self.locks.acquire(touched).await;

        let product = self
            .ledger
            .fetch_by_id(&product.id)
            .await?
            .ok_or(SubmitError::ProductNotFound(product.id))?;

        let destination_stock_total = match &destination {
            Some(w) => self.ledger.total_quantity_in_warehouse(&w.id).await?,
            None => 0,
        };

        let intent = MovementIntent {
            kind: movement.kind,
            origin: origin.as_ref(),
            destination: destination.as_ref(),
            product: &product,
            quantity: submission.quantity,
            destination_stock_total,
        };

        if let Err(rejection) = validator::validate(&intent) {
            Span::current().record("verdict", "rejected");
            self.note_rejection(&movement, &product, &rejection, submission.quantity)
                .await;
            return Err(SubmitError::Rejected(rejection));
        }

        let applied = applicator::apply(
            self.ledger.as_ref(),
            movement.kind,
            &product,
            destination.as_ref(),
            submission.quantity,
        )
        .await?;

        let detail = MovementDetail {
            id: Uuid::new_v4(),
            movement_id: movement.id,
            product_id: product.id,
            quantity: submission.quantity,
        };
        self.movements.insert_detail(&detail).await?;

        Span::current().record("verdict", "accepted");
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        info!(
            detail_id = %detail.id,
            source_quantity = applied.source.as_ref().map(|p| p.quantity),
            destination_quantity = applied.destination.as_ref().map(|p| p.quantity),
            "movement line applied"
        );

        Ok(detail)
    }

    /// Resolve the movement's warehouse references and enforce that each side
    /// the kind needs is present.
    async fn resolve_warehouses(
        &self,
        movement: &Movement,
    ) -> Result<(Option<Warehouse>, Option<Warehouse>), SubmitError> {
        let origin = match movement.origin_warehouse_id {
            Some(id) => Some(
                self.warehouses
                    .fetch_by_id(&id)
                    .await?
                    .ok_or(SubmitError::WarehouseNotFound(id))?,
            ),
            None => None,
        };

        let destination = match movement.destination_warehouse_id {
            Some(id) => Some(
                self.warehouses
                    .fetch_by_id(&id)
                    .await?
                    .ok_or(SubmitError::WarehouseNotFound(id))?,
            ),
            None => None,
        };

        if movement.kind.draws_from_origin() && origin.is_none() {
            return Err(SubmitError::IncompleteMovement {
                kind: movement.kind,
                missing: "origin",
            });
        }
        if movement.kind.feeds_destination() && destination.is_none() {
            return Err(SubmitError::IncompleteMovement {
                kind: movement.kind,
                missing: "destination",
            });
        }

        Ok((origin, destination))
    }

    /// Count the rejection and, for business denials, append it to the
    /// attempt log. A recorder failure is logged and swallowed so it can
    /// never mask the rejection itself.
    async fn note_rejection(
        &self,
        movement: &Movement,
        product: &Product,
        rejection: &Rejection,
        quantity: i64,
    ) {
        let counter = match rejection {
            Rejection::InvalidQuantity { .. } => &self.counters.rejected_invalid_quantity,
            Rejection::ProductNotInOriginWarehouse { .. } => {
                &self.counters.rejected_wrong_warehouse
            }
            Rejection::InsufficientStock { .. } => &self.counters.rejected_insufficient_stock,
            Rejection::CapacityExceeded { .. } => &self.counters.rejected_over_capacity,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if !rejection.is_recordable() {
            return;
        }

        let user = self.identity.current_user().unwrap_or_else(|e| {
            warn!(error = %e, "identity lookup failed; attributing attempt to system");
            system_user()
        });

        let attempt = FailedAttempt::for_rejection(movement, product, rejection, quantity, &user);

        let recorded = warn_if_slow(
            "attempt_record",
            Duration::from_millis(50),
            self.attempts.record(&attempt),
        )
        .await;

        if let Err(e) = recorded {
            self.counters
                .attempt_log_failures
                .fetch_add(1, Ordering::Relaxed);
            warn!(error = ?e, reason = %rejection, "failed to record rejected attempt");
        }
    }
}
