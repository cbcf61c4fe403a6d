use anyhow::Context;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::movement::model::{Movement, MovementDetail, MovementKind};
use crate::movement::repository::MovementRepository;
use crate::time::from_epoch_ms;

/// SQLx-backed implementation of MovementRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxMovementRepository {
    pool: AnyPool,
}

impl SqlxMovementRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovementRepository for SqlxMovementRepository {
    async fn fetch_movement(&self, movement_id: &Uuid) -> anyhow::Result<Option<Movement>> {
        let row = sqlx::query(
            r#"
SELECT id, occurred_at_ms, kind, user_id, origin_warehouse_id, destination_warehouse_id
FROM movements
WHERE id = ?;
"#,
        )
        .bind(movement_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_movement(&r)?)),
            None => Ok(None),
        }
    }

    async fn insert_detail(&self, detail: &MovementDetail) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO movement_details (id, movement_id, product_id, quantity)
VALUES (?, ?, ?, ?);
"#,
        )
        .bind(detail.id.to_string())
        .bind(detail.movement_id.to_string())
        .bind(detail.product_id.to_string())
        .bind(detail.quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn details_for_movement(
        &self,
        movement_id: &Uuid,
    ) -> anyhow::Result<Vec<MovementDetail>> {
        let rows = sqlx::query(
            r#"
SELECT id, movement_id, product_id, quantity
FROM movement_details
WHERE movement_id = ?;
"#,
        )
        .bind(movement_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_detail(&r) {
                Ok(d) => out.push(d),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the batch
                    tracing::warn!(error = %e, "skipping malformed movement detail row");
                }
            }
        }

        Ok(out)
    }
}

/* =========================
Row mapping
========================= */

fn row_to_movement(r: &sqlx::any::AnyRow) -> anyhow::Result<Movement> {
    let id_str: String = r.get("id");
    let id = Uuid::parse_str(&id_str).context("invalid movement id")?;

    let kind: MovementKind = r.get::<String, _>("kind").parse()?;
    let occurred_at = from_epoch_ms(r.get::<i64, _>("occurred_at_ms"))?;

    Ok(Movement {
        id,
        occurred_at,
        kind,
        user_id: opt_uuid(r, "user_id")?,
        origin_warehouse_id: opt_uuid(r, "origin_warehouse_id")?,
        destination_warehouse_id: opt_uuid(r, "destination_warehouse_id")?,
    })
}

fn row_to_detail(r: &sqlx::any::AnyRow) -> anyhow::Result<MovementDetail> {
    let id_str: String = r.get("id");
    let id = Uuid::parse_str(&id_str).context("invalid detail id")?;

    let movement_str: String = r.get("movement_id");
    let movement_id = Uuid::parse_str(&movement_str).context("invalid movement id")?;

    let product_str: String = r.get("product_id");
    let product_id = Uuid::parse_str(&product_str).context("invalid product id")?;

    Ok(MovementDetail {
        id,
        movement_id,
        product_id,
        quantity: r.get::<i64, _>("quantity"),
    })
}

fn opt_uuid(r: &sqlx::any::AnyRow, col: &str) -> anyhow::Result<Option<Uuid>> {
    match r.get::<Option<String>, _>(col) {
        Some(s) => Ok(Some(
            Uuid::parse_str(&s).with_context(|| format!("invalid {col}"))?,
        )),
        None => Ok(None),
    }
}
