use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::attempts::model::{AttemptDetail, FailedAttempt, MAX_REASON_LEN};
use crate::attempts::recorder::FailedAttemptRecorder;
use crate::movement::model::MovementKind;
use crate::time::{from_epoch_ms, to_epoch_ms};

/// SQLx-backed implementation of FailedAttemptRecorder.
/// Responsible only for persistence and row mapping.
pub struct SqlxFailedAttemptRecorder {
    pool: AnyPool,
}

impl SqlxFailedAttemptRecorder {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FailedAttemptRecorder for SqlxFailedAttemptRecorder {
    async fn record(&self, attempt: &FailedAttempt) -> anyhow::Result<()> {
        let detail_json = match &attempt.detail {
            Some(d) => Some(serde_json::to_string(d).context("serialize attempt detail")?),
            None => None,
        };

        sqlx::query(
            r#"
INSERT INTO failed_attempts (
  id, recorded_at_ms, kind, reason,
  user_id, username,
  product_id, product_name,
  origin_warehouse_id, destination_warehouse_id,
  quantity, detail_json
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(attempt.id.to_string())
        .bind(to_epoch_ms(&attempt.recorded_at))
        .bind(attempt.kind.to_string())
        .bind(bounded_reason(&attempt.reason))
        .bind(attempt.user_id.map(|u| u.to_string()))
        .bind(attempt.username.as_str())
        .bind(attempt.product_id.to_string())
        .bind(attempt.product_name.as_str())
        .bind(attempt.origin_warehouse_id.map(|w| w.to_string()))
        .bind(attempt.destination_warehouse_id.map(|w| w.to_string()))
        .bind(attempt.quantity)
        .bind(detail_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: u32) -> anyhow::Result<Vec<FailedAttempt>> {
        let rows = sqlx::query(
            r#"
SELECT
  id, recorded_at_ms, kind, reason,
  user_id, username,
  product_id, product_name,
  origin_warehouse_id, destination_warehouse_id,
  quantity, detail_json
FROM failed_attempts
ORDER BY recorded_at_ms DESC
LIMIT ?;
"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_attempt(&r) {
                Ok(a) => out.push(a),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the batch
                    tracing::warn!(error = %e, "skipping malformed failed-attempt row");
                }
            }
        }

        Ok(out)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
DELETE FROM failed_attempts
WHERE recorded_at_ms < ?;
"#,
        )
        .bind(to_epoch_ms(&cutoff))
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}

/* =========================
Row mapping + bounds
========================= */

fn row_to_attempt(r: &sqlx::any::AnyRow) -> anyhow::Result<FailedAttempt> {
    let id_str: String = r.get("id");
    let id = Uuid::parse_str(&id_str).context("invalid attempt id")?;

    let product_str: String = r.get("product_id");
    let product_id = Uuid::parse_str(&product_str).context("invalid product id")?;

    let kind: MovementKind = r.get::<String, _>("kind").parse()?;
    let recorded_at = from_epoch_ms(r.get::<i64, _>("recorded_at_ms"))?;

    let detail = match r.get::<Option<String>, _>("detail_json") {
        Some(json) => {
            Some(serde_json::from_str::<AttemptDetail>(&json).context("invalid attempt detail")?)
        }
        None => None,
    };

    Ok(FailedAttempt {
        id,
        recorded_at,
        kind,
        reason: r.get::<String, _>("reason"),
        user_id: opt_uuid(r, "user_id")?,
        username: r.get::<String, _>("username"),
        product_id,
        product_name: r.get::<String, _>("product_name"),
        origin_warehouse_id: opt_uuid(r, "origin_warehouse_id")?,
        destination_warehouse_id: opt_uuid(r, "destination_warehouse_id")?,
        quantity: r.get::<i64, _>("quantity"),
        detail,
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

/// Reason strings are capped at the column bound. The cut lands on a char
/// boundary; reasons embed product names, which are not guaranteed ASCII.
fn bounded_reason(reason: &str) -> String {
    if reason.len() <= MAX_REASON_LEN {
        return reason.to_string();
    }
    let mut end = MAX_REASON_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}
