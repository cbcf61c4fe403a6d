use anyhow::Context;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::warehouse::model::Warehouse;
use crate::warehouse::registry::WarehouseRegistry;

/// SQLx-backed implementation of WarehouseRegistry.
/// Responsible only for persistence and row mapping.
pub struct SqlxWarehouseRegistry {
    pool: AnyPool,
}

impl SqlxWarehouseRegistry {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WarehouseRegistry for SqlxWarehouseRegistry {
    async fn fetch_by_id(&self, warehouse_id: &Uuid) -> anyhow::Result<Option<Warehouse>> {
        let row = sqlx::query(
            r#"
SELECT id, name, location, capacity, manager_id
FROM warehouses
WHERE id = ?;
"#,
        )
        .bind(warehouse_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_warehouse(&r)?)),
            None => Ok(None),
        }
    }
}

fn row_to_warehouse(r: &sqlx::any::AnyRow) -> anyhow::Result<Warehouse> {
    let id_str: String = r.get("id");
    let id = Uuid::parse_str(&id_str).context("invalid warehouse id")?;

    let manager_str: String = r.get("manager_id");
    let manager_id = Uuid::parse_str(&manager_str).context("invalid manager id")?;

    Ok(Warehouse {
        id,
        name: r.get::<String, _>("name"),
        location: r.get::<String, _>("location"),
        capacity: r.get::<i64, _>("capacity"),
        manager_id,
    })
}
