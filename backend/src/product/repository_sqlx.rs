use anyhow::{Context, bail};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::product::model::Product;
use crate::product::repository::{ProductRepository, StockWrite};

/// SQLx-backed implementation of ProductRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxProductRepository {
    pool: AnyPool,
}

impl SqlxProductRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn fetch_by_id(&self, product_id: &Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query(
            r#"
SELECT id, name, category, price_minor, quantity, warehouse_id
FROM products
WHERE id = ?;
"#,
        )
        .bind(product_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_product(&r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_by_name_in_warehouse(
        &self,
        name: &str,
        warehouse_id: &Uuid,
    ) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query(
            r#"
SELECT id, name, category, price_minor, quantity, warehouse_id
FROM products
WHERE name = ? AND warehouse_id = ?;
"#,
        )
        .bind(name)
        .bind(warehouse_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_product(&r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, product: &Product) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO products (id, name, category, price_minor, quantity, warehouse_id)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
  name = excluded.name,
  category = excluded.category,
  price_minor = excluded.price_minor,
  quantity = excluded.quantity,
  warehouse_id = excluded.warehouse_id;
"#,
        )
        .bind(product.id.to_string())
        .bind(product.name.as_str())
        .bind(product.category.as_str())
        .bind(product.price_minor)
        .bind(product.quantity)
        .bind(product.warehouse_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn total_quantity_in_warehouse(&self, warehouse_id: &Uuid) -> anyhow::Result<i64> {
        let row = sqlx::query(
            r#"
SELECT COALESCE(SUM(quantity), 0) AS total
FROM products
WHERE warehouse_id = ?;
"#,
        )
        .bind(warehouse_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("total"))
    }

    async fn apply_writes(&self, writes: &[StockWrite]) -> anyhow::Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("begin stock transaction")?;

        for write in writes {
            match write {
                StockWrite::SetQuantity {
                    product_id,
                    quantity,
                } => {
                    let res = sqlx::query(
                        r#"
UPDATE products
SET quantity = ?
WHERE id = ?;
"#,
                    )
                    .bind(*quantity)
                    .bind(product_id.to_string())
                    .execute(&mut *tx)
                    .await?;

                    if res.rows_affected() == 0 {
                        bail!("stock update touched no row: product {product_id}");
                    }
                }
                StockWrite::Insert(p) => {
                    sqlx::query(
                        r#"
INSERT INTO products (id, name, category, price_minor, quantity, warehouse_id)
VALUES (?, ?, ?, ?, ?, ?);
"#,
                    )
                    .bind(p.id.to_string())
                    .bind(p.name.as_str())
                    .bind(p.category.as_str())
                    .bind(p.price_minor)
                    .bind(p.quantity)
                    .bind(p.warehouse_id.to_string())
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await.context("commit stock transaction")?;
        Ok(())
    }
}

/* =========================
Row mapping
========================= */

fn row_to_product(r: &sqlx::any::AnyRow) -> anyhow::Result<Product> {
    let id_str: String = r.get("id");
    let id = Uuid::parse_str(&id_str).context("invalid product id")?;

    let warehouse_str: String = r.get("warehouse_id");
    let warehouse_id = Uuid::parse_str(&warehouse_str).context("invalid warehouse id")?;

    Ok(Product {
        id,
        name: r.get::<String, _>("name"),
        category: r.get::<String, _>("category"),
        price_minor: r.get::<i64, _>("price_minor"),
        quantity: r.get::<i64, _>("quantity"),
        warehouse_id,
    })
}
