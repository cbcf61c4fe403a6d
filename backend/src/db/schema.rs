use sqlx::AnyPool;

/// Idempotent table bootstrap. Safe to run on every startup.
pub async fn init(pool: &AnyPool) -> anyhow::Result<()> {
    // Users (reference data; managed outside this service)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS users (
  id TEXT PRIMARY KEY,
  username TEXT NOT NULL,
  full_name TEXT NOT NULL,
  role TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Warehouses
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS warehouses (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  location TEXT NOT NULL,
  capacity BIGINT NOT NULL CHECK (capacity > 0),
  manager_id TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Products: one row per (good, warehouse)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS products (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  category TEXT NOT NULL,
  price_minor BIGINT NOT NULL,
  quantity BIGINT NOT NULL CHECK (quantity >= 0),
  warehouse_id TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Movements
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS movements (
  id TEXT PRIMARY KEY,
  occurred_at_ms BIGINT NOT NULL,
  kind TEXT NOT NULL,
  user_id TEXT,
  origin_warehouse_id TEXT,
  destination_warehouse_id TEXT
);
"#,
    )
    .execute(pool)
    .await?;

    // Movement details
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS movement_details (
  id TEXT PRIMARY KEY,
  movement_id TEXT NOT NULL,
  product_id TEXT NOT NULL,
  quantity BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Failed attempts (append-only)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS failed_attempts (
  id TEXT PRIMARY KEY,
  recorded_at_ms BIGINT NOT NULL,
  kind TEXT NOT NULL,
  reason TEXT NOT NULL,
  user_id TEXT,
  username TEXT NOT NULL,
  product_id TEXT NOT NULL,
  product_name TEXT NOT NULL,
  origin_warehouse_id TEXT,
  destination_warehouse_id TEXT,
  quantity BIGINT NOT NULL,
  detail_json TEXT
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_warehouses_name ON warehouses(name);"#)
        .execute(pool)
        .await?;

    // The inbound find-or-create path relies on (name, warehouse) being unambiguous.
    sqlx::query(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_products_name_warehouse ON products(name, warehouse_id);"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_products_warehouse ON products(warehouse_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_movement_details_movement ON movement_details(movement_id);"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_failed_attempts_recorded ON failed_attempts(recorded_at_ms);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
