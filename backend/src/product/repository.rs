use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::product::model::Product;

/// One write inside an atomic stock mutation set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StockWrite {
    /// Overwrite a row's on-hand quantity with the given final value.
    SetQuantity { product_id: Uuid, quantity: i64 },
    /// Create a new product row.
    Insert(Product),
}

/// Persistence port for product stock rows.
///
/// `apply_writes` is the only mutation path the applicator uses: every write
/// in the set lands or none do, so a transfer's decrement and increment can
/// never be observed half-done.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn fetch_by_id(&self, product_id: &Uuid) -> Result<Option<Product>>;

    /// Row for this good in this warehouse, if stocked there.
    async fn fetch_by_name_in_warehouse(
        &self,
        name: &str,
        warehouse_id: &Uuid,
    ) -> Result<Option<Product>>;

    /// Insert a product row, or replace every field of an existing one.
    async fn upsert(&self, product: &Product) -> Result<()>;

    /// Sum of on-hand quantities across a warehouse's rows. Zero when the
    /// warehouse holds nothing.
    async fn total_quantity_in_warehouse(&self, warehouse_id: &Uuid) -> Result<i64>;

    /// Apply the whole write set atomically.
    async fn apply_writes(&self, writes: &[StockWrite]) -> Result<()>;
}
