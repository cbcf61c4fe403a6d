use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::warehouse::model::Warehouse;

/// Read-side lookup of warehouse reference data.
///
/// Warehouse lifecycle (creation, capacity changes) is owned elsewhere; the
/// movement path only ever resolves ids.
#[async_trait]
pub trait WarehouseRegistry: Send + Sync {
    async fn fetch_by_id(&self, warehouse_id: &Uuid) -> Result<Option<Warehouse>>;
}
