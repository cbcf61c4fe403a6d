use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::movement::model::{Movement, MovementDetail};

/// Persistence port for movement headers and their lines.
///
/// Details only ever get appended; there is deliberately no update or delete
/// surface for applied lines.
#[async_trait]
pub trait MovementRepository: Send + Sync {
    async fn fetch_movement(&self, movement_id: &Uuid) -> Result<Option<Movement>>;

    async fn insert_detail(&self, detail: &MovementDetail) -> Result<()>;

    /// Every line applied under one movement.
    async fn details_for_movement(&self, movement_id: &Uuid) -> Result<Vec<MovementDetail>>;
}
