use uuid::Uuid;

/// Stock of one named good in one warehouse.
///
/// The same good held in another warehouse is a separate row; `quantity` is
/// the on-hand units of *this* row, never the good's global total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    /// Unit price in minor currency units.
    pub price_minor: i64,
    /// On-hand units; never negative once persisted.
    pub quantity: i64,
    pub warehouse_id: Uuid,
}

impl Product {
    /// New row for this good arriving at another warehouse.
    ///
    /// Copies the catalog fields (name, category, price) and starts with
    /// `quantity` units; the inbound find-or-create path uses this when the
    /// destination has no row for the good yet.
    pub fn sibling_in_warehouse(&self, warehouse_id: Uuid, quantity: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            category: self.category.clone(),
            price_minor: self.price_minor,
            quantity,
            warehouse_id,
        }
    }
}
