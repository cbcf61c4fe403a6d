use uuid::Uuid;

/// A physical storage site with a hard stock ceiling.
///
/// The ceiling covers the *sum* of quantities across every product row in the
/// warehouse, not any single product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warehouse {
    pub id: Uuid,
    /// Human-facing name; unique across warehouses.
    pub name: String,
    pub location: String,
    /// Maximum total units this site may hold. Always positive.
    pub capacity: i64,
    /// Managing user; several warehouses may share one manager.
    pub manager_id: Uuid,
}

impl Warehouse {
    /// Units this warehouse can still take given its current stock total.
    /// Negative when existing data already sits above the ceiling.
    pub fn remaining_capacity(&self, current_total: i64) -> i64 {
        self.capacity - current_total
    }
}
