use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub submissions: Arc<AtomicU64>,
    pub accepted: Arc<AtomicU64>,

    // rejection reasons
    pub rejected_invalid_quantity: Arc<AtomicU64>,
    pub rejected_wrong_warehouse: Arc<AtomicU64>,
    pub rejected_insufficient_stock: Arc<AtomicU64>,
    pub rejected_over_capacity: Arc<AtomicU64>,

    pub attempt_log_failures: Arc<AtomicU64>,
}
