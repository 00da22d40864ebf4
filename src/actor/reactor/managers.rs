pub mod count_change;
pub mod order;

pub use count_change::{CountChange, CountChangeDetector, scene_name};
pub use order::{OrderReconciler, ReconcilePlan, Reconciliation, SlotAssignment};
