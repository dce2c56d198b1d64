pub mod allocator;
pub mod matcher;
pub mod normalizer;
pub mod reconcile;

pub use allocator::allocate_oldest_first;
pub use matcher::{CombinatorialMatcher, SearchBudget, SearchReport, MAX_ENUMERABLE_INVOICES};
pub use normalizer::{normalize, parse_amount, parse_invoices, NormalizedInput};
pub use reconcile::ReconcileService;
