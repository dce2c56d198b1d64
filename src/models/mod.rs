pub mod invoice;
pub mod result;

pub use invoice::Invoice;
pub use result::{
    AllocatedInvoice, AllocationResult, AllocationStatus, Match, MatchKind, Reconciliation,
    ResolvedMatch, SearchOutcome,
};
