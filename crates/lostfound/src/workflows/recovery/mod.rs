//! Found-item claim and escrow lifecycle.
//!
//! The engine here owns every status transition across the three related
//! records (found item, claim request, escrow): submission, admin review, and
//! release. Persistence and notification are consumed through the traits in
//! [`repository`], so the module can be exercised end to end with in-memory
//! doubles.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ClaimDecision, ClaimId, ClaimRequest, ClaimStatus, Escrow, EscrowId, EscrowStatus, FoundItem,
    FoundItemId, FoundItemReport, FoundItemStatus, LostItem, LostItemId, LostItemReport,
    LostItemStatus, User, UserId,
};
pub use repository::{
    ClaimantNotifier, EscrowReleaseView, HoldingEscrowView, NotifyError, PendingClaimView,
    RecoveryRepository, ReleaseNotice, RepositoryError,
};
pub use router::recovery_router;
pub use service::{
    ClaimReview, EscrowRelease, LifecycleError, LifecycleService, TransitionBlock,
};
