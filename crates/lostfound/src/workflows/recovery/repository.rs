use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ClaimId, ClaimRequest, ClaimStatus, Escrow, EscrowId, FoundItem, FoundItemId, FoundItemReport,
    FoundItemStatus, LostItem, LostItemReport, UserId,
};

/// Persistence gateway consumed by the lifecycle engine.
///
/// The conditional-update methods are the engine's only concurrency-safety
/// mechanism: each applies "set status = next where id = ? and status =
/// expected" atomically and returns the affected-row count. Precondition reads
/// elsewhere in the engine are advisory; a zero row count from one of these
/// methods is the authoritative signal that another writer got there first.
pub trait RecoveryRepository: Send + Sync {
    fn insert_found_item(
        &self,
        reporter: UserId,
        report: FoundItemReport,
    ) -> Result<FoundItem, RepositoryError>;

    fn insert_lost_item(
        &self,
        reporter: UserId,
        report: LostItemReport,
    ) -> Result<LostItem, RepositoryError>;

    fn found_item(&self, id: FoundItemId) -> Result<Option<FoundItem>, RepositoryError>;

    fn claim(&self, id: ClaimId) -> Result<Option<ClaimRequest>, RepositoryError>;

    fn claim_by_claimant(
        &self,
        claimant: UserId,
        found_id: FoundItemId,
    ) -> Result<Option<ClaimRequest>, RepositoryError>;

    /// Insert a pending claim. The store enforces at most one claim per
    /// (claimant, found item) pair and reports a second insert as `Conflict`.
    fn insert_claim(
        &self,
        claimant: UserId,
        found_id: FoundItemId,
    ) -> Result<ClaimRequest, RepositoryError>;

    fn update_found_item_status(
        &self,
        id: FoundItemId,
        expected: FoundItemStatus,
        next: FoundItemStatus,
    ) -> Result<u64, RepositoryError>;

    fn update_claim_status(
        &self,
        id: ClaimId,
        expected: ClaimStatus,
        next: ClaimStatus,
    ) -> Result<u64, RepositoryError>;

    /// Return the escrow row for this item, creating a Holding one if absent.
    fn ensure_escrow(&self, found_id: FoundItemId) -> Result<Escrow, RepositoryError>;

    /// Conditionally mark an escrow Released, stamping `released_at`. Only a
    /// Holding row is updated; the affected-row count reports the outcome.
    fn release_escrow(
        &self,
        id: EscrowId,
        released_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// One consistent read of an escrow joined with its item and the approved
    /// claimant's contact details, used to prepare the release notification.
    fn escrow_release_view(
        &self,
        id: EscrowId,
    ) -> Result<Option<EscrowReleaseView>, RepositoryError>;

    /// Found items in Available or ClaimPending status, newest report first.
    fn listed_found_items(&self) -> Result<Vec<FoundItem>, RepositoryError>;

    /// Lost items still awaiting resolution (no status, or a status outside
    /// the closed set), newest report first.
    fn open_lost_items(&self) -> Result<Vec<LostItem>, RepositoryError>;

    /// Pending claims joined with claimant contact details and the claimed
    /// item, oldest request first. Claimant and item are outer-joined; rows
    /// survive either side going missing.
    fn pending_claims(&self) -> Result<Vec<PendingClaimView>, RepositoryError>;

    /// Holding escrows joined with their item and, where one exists, the
    /// approved claimant's name, newest escrow first.
    fn holding_escrows(&self) -> Result<Vec<HoldingEscrowView>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Review-queue row: a pending claim with the claimant's contact details and
/// the current state of the claimed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingClaimView {
    pub claim: ClaimRequest,
    pub claimant_name: Option<String>,
    pub claimant_email: Option<String>,
    pub item_name: Option<String>,
    pub item_status: Option<FoundItemStatus>,
}

/// Handover-queue row: a Holding escrow with its item and the approved
/// claimant's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingEscrowView {
    pub escrow: Escrow,
    pub found_id: FoundItemId,
    pub item_name: String,
    pub claimant_name: Option<String>,
}

/// Snapshot assembled for an escrow release: the escrow row, the item it
/// holds, and whatever contact details exist for the approved claimant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowReleaseView {
    pub escrow: Escrow,
    pub found_id: FoundItemId,
    pub item_name: String,
    pub claimant_name: Option<String>,
    pub claimant_email: Option<String>,
}

/// Trait describing the outbound transactional-mail hook. Delivery failures
/// are the caller's problem to log; the engine never fails an operation over
/// a notification.
pub trait ClaimantNotifier: Send + Sync {
    fn send(&self, notice: ReleaseNotice) -> Result<(), NotifyError>;
}

/// Transactional message handed to the notifier on a successful release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotice {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}
