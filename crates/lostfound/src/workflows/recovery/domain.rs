use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for reported found items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FoundItemId(pub u64);

/// Identifier wrapper for reported lost items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LostItemId(pub u64);

/// Identifier wrapper for claim requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub u64);

/// Identifier wrapper for escrow holding records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EscrowId(pub u64);

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Status tracked on a found item throughout the claim lifecycle.
///
/// `Available` items may be claimed; a submitted claim moves the item to
/// `ClaimPending`; an approved claim moves it to `Matched` (held in escrow for
/// its claimant); a rejected claim returns it to `Available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoundItemStatus {
    Available,
    ClaimPending,
    Matched,
}

impl FoundItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FoundItemStatus::Available => "available",
            FoundItemStatus::ClaimPending => "claim_pending",
            FoundItemStatus::Matched => "matched",
        }
    }

    /// Whether an item in this status appears in the public found-item listing.
    pub const fn is_listed(self) -> bool {
        matches!(
            self,
            FoundItemStatus::Available | FoundItemStatus::ClaimPending
        )
    }
}

/// Status tracked on a lost-item report.
///
/// Lost items are read-only to the lifecycle engine beyond the initial report;
/// legacy rows may carry no status at all, which listings must tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LostItemStatus {
    Reported,
    Matched,
    Returned,
    Found,
    Closed,
}

impl LostItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LostItemStatus::Reported => "reported",
            LostItemStatus::Matched => "matched",
            LostItemStatus::Returned => "returned",
            LostItemStatus::Found => "found",
            LostItemStatus::Closed => "closed",
        }
    }

    /// Whether a lost item in this status still appears in the active listing.
    /// A missing status counts as active.
    pub fn is_open(status: Option<Self>) -> bool {
        !matches!(
            status,
            Some(
                LostItemStatus::Matched
                    | LostItemStatus::Returned
                    | LostItemStatus::Found
                    | LostItemStatus::Closed
            )
        )
    }
}

/// Status of a claim request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        }
    }
}

/// Status of an escrow holding record. Holding -> Released is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    Holding,
    Released,
}

impl EscrowStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EscrowStatus::Holding => "holding",
            EscrowStatus::Released => "released",
        }
    }
}

/// A found item reported to the desk, tracked through the claim lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundItem {
    pub id: FoundItemId,
    pub reporter: UserId,
    pub item_name: String,
    pub category: String,
    pub description: Option<String>,
    pub found_date: NaiveDate,
    pub found_location: String,
    pub status: FoundItemStatus,
    pub reported_at: DateTime<Utc>,
}

/// A lost-item report. Read-only to the lifecycle engine after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostItem {
    pub id: LostItemId,
    pub reporter: UserId,
    pub item_name: String,
    pub category: String,
    pub description: Option<String>,
    pub lost_date: NaiveDate,
    pub lost_location: String,
    pub status: Option<LostItemStatus>,
    pub reported_at: DateTime<Utc>,
}

/// A user's assertion of ownership over a found item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub id: ClaimId,
    pub found_id: FoundItemId,
    pub claimant: UserId,
    pub status: ClaimStatus,
    pub requested_at: DateTime<Utc>,
}

/// Custody record for a found item awaiting physical handover to its
/// approved claimant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub found_id: FoundItemId,
    pub status: EscrowStatus,
    pub claimed_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// Registered account. The lifecycle engine only ever reads these rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// Inbound payload describing a found item being reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundItemReport {
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub found_date: NaiveDate,
    pub found_location: String,
}

/// Inbound payload describing a lost item being reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostItemReport {
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub lost_date: NaiveDate,
    pub lost_location: String,
}

/// Admin decision applied to a pending claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimDecision {
    Approve,
    Reject,
}
