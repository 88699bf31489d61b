use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::workflows::recovery::domain::{
    ClaimId, ClaimRequest, ClaimStatus, Escrow, EscrowId, EscrowStatus, FoundItem, FoundItemId,
    FoundItemReport, FoundItemStatus, LostItem, LostItemId, LostItemReport, LostItemStatus, User,
    UserId,
};
use crate::workflows::recovery::repository::{
    ClaimantNotifier, EscrowReleaseView, HoldingEscrowView, NotifyError, PendingClaimView,
    RecoveryRepository, ReleaseNotice, RepositoryError,
};
use crate::workflows::recovery::router::recovery_router;
use crate::workflows::recovery::service::LifecycleService;

pub(super) fn found_report() -> FoundItemReport {
    FoundItemReport {
        item_name: "Black umbrella".to_string(),
        category: "Accessories".to_string(),
        description: Some("Left near the east entrance".to_string()),
        found_date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"),
        found_location: "Main hall".to_string(),
    }
}

pub(super) fn lost_report() -> LostItemReport {
    LostItemReport {
        item_name: "Silver wristwatch".to_string(),
        category: "Jewelry".to_string(),
        description: None,
        lost_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
        lost_location: "Cafeteria".to_string(),
    }
}

pub(super) fn timestamp(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[derive(Default)]
struct Inner {
    found: BTreeMap<FoundItemId, FoundItem>,
    lost: BTreeMap<LostItemId, LostItem>,
    claims: BTreeMap<ClaimId, ClaimRequest>,
    escrows: BTreeMap<EscrowId, Escrow>,
    users: BTreeMap<UserId, User>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory stand-in for the relational store, honoring the same
/// conditional-update and uniqueness contracts.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRepository {
    pub(super) fn seed_user(&self, name: &str, email: &str) -> UserId {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let id = UserId(inner.next_id());
        inner.users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
                password_hash: "$2b$10$seeded".to_string(),
            },
        );
        id
    }

    pub(super) fn seed_found_item_at(
        &self,
        reporter: UserId,
        report: FoundItemReport,
        reported_at: DateTime<Utc>,
    ) -> FoundItem {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let id = FoundItemId(inner.next_id());
        let item = FoundItem {
            id,
            reporter,
            item_name: report.item_name,
            category: report.category,
            description: report.description,
            found_date: report.found_date,
            found_location: report.found_location,
            status: FoundItemStatus::Available,
            reported_at,
        };
        inner.found.insert(id, item.clone());
        item
    }

    pub(super) fn seed_lost_item_at(
        &self,
        reporter: UserId,
        report: LostItemReport,
        status: Option<LostItemStatus>,
        reported_at: DateTime<Utc>,
    ) -> LostItem {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let id = LostItemId(inner.next_id());
        let item = LostItem {
            id,
            reporter,
            item_name: report.item_name,
            category: report.category,
            description: report.description,
            lost_date: report.lost_date,
            lost_location: report.lost_location,
            status,
            reported_at,
        };
        inner.lost.insert(id, item.clone());
        item
    }

    pub(super) fn found_status(&self, id: FoundItemId) -> Option<FoundItemStatus> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        inner.found.get(&id).map(|item| item.status)
    }

    pub(super) fn claim_count(&self) -> usize {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        inner.claims.len()
    }

    pub(super) fn escrow_rows(&self) -> Vec<Escrow> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        inner.escrows.values().cloned().collect()
    }

    pub(super) fn escrow(&self, id: EscrowId) -> Option<Escrow> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        inner.escrows.get(&id).cloned()
    }
}

impl RecoveryRepository for MemoryRepository {
    fn insert_found_item(
        &self,
        reporter: UserId,
        report: FoundItemReport,
    ) -> Result<FoundItem, RepositoryError> {
        Ok(self.seed_found_item_at(reporter, report, Utc::now()))
    }

    fn insert_lost_item(
        &self,
        reporter: UserId,
        report: LostItemReport,
    ) -> Result<LostItem, RepositoryError> {
        Ok(self.seed_lost_item_at(
            reporter,
            report,
            Some(LostItemStatus::Reported),
            Utc::now(),
        ))
    }

    fn found_item(&self, id: FoundItemId) -> Result<Option<FoundItem>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.found.get(&id).cloned())
    }

    fn claim(&self, id: ClaimId) -> Result<Option<ClaimRequest>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.claims.get(&id).cloned())
    }

    fn claim_by_claimant(
        &self,
        claimant: UserId,
        found_id: FoundItemId,
    ) -> Result<Option<ClaimRequest>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner
            .claims
            .values()
            .find(|claim| claim.claimant == claimant && claim.found_id == found_id)
            .cloned())
    }

    fn insert_claim(
        &self,
        claimant: UserId,
        found_id: FoundItemId,
    ) -> Result<ClaimRequest, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let duplicate = inner
            .claims
            .values()
            .any(|claim| claim.claimant == claimant && claim.found_id == found_id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        let id = ClaimId(inner.next_id());
        let claim = ClaimRequest {
            id,
            found_id,
            claimant,
            status: ClaimStatus::Pending,
            requested_at: Utc::now(),
        };
        inner.claims.insert(id, claim.clone());
        Ok(claim)
    }

    fn update_found_item_status(
        &self,
        id: FoundItemId,
        expected: FoundItemStatus,
        next: FoundItemStatus,
    ) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        match inner.found.get_mut(&id) {
            Some(item) if item.status == expected => {
                item.status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn update_claim_status(
        &self,
        id: ClaimId,
        expected: ClaimStatus,
        next: ClaimStatus,
    ) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        match inner.claims.get_mut(&id) {
            Some(claim) if claim.status == expected => {
                claim.status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn ensure_escrow(&self, found_id: FoundItemId) -> Result<Escrow, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if let Some(existing) = inner
            .escrows
            .values()
            .find(|escrow| escrow.found_id == found_id)
        {
            return Ok(existing.clone());
        }
        let id = EscrowId(inner.next_id());
        let escrow = Escrow {
            id,
            found_id,
            status: EscrowStatus::Holding,
            claimed_at: Utc::now(),
            released_at: None,
        };
        inner.escrows.insert(id, escrow.clone());
        Ok(escrow)
    }

    fn release_escrow(
        &self,
        id: EscrowId,
        released_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        match inner.escrows.get_mut(&id) {
            Some(escrow) if escrow.status == EscrowStatus::Holding => {
                escrow.status = EscrowStatus::Released;
                escrow.released_at = Some(released_at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn escrow_release_view(
        &self,
        id: EscrowId,
    ) -> Result<Option<EscrowReleaseView>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(escrow) = inner.escrows.get(&id) else {
            return Ok(None);
        };
        let Some(item) = inner.found.get(&escrow.found_id) else {
            return Ok(None);
        };
        let claimant = inner
            .claims
            .values()
            .find(|claim| {
                claim.found_id == escrow.found_id && claim.status == ClaimStatus::Approved
            })
            .and_then(|claim| inner.users.get(&claim.claimant));
        Ok(Some(EscrowReleaseView {
            escrow: escrow.clone(),
            found_id: escrow.found_id,
            item_name: item.item_name.clone(),
            claimant_name: claimant.map(|user| user.name.clone()),
            claimant_email: claimant.map(|user| user.email.clone()),
        }))
    }

    fn listed_found_items(&self) -> Result<Vec<FoundItem>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut items: Vec<FoundItem> = inner
            .found
            .values()
            .filter(|item| item.status.is_listed())
            .cloned()
            .collect();
        items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    fn open_lost_items(&self) -> Result<Vec<LostItem>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut items: Vec<LostItem> = inner
            .lost
            .values()
            .filter(|item| LostItemStatus::is_open(item.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    fn pending_claims(&self) -> Result<Vec<PendingClaimView>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut views: Vec<PendingClaimView> = inner
            .claims
            .values()
            .filter(|claim| claim.status == ClaimStatus::Pending)
            .map(|claim| {
                let claimant = inner.users.get(&claim.claimant);
                let item = inner.found.get(&claim.found_id);
                PendingClaimView {
                    claim: claim.clone(),
                    claimant_name: claimant.map(|user| user.name.clone()),
                    claimant_email: claimant.map(|user| user.email.clone()),
                    item_name: item.map(|item| item.item_name.clone()),
                    item_status: item.map(|item| item.status),
                }
            })
            .collect();
        views.sort_by(|a, b| {
            a.claim
                .requested_at
                .cmp(&b.claim.requested_at)
                .then(a.claim.id.cmp(&b.claim.id))
        });
        Ok(views)
    }

    fn holding_escrows(&self) -> Result<Vec<HoldingEscrowView>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut views: Vec<HoldingEscrowView> = inner
            .escrows
            .values()
            .filter(|escrow| escrow.status == EscrowStatus::Holding)
            .filter_map(|escrow| {
                let item = inner.found.get(&escrow.found_id)?;
                let claimant = inner
                    .claims
                    .values()
                    .find(|claim| {
                        claim.found_id == escrow.found_id && claim.status == ClaimStatus::Approved
                    })
                    .and_then(|claim| inner.users.get(&claim.claimant));
                Some(HoldingEscrowView {
                    escrow: escrow.clone(),
                    found_id: escrow.found_id,
                    item_name: item.item_name.clone(),
                    claimant_name: claimant.map(|user| user.name.clone()),
                })
            })
            .collect();
        views.sort_by(|a, b| {
            b.escrow
                .claimed_at
                .cmp(&a.escrow.claimed_at)
                .then(b.escrow.id.cmp(&a.escrow.id))
        });
        Ok(views)
    }
}

/// Notifier double collecting every notice it was asked to send.
#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    sent: Arc<Mutex<Vec<ReleaseNotice>>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<ReleaseNotice> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ClaimantNotifier for RecordingNotifier {
    fn send(&self, notice: ReleaseNotice) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

/// Notifier double whose transport always fails.
#[derive(Default, Clone)]
pub(super) struct FailingNotifier {
    attempts: Arc<Mutex<u32>>,
}

impl FailingNotifier {
    pub(super) fn attempts(&self) -> u32 {
        *self.attempts.lock().expect("notifier mutex poisoned")
    }
}

impl ClaimantNotifier for FailingNotifier {
    fn send(&self, _notice: ReleaseNotice) -> Result<(), NotifyError> {
        *self.attempts.lock().expect("notifier mutex poisoned") += 1;
        Err(NotifyError::Transport("smtp connection refused".to_string()))
    }
}

/// Repository double simulating a store outage.
pub(super) struct UnavailableRepository;

impl RecoveryRepository for UnavailableRepository {
    fn insert_found_item(
        &self,
        _reporter: UserId,
        _report: FoundItemReport,
    ) -> Result<FoundItem, RepositoryError> {
        Err(offline())
    }

    fn insert_lost_item(
        &self,
        _reporter: UserId,
        _report: LostItemReport,
    ) -> Result<LostItem, RepositoryError> {
        Err(offline())
    }

    fn found_item(&self, _id: FoundItemId) -> Result<Option<FoundItem>, RepositoryError> {
        Err(offline())
    }

    fn claim(&self, _id: ClaimId) -> Result<Option<ClaimRequest>, RepositoryError> {
        Err(offline())
    }

    fn claim_by_claimant(
        &self,
        _claimant: UserId,
        _found_id: FoundItemId,
    ) -> Result<Option<ClaimRequest>, RepositoryError> {
        Err(offline())
    }

    fn insert_claim(
        &self,
        _claimant: UserId,
        _found_id: FoundItemId,
    ) -> Result<ClaimRequest, RepositoryError> {
        Err(offline())
    }

    fn update_found_item_status(
        &self,
        _id: FoundItemId,
        _expected: FoundItemStatus,
        _next: FoundItemStatus,
    ) -> Result<u64, RepositoryError> {
        Err(offline())
    }

    fn update_claim_status(
        &self,
        _id: ClaimId,
        _expected: ClaimStatus,
        _next: ClaimStatus,
    ) -> Result<u64, RepositoryError> {
        Err(offline())
    }

    fn ensure_escrow(&self, _found_id: FoundItemId) -> Result<Escrow, RepositoryError> {
        Err(offline())
    }

    fn release_escrow(
        &self,
        _id: EscrowId,
        _released_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        Err(offline())
    }

    fn escrow_release_view(
        &self,
        _id: EscrowId,
    ) -> Result<Option<EscrowReleaseView>, RepositoryError> {
        Err(offline())
    }

    fn listed_found_items(&self) -> Result<Vec<FoundItem>, RepositoryError> {
        Err(offline())
    }

    fn open_lost_items(&self) -> Result<Vec<LostItem>, RepositoryError> {
        Err(offline())
    }

    fn pending_claims(&self) -> Result<Vec<PendingClaimView>, RepositoryError> {
        Err(offline())
    }

    fn holding_escrows(&self) -> Result<Vec<HoldingEscrowView>, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) fn build_service() -> (
    LifecycleService<MemoryRepository, RecordingNotifier>,
    Arc<MemoryRepository>,
    Arc<RecordingNotifier>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = LifecycleService::new(repository.clone(), notifier.clone());
    (service, repository, notifier)
}

pub(super) fn recovery_router_with_service(
    service: LifecycleService<MemoryRepository, RecordingNotifier>,
) -> axum::Router {
    recovery_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
