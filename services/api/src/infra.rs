use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use lostfound::workflows::recovery::{
    ClaimId, ClaimRequest, ClaimStatus, ClaimantNotifier, Escrow, EscrowId, EscrowReleaseView,
    EscrowStatus, FoundItem, FoundItemId, FoundItemReport, FoundItemStatus, HoldingEscrowView,
    LostItem, LostItemId, LostItemReport, LostItemStatus, NotifyError, PendingClaimView,
    RecoveryRepository, ReleaseNotice, RepositoryError, User, UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Tables {
    found: BTreeMap<FoundItemId, FoundItem>,
    lost: BTreeMap<LostItemId, LostItem>,
    claims: BTreeMap<ClaimId, ClaimRequest>,
    escrows: BTreeMap<EscrowId, Escrow>,
    users: BTreeMap<UserId, User>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory backing store for the lifecycle engine. Rows live for the
/// lifetime of the process; the conditional-update methods report affected
/// rows the way the relational store would.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRecoveryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRecoveryRepository {
    pub(crate) fn seed_user(&self, name: &str, email: &str) -> UserId {
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        let id = UserId(tables.next_id());
        tables.users.insert(
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
}

impl RecoveryRepository for InMemoryRecoveryRepository {
    fn insert_found_item(
        &self,
        reporter: UserId,
        report: FoundItemReport,
    ) -> Result<FoundItem, RepositoryError> {
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        let id = FoundItemId(tables.next_id());
        let item = FoundItem {
            id,
            reporter,
            item_name: report.item_name,
            category: report.category,
            description: report.description,
            found_date: report.found_date,
            found_location: report.found_location,
            status: FoundItemStatus::Available,
            reported_at: Utc::now(),
        };
        tables.found.insert(id, item.clone());
        Ok(item)
    }

    fn insert_lost_item(
        &self,
        reporter: UserId,
        report: LostItemReport,
    ) -> Result<LostItem, RepositoryError> {
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        let id = LostItemId(tables.next_id());
        let item = LostItem {
            id,
            reporter,
            item_name: report.item_name,
            category: report.category,
            description: report.description,
            lost_date: report.lost_date,
            lost_location: report.lost_location,
            status: Some(LostItemStatus::Reported),
            reported_at: Utc::now(),
        };
        tables.lost.insert(id, item.clone());
        Ok(item)
    }

    fn found_item(&self, id: FoundItemId) -> Result<Option<FoundItem>, RepositoryError> {
        let tables = self.tables.lock().expect("repository mutex poisoned");
        Ok(tables.found.get(&id).cloned())
    }

    fn claim(&self, id: ClaimId) -> Result<Option<ClaimRequest>, RepositoryError> {
        let tables = self.tables.lock().expect("repository mutex poisoned");
        Ok(tables.claims.get(&id).cloned())
    }

    fn claim_by_claimant(
        &self,
        claimant: UserId,
        found_id: FoundItemId,
    ) -> Result<Option<ClaimRequest>, RepositoryError> {
        let tables = self.tables.lock().expect("repository mutex poisoned");
        Ok(tables
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
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        let duplicate = tables
            .claims
            .values()
            .any(|claim| claim.claimant == claimant && claim.found_id == found_id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        let id = ClaimId(tables.next_id());
        let claim = ClaimRequest {
            id,
            found_id,
            claimant,
            status: ClaimStatus::Pending,
            requested_at: Utc::now(),
        };
        tables.claims.insert(id, claim.clone());
        Ok(claim)
    }

    fn update_found_item_status(
        &self,
        id: FoundItemId,
        expected: FoundItemStatus,
        next: FoundItemStatus,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        match tables.found.get_mut(&id) {
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
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        match tables.claims.get_mut(&id) {
            Some(claim) if claim.status == expected => {
                claim.status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn ensure_escrow(&self, found_id: FoundItemId) -> Result<Escrow, RepositoryError> {
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        if let Some(existing) = tables
            .escrows
            .values()
            .find(|escrow| escrow.found_id == found_id)
        {
            return Ok(existing.clone());
        }
        let id = EscrowId(tables.next_id());
        let escrow = Escrow {
            id,
            found_id,
            status: EscrowStatus::Holding,
            claimed_at: Utc::now(),
            released_at: None,
        };
        tables.escrows.insert(id, escrow.clone());
        Ok(escrow)
    }

    fn release_escrow(
        &self,
        id: EscrowId,
        released_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.lock().expect("repository mutex poisoned");
        match tables.escrows.get_mut(&id) {
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
        let tables = self.tables.lock().expect("repository mutex poisoned");
        let Some(escrow) = tables.escrows.get(&id) else {
            return Ok(None);
        };
        let Some(item) = tables.found.get(&escrow.found_id) else {
            return Ok(None);
        };
        let claimant = tables
            .claims
            .values()
            .find(|claim| {
                claim.found_id == escrow.found_id && claim.status == ClaimStatus::Approved
            })
            .and_then(|claim| tables.users.get(&claim.claimant));
        Ok(Some(EscrowReleaseView {
            escrow: escrow.clone(),
            found_id: escrow.found_id,
            item_name: item.item_name.clone(),
            claimant_name: claimant.map(|user| user.name.clone()),
            claimant_email: claimant.map(|user| user.email.clone()),
        }))
    }

    fn listed_found_items(&self) -> Result<Vec<FoundItem>, RepositoryError> {
        let tables = self.tables.lock().expect("repository mutex poisoned");
        let mut items: Vec<FoundItem> = tables
            .found
            .values()
            .filter(|item| item.status.is_listed())
            .cloned()
            .collect();
        items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    fn open_lost_items(&self) -> Result<Vec<LostItem>, RepositoryError> {
        let tables = self.tables.lock().expect("repository mutex poisoned");
        let mut items: Vec<LostItem> = tables
            .lost
            .values()
            .filter(|item| LostItemStatus::is_open(item.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    fn pending_claims(&self) -> Result<Vec<PendingClaimView>, RepositoryError> {
        let tables = self.tables.lock().expect("repository mutex poisoned");
        let mut views: Vec<PendingClaimView> = tables
            .claims
            .values()
            .filter(|claim| claim.status == ClaimStatus::Pending)
            .map(|claim| {
                let claimant = tables.users.get(&claim.claimant);
                let item = tables.found.get(&claim.found_id);
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
        let tables = self.tables.lock().expect("repository mutex poisoned");
        let mut views: Vec<HoldingEscrowView> = tables
            .escrows
            .values()
            .filter(|escrow| escrow.status == EscrowStatus::Holding)
            .filter_map(|escrow| {
                let item = tables.found.get(&escrow.found_id)?;
                let claimant = tables
                    .claims
                    .values()
                    .find(|claim| {
                        claim.found_id == escrow.found_id && claim.status == ClaimStatus::Approved
                    })
                    .and_then(|claim| tables.users.get(&claim.claimant));
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

/// Notifier that records every release notice and logs it instead of
/// delivering mail. Stands in for the SMTP transport outside production.
#[derive(Default, Clone)]
pub(crate) struct InMemoryClaimantNotifier {
    from_address: String,
    sent: Arc<Mutex<Vec<ReleaseNotice>>>,
}

impl InMemoryClaimantNotifier {
    pub(crate) fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
            sent: Arc::default(),
        }
    }

    pub(crate) fn sent(&self) -> Vec<ReleaseNotice> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ClaimantNotifier for InMemoryClaimantNotifier {
    fn send(&self, notice: ReleaseNotice) -> Result<(), NotifyError> {
        info!(
            from = %self.from_address,
            to = %notice.to,
            subject = %notice.subject,
            "release notice recorded"
        );
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}
