use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::domain::{
    ClaimDecision, ClaimId, ClaimRequest, ClaimStatus, Escrow, EscrowId, EscrowStatus, FoundItem,
    FoundItemId, FoundItemReport, FoundItemStatus, LostItem, LostItemReport, UserId,
};
use super::repository::{
    ClaimantNotifier, EscrowReleaseView, HoldingEscrowView, PendingClaimView, RecoveryRepository,
    ReleaseNotice, RepositoryError,
};

/// The lifecycle engine: every legal transition between found-item, claim,
/// and escrow statuses happens through one of these operations. Transitions
/// formerly hidden in storage-layer triggers are performed explicitly here.
pub struct LifecycleService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
}

impl<R, N> LifecycleService<R, N>
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Record a found item on behalf of an authenticated reporter.
    pub fn report_found(
        &self,
        reporter: Option<UserId>,
        report: FoundItemReport,
    ) -> Result<FoundItem, LifecycleError> {
        let reporter = reporter.ok_or(LifecycleError::Unauthenticated)?;
        let item = self.repository.insert_found_item(reporter, report)?;
        Ok(item)
    }

    /// Record a lost item on behalf of an authenticated reporter.
    pub fn report_lost(
        &self,
        reporter: Option<UserId>,
        report: LostItemReport,
    ) -> Result<LostItem, LifecycleError> {
        let reporter = reporter.ok_or(LifecycleError::Unauthenticated)?;
        let item = self.repository.insert_lost_item(reporter, report)?;
        Ok(item)
    }

    /// Submit a claim for an available found item.
    ///
    /// The Available -> ClaimPending conditional update is the arbiter between
    /// racing claimants; the earlier existence and status reads only shape the
    /// error reported to the caller.
    pub fn submit_claim(
        &self,
        found_id: FoundItemId,
        claimant: Option<UserId>,
    ) -> Result<ClaimRequest, LifecycleError> {
        let claimant = claimant.ok_or(LifecycleError::Unauthenticated)?;

        let item = self
            .repository
            .found_item(found_id)?
            .ok_or(LifecycleError::NotFound)?;
        if item.status != FoundItemStatus::Available {
            return Err(LifecycleError::InvalidState(
                TransitionBlock::ItemNotAvailable,
            ));
        }

        if self
            .repository
            .claim_by_claimant(claimant, found_id)?
            .is_some()
        {
            return Err(LifecycleError::DuplicateClaim);
        }

        let moved = self.repository.update_found_item_status(
            found_id,
            FoundItemStatus::Available,
            FoundItemStatus::ClaimPending,
        )?;
        if moved == 0 {
            return Err(LifecycleError::InvalidState(
                TransitionBlock::ItemNotAvailable,
            ));
        }

        match self.repository.insert_claim(claimant, found_id) {
            Ok(claim) => Ok(claim),
            Err(RepositoryError::Conflict) => {
                // The claimant raced their own submission; undo the item move
                // so the winning claim row stays the only pending one.
                self.repository.update_found_item_status(
                    found_id,
                    FoundItemStatus::ClaimPending,
                    FoundItemStatus::Available,
                )?;
                Err(LifecycleError::DuplicateClaim)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Apply an admin decision to a pending claim, exactly once.
    ///
    /// Approval escrows the item (ClaimPending -> Matched, Holding escrow row
    /// created if absent); rejection returns it to Available.
    pub fn review_claim(
        &self,
        claim_id: ClaimId,
        decision: ClaimDecision,
    ) -> Result<ClaimReview, LifecycleError> {
        let claim = self
            .repository
            .claim(claim_id)?
            .ok_or(LifecycleError::NotFound)?;

        let next = match decision {
            ClaimDecision::Approve => ClaimStatus::Approved,
            ClaimDecision::Reject => ClaimStatus::Rejected,
        };

        let updated = self
            .repository
            .update_claim_status(claim_id, ClaimStatus::Pending, next)?;
        if updated == 0 {
            return Err(LifecycleError::InvalidState(
                TransitionBlock::ClaimNotPending,
            ));
        }

        let escrow = match decision {
            ClaimDecision::Approve => {
                let moved = self.repository.update_found_item_status(
                    claim.found_id,
                    FoundItemStatus::ClaimPending,
                    FoundItemStatus::Matched,
                )?;
                if moved == 0 {
                    // Escrow rows exist only for Matched items; an item that
                    // drifted out of ClaimPending does not get one.
                    warn!(
                        claim_id = claim_id.0,
                        found_id = claim.found_id.0,
                        "item was not awaiting this claim; escrow not created"
                    );
                    None
                } else {
                    Some(self.repository.ensure_escrow(claim.found_id)?)
                }
            }
            ClaimDecision::Reject => {
                let moved = self.repository.update_found_item_status(
                    claim.found_id,
                    FoundItemStatus::ClaimPending,
                    FoundItemStatus::Available,
                )?;
                if moved == 0 {
                    warn!(
                        claim_id = claim_id.0,
                        found_id = claim.found_id.0,
                        "item was not awaiting this claim; status left unchanged"
                    );
                }
                None
            }
        };

        Ok(ClaimReview {
            claim_id,
            found_id: claim.found_id,
            status: next,
            escrow,
        })
    }

    /// Release a held item to its claimant and attempt a confirmation email.
    ///
    /// The release itself is the source of truth; a notifier failure is logged
    /// and swallowed. Repeated calls after the first success report the escrow
    /// as no longer holding, with no further side effects.
    pub fn release_escrow(&self, escrow_id: EscrowId) -> Result<EscrowRelease, LifecycleError> {
        let view = match self.repository.escrow_release_view(escrow_id)? {
            Some(view) if view.escrow.status == EscrowStatus::Holding => view,
            _ => {
                return Err(LifecycleError::InvalidState(
                    TransitionBlock::EscrowNotHolding,
                ))
            }
        };

        let released_at = Utc::now();
        let updated = self.repository.release_escrow(escrow_id, released_at)?;
        if updated == 0 {
            return Err(LifecycleError::InvalidState(
                TransitionBlock::EscrowNotHolding,
            ));
        }

        let notified = self.notify_claimant(escrow_id, &view, released_at);

        Ok(EscrowRelease {
            escrow_id,
            found_id: view.found_id,
            item_name: view.item_name,
            released_at,
            notified,
        })
    }

    /// Found items open to claiming or under review, newest first.
    pub fn list_found_items(&self) -> Result<Vec<FoundItem>, LifecycleError> {
        Ok(self.repository.listed_found_items()?)
    }

    /// Lost items still awaiting resolution, newest first.
    pub fn list_lost_items(&self) -> Result<Vec<LostItem>, LifecycleError> {
        Ok(self.repository.open_lost_items()?)
    }

    /// The admin review queue: pending claims with claimant contact details
    /// and the current item state, oldest request first.
    pub fn pending_claims(&self) -> Result<Vec<PendingClaimView>, LifecycleError> {
        Ok(self.repository.pending_claims()?)
    }

    /// The admin handover queue: Holding escrows with their item and approved
    /// claimant, newest first.
    pub fn holding_escrows(&self) -> Result<Vec<HoldingEscrowView>, LifecycleError> {
        Ok(self.repository.holding_escrows()?)
    }

    fn notify_claimant(
        &self,
        escrow_id: EscrowId,
        view: &EscrowReleaseView,
        released_at: DateTime<Utc>,
    ) -> bool {
        let Some(email) = view.claimant_email.as_deref() else {
            warn!(
                escrow_id = escrow_id.0,
                "no claimant email on file; skipping release notification"
            );
            return false;
        };

        let notice = release_notice(
            email,
            view.claimant_name.as_deref(),
            &view.item_name,
            released_at,
        );
        match self.notifier.send(notice) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    escrow_id = escrow_id.0,
                    error = %err,
                    "release notification failed; release stands"
                );
                false
            }
        }
    }
}

fn release_notice(
    email: &str,
    claimant_name: Option<&str>,
    item_name: &str,
    released_at: DateTime<Utc>,
) -> ReleaseNotice {
    let greeting = claimant_name.unwrap_or("Claimant");
    let date = released_at.date_naive();
    ReleaseNotice {
        to: email.to_string(),
        subject: format!("Update on your claimed item: {item_name}"),
        text: format!(
            "Dear {greeting},\n\n\
             Your claimed item, \"{item_name}\", was processed and marked as \
             released on {date}. You can now collect it from the Lost & Found \
             desk. Please bring proof of identification.\n\n\
             Regards,\nLost & Found Administration"
        ),
        html: format!(
            "<p>Dear {greeting},</p>\
             <p>Your claimed item, \"<b>{item_name}</b>\", was processed and \
             marked as released on {date}.</p>\
             <p>You can now collect it from the <b>Lost &amp; Found desk</b>. \
             Please bring proof of identification.</p>\
             <hr><p>Regards,<br>Lost &amp; Found Administration</p>"
        ),
    }
}

/// Outcome of an admin claim review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimReview {
    pub claim_id: ClaimId,
    pub found_id: FoundItemId,
    pub status: ClaimStatus,
    pub escrow: Option<Escrow>,
}

/// Outcome of a successful escrow release.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscrowRelease {
    pub escrow_id: EscrowId,
    pub found_id: FoundItemId,
    pub item_name: String,
    pub released_at: DateTime<Utc>,
    pub notified: bool,
}

/// Error raised by the lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("referenced record does not exist")]
    NotFound,
    #[error("{0}")]
    InvalidState(TransitionBlock),
    #[error("a claim by this user for this item already exists")]
    DuplicateClaim,
    #[error("an authenticated user is required for this operation")]
    Unauthenticated,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Names the precondition status that blocked a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionBlock {
    ItemNotAvailable,
    ClaimNotPending,
    EscrowNotHolding,
}

impl fmt::Display for TransitionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionBlock::ItemNotAvailable => {
                write!(f, "item is no longer available for claiming")
            }
            TransitionBlock::ClaimNotPending => write!(f, "claim is not pending review"),
            TransitionBlock::EscrowNotHolding => {
                write!(f, "escrow already released or not found")
            }
        }
    }
}
