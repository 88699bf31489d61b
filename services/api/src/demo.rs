use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::Args;

use lostfound::error::AppError;
use lostfound::workflows::recovery::{
    ClaimDecision, FoundItemReport, LifecycleService, LostItemReport, RecoveryRepository,
};

use crate::infra::{InMemoryClaimantNotifier, InMemoryRecoveryRepository};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject the demo claim instead of approving it.
    #[arg(long)]
    pub(crate) reject: bool,
    /// Stop after the admin review, before the escrow release.
    #[arg(long)]
    pub(crate) skip_release: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        reject,
        skip_release,
    } = args;

    println!("Lost & Found recovery demo");

    let repository = Arc::new(InMemoryRecoveryRepository::default());
    let notifier = Arc::new(InMemoryClaimantNotifier::new("no-reply@lostfound.local"));
    let service = Arc::new(LifecycleService::new(repository.clone(), notifier.clone()));

    let reporter = repository.seed_user("Desk Clerk", "desk@lostfound.local");
    let claimant = repository.seed_user("Maya Chen", "maya@example.com");
    let today = Local::now().date_naive();

    let item = match service.report_found(Some(reporter), demo_found_report(today)) {
        Ok(item) => item,
        Err(err) => {
            println!("  Found-item report rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Reported found item #{} \"{}\" -> status {}",
        item.id.0,
        item.item_name,
        item.status.label()
    );

    if let Ok(lost) = service.report_lost(Some(claimant), demo_lost_report(today)) {
        println!(
            "- Reported lost item #{} \"{}\" for cross-checking",
            lost.id.0, lost.item_name
        );
    }

    match service.list_found_items() {
        Ok(listing) => println!("- Public found-item listing carries {} entry", listing.len()),
        Err(err) => println!("  Listing unavailable: {err}"),
    }

    let claim = match service.submit_claim(item.id, Some(claimant)) {
        Ok(claim) => claim,
        Err(err) => {
            println!("  Claim rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Claim #{} submitted by user #{} -> item now {}",
        claim.id.0,
        claimant.0,
        repository
            .found_item(item.id)
            .ok()
            .flatten()
            .map(|item| item.status.label())
            .unwrap_or("unknown")
    );

    // A second submission by the same user must bounce off the uniqueness rule.
    if let Err(err) = service.submit_claim(item.id, Some(claimant)) {
        println!("- Repeat claim refused: {err}");
    }

    if let Ok(queue) = service.pending_claims() {
        println!("- Admin review queue holds {} claim(s):", queue.len());
        for view in &queue {
            println!(
                "    claim #{} by {} for \"{}\"",
                view.claim.id.0,
                view.claimant_name.as_deref().unwrap_or("unknown"),
                view.item_name.as_deref().unwrap_or("unknown item")
            );
        }
    }

    let decision = if reject {
        ClaimDecision::Reject
    } else {
        ClaimDecision::Approve
    };
    let review = match service.review_claim(claim.id, decision) {
        Ok(review) => review,
        Err(err) => {
            println!("  Review failed: {err}");
            return Ok(());
        }
    };
    println!("- Admin review recorded: claim is now {}", review.status.label());

    let Some(escrow) = review.escrow else {
        println!("- No escrow to release; item returned to the listing");
        return Ok(());
    };
    println!(
        "- Escrow #{} holds item #{} for handover",
        escrow.id.0, escrow.found_id.0
    );
    if let Ok(holding) = service.holding_escrows() {
        println!(
            "- Admin handover queue holds {} escrow(s)",
            holding.len()
        );
    }

    if skip_release {
        println!("- Release skipped on request; escrow left holding");
        return Ok(());
    }

    match service.release_escrow(escrow.id) {
        Ok(release) => {
            println!(
                "- Escrow released at {} (claimant notified: {})",
                release.released_at, release.notified
            );
        }
        Err(err) => println!("  Release failed: {err}"),
    }

    // Releasing again demonstrates the informational repeat-release outcome.
    if let Err(err) = service.release_escrow(escrow.id) {
        println!("- Repeat release reported: {err}");
    }

    for notice in notifier.sent() {
        println!("  Outbound notice -> {}: {}", notice.to, notice.subject);
    }

    Ok(())
}

fn demo_found_report(found_date: NaiveDate) -> FoundItemReport {
    FoundItemReport {
        item_name: "Black umbrella".to_string(),
        category: "Accessories".to_string(),
        description: Some("Left near the east entrance".to_string()),
        found_date,
        found_location: "Main hall".to_string(),
    }
}

fn demo_lost_report(lost_date: NaiveDate) -> LostItemReport {
    LostItemReport {
        item_name: "Black umbrella".to_string(),
        category: "Accessories".to_string(),
        description: Some("Wooden handle, small tear".to_string()),
        lost_date,
        lost_location: "Near the main hall".to_string(),
    }
}
