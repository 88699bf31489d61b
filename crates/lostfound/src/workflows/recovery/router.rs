use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ClaimDecision, ClaimId, EscrowId, FoundItemId, FoundItemReport, LostItemReport, UserId,
};
use super::repository::{ClaimantNotifier, RecoveryRepository};
use super::service::{LifecycleError, LifecycleService, TransitionBlock};

/// Router builder exposing the lifecycle operations over HTTP.
///
/// Caller identity arrives in the `x-user-id` header, stamped by whatever
/// authentication layer fronts this service; the engine itself only sees an
/// explicit `Option<UserId>`.
pub fn recovery_router<R, N>(service: Arc<LifecycleService<R, N>>) -> Router
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/recovery/found-items",
            get(list_found_handler::<R, N>).post(report_found_handler::<R, N>),
        )
        .route(
            "/api/v1/recovery/lost-items",
            get(list_lost_handler::<R, N>).post(report_lost_handler::<R, N>),
        )
        .route(
            "/api/v1/recovery/found-items/:found_id/claims",
            post(submit_claim_handler::<R, N>),
        )
        .route(
            "/api/v1/recovery/claims",
            get(list_pending_claims_handler::<R, N>),
        )
        .route(
            "/api/v1/recovery/claims/:claim_id/review",
            post(review_claim_handler::<R, N>),
        )
        .route(
            "/api/v1/recovery/escrows",
            get(list_holding_escrows_handler::<R, N>),
        )
        .route(
            "/api/v1/recovery/escrows/:escrow_id/release",
            post(release_escrow_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) decision: ClaimDecision,
}

pub(crate) fn caller_identity(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get("x-user-id")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(UserId)
}

pub(crate) async fn report_found_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
    headers: HeaderMap,
    axum::Json(report): axum::Json<FoundItemReport>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.report_found(caller_identity(&headers), report) {
        Ok(item) => (StatusCode::CREATED, axum::Json(item)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_lost_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
    headers: HeaderMap,
    axum::Json(report): axum::Json<LostItemReport>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.report_lost(caller_identity(&headers), report) {
        Ok(item) => (StatusCode::CREATED, axum::Json(item)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_found_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.list_found_items() {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_lost_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.list_lost_items() {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_pending_claims_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.pending_claims() {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_holding_escrows_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.holding_escrows() {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_claim_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
    Path(found_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.submit_claim(FoundItemId(found_id), caller_identity(&headers)) {
        Ok(claim) => {
            let payload = json!({
                "claim_id": claim.id.0,
                "found_id": claim.found_id.0,
                "status": claim.status.label(),
                "requested_at": claim.requested_at,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_claim_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
    Path(claim_id): Path<u64>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.review_claim(ClaimId(claim_id), request.decision) {
        Ok(review) => {
            let payload = json!({
                "claim_id": review.claim_id.0,
                "found_id": review.found_id.0,
                "status": review.status.label(),
                "escrow_id": review.escrow.as_ref().map(|escrow| escrow.id.0),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn release_escrow_handler<R, N>(
    State(service): State<Arc<LifecycleService<R, N>>>,
    Path(escrow_id): Path<u64>,
) -> Response
where
    R: RecoveryRepository + 'static,
    N: ClaimantNotifier + 'static,
{
    match service.release_escrow(EscrowId(escrow_id)) {
        Ok(release) => {
            let payload = json!({
                "escrow_id": release.escrow_id.0,
                "found_id": release.found_id.0,
                "item_name": release.item_name,
                "status": "released",
                "released_at": release.released_at,
                "claimant_notified": release.notified,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        // A repeat release is informational, not an error, to the caller.
        Err(LifecycleError::InvalidState(TransitionBlock::EscrowNotHolding)) => {
            let payload = json!({
                "escrow_id": escrow_id,
                "status": "already_released_or_not_found",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: LifecycleError) -> Response {
    let status = match &err {
        LifecycleError::Unauthenticated => StatusCode::UNAUTHORIZED,
        LifecycleError::NotFound => StatusCode::NOT_FOUND,
        LifecycleError::DuplicateClaim | LifecycleError::InvalidState(_) => StatusCode::CONFLICT,
        LifecycleError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
