use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use lostfound::config::AppConfig;
use lostfound::error::AppError;
use lostfound::telemetry;
use lostfound::workflows::recovery::LifecycleService;

use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryClaimantNotifier, InMemoryRecoveryRepository};
use crate::routes::with_recovery_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryRecoveryRepository::default());
    let notifier = Arc::new(InMemoryClaimantNotifier::new(
        config.mail.from_address.clone(),
    ));
    let lifecycle_service = Arc::new(LifecycleService::new(repository, notifier));

    let app = with_recovery_routes(lifecycle_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lost-and-found recovery service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
