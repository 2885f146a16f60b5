use crate::cli::ServeArgs;
use crate::infra::{load_repository, AppState};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hustlr::config::AppConfig;
use hustlr::error::AppError;
use hustlr::marketplace::Marketplace;
use hustlr::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(fixture) = args.fixture.take() {
        config.storage.fixture_path = Some(fixture);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let cost = config.security.bcrypt_cost;
    let repository = load_repository(config.storage.fixture_path.as_deref(), cost)?;
    let marketplace = Arc::new(Marketplace::new(Arc::new(repository), cost));

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hustlr marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
