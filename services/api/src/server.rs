use crate::cli::ServeArgs;
use crate::infra::{AppState, HomeworkServices};
use crate::poller;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use homework_bot::config::AppConfig;
use homework_bot::error::AppError;
use homework_bot::telemetry;
use homework_bot::workflows::homework::homework_router;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = HomeworkServices::build(&config)?;
    let api = Arc::new(services.api(config.gitlab.webhook_secret.clone()));

    let app = with_operational_routes(homework_router(api))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    match config.poll.interval() {
        Some(period) if !args.no_poll => {
            poller::spawn(services.runner.clone(), period);
        }
        _ => info!("poll trigger disabled"),
    }

    info!(?config.environment, %addr, "homework bot ready");

    axum::serve(listener, app).await?;
    Ok(())
}
