use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_grading_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use card_grader::config::AppConfig;
use card_grader::error::AppError;
use card_grader::grading::GradingEngine;
use card_grader::telemetry;
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
    let engine = Arc::new(GradingEngine::new(config.grading.clone()));
    let app_state = AppState::new(prometheus_handle, engine);
    let readiness_flag = app_state.readiness.clone();

    let app = with_grading_routes(&app_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        log_only = config.grading.validator.log_only,
        statistical_hard_cap = config.grading.validator.statistical_hard_cap,
        "card grading service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
