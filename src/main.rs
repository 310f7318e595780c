use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use meeting_report_server::config::AppConfig;
use meeting_report_server::domain::ai::build_client;
use meeting_report_server::domain::report::retry::RetryPolicy;
use meeting_report_server::domain::report::template::PromptTemplate;
use meeting_report_server::logging::init_logging;
use meeting_report_server::shutdown::Shutdown;
use meeting_report_server::{create_router, AppState, WorkerSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let _log_guard = init_logging(&log_dir);

    let config = AppConfig::from_env()?;

    // 템플릿을 읽지 못하면 서버를 띄우지 않는다
    let template = PromptTemplate::load(&config.prompt_template_path).map_err(|e| {
        tracing::error!(error = %e, "Failed to load prompt template");
        e
    })?;

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed, /metrics disabled");
            None
        }
    };

    let client = build_client(&config);
    let policy = RetryPolicy::from_config(&config);
    tracing::info!(
        max_attempts = policy.max_attempts,
        initial_delay_ms = policy.initial_delay.as_millis() as u64,
        attempt_timeout_secs = policy.attempt_timeout.as_secs(),
        "Retry policy configured"
    );

    let shutdown = Shutdown::new();
    let (state, workers) = AppState::new(
        client,
        Arc::new(template),
        policy,
        WorkerSettings::from_config(&config),
        shutdown.clone(),
        metrics,
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, provider = config.ai_provider.code(), "Server started");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().wait_for_signal())
        .await?;

    // 시그널 없이 서버가 끝난 경우에도 워커를 멈춘다
    shutdown.trigger();
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Report worker exited abnormally");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}
