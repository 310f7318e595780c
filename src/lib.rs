pub mod config;
pub mod domain;
pub mod error;
pub mod global;
pub mod logging;
pub mod response;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::AppConfig;
use domain::ai::AiClient;
use domain::health::HealthChecker;
use domain::report::retry::RetryPolicy;
use domain::report::template::PromptTemplate;
use domain::report::{ReportGenerator, ReportQueue, ReportStore};
use error::AppError;
use shutdown::Shutdown;

/// 동기 생성 요청의 HTTP 타임아웃
///
/// 기본 재시도 정책의 최악 소요 시간(5 x 25초 + 대기 15초)보다 길어야 한다.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    pub report_generator: ReportGenerator,
    pub report_queue: ReportQueue,
    pub report_store: ReportStore,
    pub health_checker: HealthChecker,
    pub metrics: Option<Arc<PrometheusHandle>>,
    pub shutdown: Shutdown,
}

/// 워커 설정
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            worker_count: config.report_worker_count,
            queue_capacity: config.report_queue_capacity,
        }
    }
}

impl AppState {
    /// 상태를 구성하고 레포트 워커를 띄웁니다. tokio 런타임 안에서 호출해야 합니다.
    pub fn new(
        client: AiClient,
        template: Arc<PromptTemplate>,
        policy: RetryPolicy,
        workers: WorkerSettings,
        shutdown: Shutdown,
        metrics: Option<PrometheusHandle>,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let report_generator = ReportGenerator::new(Arc::clone(&client), template, policy);
        let report_store = ReportStore::new();
        let (report_queue, handles) = ReportQueue::start(
            report_generator.clone(),
            report_store.clone(),
            workers.worker_count,
            workers.queue_capacity,
            &shutdown,
        );

        let state = Self {
            report_generator,
            report_queue,
            report_store,
            health_checker: HealthChecker::new(client),
            metrics: metrics.map(Arc::new),
            shutdown,
        };
        (state, handles)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        domain::report::handler::generate_meeting_summary,
        domain::report::handler::request_meeting_report,
        domain::report::handler::get_meeting_report,
        domain::health::handler::health_check,
        domain::health::handler::root,
    ),
    components(
        schemas(
            domain::report::dto::MeetingSummaryInput,
            domain::report::dto::GeneratedReport,
            domain::report::dto::ReportJobAccepted,
            domain::report::dto::ReportStatus,
            domain::report::dto::MeetingReportResponse,
            domain::report::dto::GeneratedReportSuccessResponse,
            domain::report::dto::ReportJobAcceptedResponse,
            domain::report::dto::MeetingReportSuccessResponse,
            domain::health::dto::HealthReport,
            domain::health::dto::ServiceState,
            domain::health::dto::ProviderCheck,
            domain::health::dto::RootStatus,
            response::ErrorResponse,
        )
    ),
    tags(
        (name = "Report", description = "모임 요약 레포트 API"),
        (name = "Health", description = "서버 상태 API")
    ),
    info(
        title = "Meeting Report Server API",
        version = "0.1.0",
        description = "재시도 한도가 있는 모임 요약 레포트 생성 API"
    )
)]
pub struct ApiDoc;

/// 라우터 생성
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(domain::health::handler::root))
        .route("/health", get(domain::health::handler::health_check))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/reports/meeting-summary",
            post(domain::report::handler::generate_meeting_summary),
        )
        .route(
            "/api/meetings/:meeting_id/report",
            post(domain::report::handler::request_meeting_report)
                .get(domain::report::handler::get_meeting_report),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(global::middleware::request_tracing))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => AppError::not_found("metrics recorder is not installed").into_response(),
    }
}

/// 테스트용 라우터 생성
///
/// 내장 템플릿과 짧은 백오프를 사용합니다. tokio 런타임 안에서 호출해야 합니다.
pub fn create_test_router_with_client(client: AiClient) -> Result<Router, AppError> {
    create_test_state(client).map(create_router)
}

/// 테스트용 상태 생성
pub fn create_test_state(client: AiClient) -> Result<AppState, AppError> {
    let template = Arc::new(PromptTemplate::embedded()?);
    let policy = RetryPolicy {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        attempt_timeout: Duration::from_secs(2),
        ..RetryPolicy::default()
    };
    let workers = WorkerSettings {
        worker_count: 1,
        queue_capacity: 8,
    };

    let (state, _handles) = AppState::new(client, template, policy, workers, Shutdown::new(), None);
    Ok(state)
}
