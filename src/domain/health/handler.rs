use axum::{extract::State, http::StatusCode, Json};

use super::dto::{HealthReport, RootStatus, ServiceState};
use crate::AppState;

/// 헬스 체크
///
/// provider 가 응답하지 않으면 503 을 반환합니다.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "정상 또는 응답 지연", body = HealthReport),
        (status = 503, description = "provider 장애", body = HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let health = state.health_checker.check().await;

    let status = match health.state {
        ServiceState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        ServiceState::Healthy | ServiceState::Degraded => StatusCode::OK,
    };

    (status, Json(health))
}

/// 서버 동작 확인
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "서버 동작 중", body = RootStatus))
)]
pub async fn root() -> Json<RootStatus> {
    Json(RootStatus {
        status: "UP",
        message: "Meeting report server is running",
    })
}
