use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::AppError;
use crate::response::{BaseResponse, ErrorResponse};
use crate::AppState;

use super::dto::{
    GeneratedReport, GeneratedReportSuccessResponse, MeetingReportResponse,
    MeetingReportSuccessResponse, MeetingSummaryInput, ReportJobAccepted,
    ReportJobAcceptedResponse, ReportStatus,
};

/// 모임 요약 레포트 생성 (동기)
///
/// 재시도 한도 안에서 레포트를 생성해 바로 돌려줍니다.
#[utoipa::path(
    post,
    path = "/api/reports/meeting-summary",
    tag = "Report",
    request_body = MeetingSummaryInput,
    responses(
        (status = 200, description = "레포트 생성 성공", body = GeneratedReportSuccessResponse),
        (status = 400, description = "잘못된 요청", body = ErrorResponse),
        (status = 502, description = "생성 서비스가 요청을 거절함", body = ErrorResponse),
        (status = 503, description = "재시도 한도 초과", body = ErrorResponse)
    )
)]
pub async fn generate_meeting_summary(
    State(state): State<AppState>,
    request: Result<Json<MeetingSummaryInput>, JsonRejection>,
) -> Result<Json<BaseResponse<GeneratedReport>>, AppError> {
    // JSON 파싱 에러 처리
    let Json(request) = request.map_err(AppError::from)?;

    tracing::info!(
        title = %request.title,
        participants = request.participant_selections.len(),
        "Meeting summary request received"
    );

    // 입력 검증은 generate 안에서 한 번만
    let report = state.report_generator.generate(&request).await?;

    Ok(Json(BaseResponse::success(report)))
}

/// 모임 레포트 생성 요청 (비동기)
///
/// 작업을 큐에 넣고 바로 202 를 반환합니다. 결과는 조회 API 로 확인합니다.
#[utoipa::path(
    post,
    path = "/api/meetings/{meeting_id}/report",
    tag = "Report",
    params(("meeting_id" = i64, Path, description = "모임 ID")),
    request_body = MeetingSummaryInput,
    responses(
        (status = 202, description = "작업 접수", body = ReportJobAcceptedResponse),
        (status = 400, description = "잘못된 요청", body = ErrorResponse),
        (status = 503, description = "작업 큐가 가득 참", body = ErrorResponse)
    )
)]
pub async fn request_meeting_report(
    State(state): State<AppState>,
    Path(meeting_id): Path<i64>,
    request: Result<Json<MeetingSummaryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<BaseResponse<ReportJobAccepted>>), AppError> {
    let Json(request) = request.map_err(AppError::from)?;

    // 큐에 넣기 전에 검증해 잘못된 요청은 PENDING 레코드를 남기지 않는다
    request.validate()?;

    state.report_queue.enqueue(meeting_id, request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BaseResponse::accepted(ReportJobAccepted {
            meeting_id,
            status: ReportStatus::Pending,
        })),
    ))
}

/// 모임 레포트 조회
#[utoipa::path(
    get,
    path = "/api/meetings/{meeting_id}/report",
    tag = "Report",
    params(("meeting_id" = i64, Path, description = "모임 ID")),
    responses(
        (status = 200, description = "조회 성공", body = MeetingReportSuccessResponse),
        (status = 404, description = "레포트 없음", body = ErrorResponse)
    )
)]
pub async fn get_meeting_report(
    State(state): State<AppState>,
    Path(meeting_id): Path<i64>,
) -> Result<Json<BaseResponse<MeetingReportResponse>>, AppError> {
    let record = state
        .report_store
        .get(meeting_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("모임 {}의 레포트가 없습니다.", meeting_id)))?;

    Ok(Json(BaseResponse::success(record)))
}
