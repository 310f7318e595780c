use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use validator::ValidationErrors;

use crate::response::ErrorResponse;

/// 애플리케이션 전역 에러 타입
///
/// 레포트 생성 흐름의 에러는 재시도 가능 여부에 따라 구분됩니다.
/// - `TransientGenerationFailure`: 재시도 대상
/// - `PermanentGenerationFailure`: 즉시 실패
/// - `GenerationFailed`: 재시도 한도 소진 후 최종 실패
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("프롬프트 템플릿을 불러오지 못했습니다: {0}")]
    TemplateLoadFailed(String),

    #[error("일시적인 레포트 생성 실패: {0}")]
    TransientGenerationFailure(String),

    #[error("레포트 생성 요청이 거부되었습니다: {0}")]
    PermanentGenerationFailure(String),

    #[error("{attempts}회 시도 후 레포트 생성에 실패했습니다: {source}")]
    GenerationFailed {
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error("레포트 작업 대기열이 가득 찼습니다: {0}")]
    QueueFull(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("잘못된 요청 형식입니다: {0}")]
    JsonParseFailed(String),

    #[error("{0}")]
    NotFound(String),

    #[error("내부 에러: {0}")]
    Internal(String),
}

impl AppError {
    /// 에러 코드 반환
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::TemplateLoadFailed(_) => "REPORT_001",
            AppError::TransientGenerationFailure(_) => "REPORT_002",
            AppError::PermanentGenerationFailure(_) => "REPORT_003",
            AppError::GenerationFailed { .. } => "REPORT_004",
            AppError::QueueFull(_) => "REPORT_005",
            AppError::ValidationError(_) | AppError::JsonParseFailed(_) => "COMMON400",
            AppError::NotFound(_) => "COMMON404",
            AppError::Internal(_) => "COMMON500",
        }
    }

    /// HTTP 상태 코드 반환
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TemplateLoadFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::TransientGenerationFailure(_)
            | AppError::GenerationFailed { .. }
            | AppError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PermanentGenerationFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::ValidationError(_) | AppError::JsonParseFailed(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// 클라이언트에 노출할 메시지
    ///
    /// 내부 에러와 외부 API 에러의 상세 내용은 로그에만 남깁니다.
    pub fn client_message(&self) -> String {
        match self {
            AppError::TemplateLoadFailed(_) | AppError::Internal(_) => {
                "서버 에러, 관리자에게 문의 바랍니다.".to_string()
            }
            AppError::TransientGenerationFailure(_) => {
                "AI 서비스가 일시적으로 응답하지 않습니다. 잠시 후 다시 시도해주세요.".to_string()
            }
            AppError::PermanentGenerationFailure(_) => {
                "AI 서비스가 요청을 처리할 수 없습니다.".to_string()
            }
            AppError::GenerationFailed { attempts, .. } => format!(
                "{}회 시도했지만 레포트를 생성하지 못했습니다. 잠시 후 다시 시도해주세요.",
                attempts
            ),
            _ => self.to_string(),
        }
    }

    /// 재시도로 복구될 수 있는 에러인지 여부
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientGenerationFailure(_))
    }

    pub fn validation_error(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::warn!(code, error = %self, "Request rejected");
        }

        let body = ErrorResponse::new(code, self.client_message());
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::JsonParseFailed(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} 값이 올바르지 않습니다", field))
                })
            })
            .collect::<Vec<_>>()
            .join(", ");

        AppError::ValidationError(message)
    }
}
