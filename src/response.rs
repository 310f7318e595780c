use serde::Serialize;
use utoipa::ToSchema;

/// API 공통 응답 형식
///
/// ```json
/// {
///   "isSuccess": true,
///   "code": "COMMON200",
///   "message": "성공입니다.",
///   "result": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse<T: Serialize> {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Option<T>,
}

impl<T: Serialize> BaseResponse<T> {
    /// 성공 응답 생성
    pub fn success(result: T) -> Self {
        Self {
            is_success: true,
            code: "COMMON200".to_string(),
            message: "성공입니다.".to_string(),
            result: Some(result),
        }
    }

    /// 비동기 작업 접수 응답 생성
    pub fn accepted(result: T) -> Self {
        Self {
            is_success: true,
            code: "COMMON202".to_string(),
            message: "요청이 접수되었습니다.".to_string(),
            result: Some(result),
        }
    }
}

/// 에러 응답 형식
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// 성공 여부 (에러 시 항상 false)
    #[schema(example = false)]
    pub is_success: bool,

    /// 에러 코드
    #[schema(example = "REPORT_004")]
    pub code: String,

    /// 에러 메시지
    #[schema(example = "5회 시도했지만 레포트를 생성하지 못했습니다. 잠시 후 다시 시도해주세요.")]
    pub message: String,

    pub result: Option<()>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            code: code.into(),
            message: message.into(),
            result: None,
        }
    }
}
