use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 모임 요약 레포트 입력
///
/// 요청 단위로 생성되며 생성 이후에는 변경하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummaryInput {
    /// 모임 제목 (1 ~ 200자)
    #[validate(length(min = 1, max = 200, message = "모임 제목은 1자 이상 200자 이하여야 합니다"))]
    #[schema(example = "12월 송년회")]
    pub title: String,

    /// 모임 설명 (최대 2000자)
    #[validate(length(max = 2000, message = "모임 설명은 2000자 이하여야 합니다"))]
    #[serde(default)]
    #[schema(example = "연말 팀 회식 일정 조율")]
    pub description: String,

    /// 호스트 이름 (없으면 "Unknown" 으로 표시)
    #[serde(default)]
    #[schema(example = "minji")]
    pub host: Option<String>,

    /// 투표에 참여한 사용자 (입력 순서 유지)
    #[serde(default)]
    #[schema(example = json!(["minji", "junho"]))]
    pub voted_participants: Vec<String>,

    /// 참여자별 선택 항목
    #[serde(default)]
    #[schema(example = json!({"minji": ["2025-12-09", "2025-12-10"], "junho": ["2025-12-10"]}))]
    pub participant_selections: BTreeMap<String, Vec<String>>,
}

/// 생성된 레포트
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    /// 레포트 본문
    pub content: String,
    /// 성공까지 걸린 시도 횟수 (1부터 시작)
    #[schema(example = 1)]
    pub attempts: u32,
    /// 성공 여부 (반환된 레포트는 항상 true)
    #[schema(example = true)]
    pub success: bool,
    /// 생성 시각 (UTC)
    pub generated_at: DateTime<Utc>,
}

impl GeneratedReport {
    pub fn new(content: String, attempts: u32) -> Self {
        Self {
            content,
            attempts,
            success: true,
            generated_at: Utc::now(),
        }
    }
}

/// 비동기 레포트 생성 요청 접수 결과
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportJobAccepted {
    #[schema(example = 1)]
    pub meeting_id: i64,
    pub status: ReportStatus,
}

/// 저장된 레포트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// 생성 대기 또는 진행 중
    Pending,
    /// 생성 완료
    Completed,
    /// 최종 실패
    Failed,
}

/// 모임별 레포트 조회 응답
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingReportResponse {
    #[schema(example = 1)]
    pub meeting_id: i64,
    pub status: ReportStatus,
    /// 레포트 본문 (완료 시)
    pub summary_text: Option<String>,
    /// 마지막 실행의 시도 횟수
    pub attempts: u32,
    /// 실패 사유 (실패 시)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 레포트 생성 성공 응답 (OpenAPI 스키마용)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReportSuccessResponse {
    #[schema(example = true)]
    pub is_success: bool,
    #[schema(example = "COMMON200")]
    pub code: String,
    #[schema(example = "성공입니다.")]
    pub message: String,
    pub result: GeneratedReport,
}

/// 레포트 작업 접수 응답 (OpenAPI 스키마용)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportJobAcceptedResponse {
    #[schema(example = true)]
    pub is_success: bool,
    #[schema(example = "COMMON202")]
    pub code: String,
    #[schema(example = "요청이 접수되었습니다.")]
    pub message: String,
    pub result: ReportJobAccepted,
}

/// 레포트 조회 성공 응답 (OpenAPI 스키마용)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingReportSuccessResponse {
    #[schema(example = true)]
    pub is_success: bool,
    #[schema(example = "COMMON200")]
    pub code: String,
    #[schema(example = "성공입니다.")]
    pub message: String,
    pub result: MeetingReportResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_deserialize_camel_case_input() {
        // Arrange
        let json = r#"{
            "title": "스터디",
            "description": "주간 회의",
            "host": "minji",
            "votedParticipants": ["minji", "junho"],
            "participantSelections": {"junho": ["2025-12-10"], "minji": ["2025-12-09"]}
        }"#;

        // Act
        let input: MeetingSummaryInput = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(input.title, "스터디");
        assert_eq!(input.host.as_deref(), Some("minji"));
        assert_eq!(input.voted_participants, vec!["minji", "junho"]);
        // BTreeMap 이므로 참여자 id 순으로 정렬됨
        let keys: Vec<_> = input.participant_selections.keys().collect();
        assert_eq!(keys, vec!["junho", "minji"]);
    }

    #[test]
    fn should_default_optional_fields() {
        let input: MeetingSummaryInput = serde_json::from_str(r#"{"title": "번개"}"#).unwrap();

        assert!(input.description.is_empty());
        assert!(input.host.is_none());
        assert!(input.voted_participants.is_empty());
        assert!(input.participant_selections.is_empty());
    }

    #[test]
    fn should_reject_empty_title() {
        let input: MeetingSummaryInput = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn generated_report_should_serialize_with_camel_case() {
        let report = GeneratedReport::new("요약".to_string(), 2);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["content"], "요약");
        assert_eq!(json["attempts"], 2);
        assert_eq!(json["success"], true);
        assert!(json["generatedAt"].is_string());
    }

    #[test]
    fn report_status_should_serialize_uppercase() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&ReportStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }
}
