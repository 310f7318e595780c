//! Handler 테스트
//!
//! axum-test 를 사용한 HTTP 핸들러 레이어 테스트

use std::future::IntoFuture;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use meeting_report_server::{
    create_test_router_with_client, create_test_state, domain::ai::AiClientTrait, error::AppError,
};
use serde_json::{json, Value};

/// 테스트용 Mock AI 클라이언트 (성공 응답)
struct MockAiClientSuccess {
    response: String,
    calls: Arc<AtomicU32>,
}

impl MockAiClientSuccess {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl AiClientTrait for MockAiClientSuccess {
    async fn submit(&self, _prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    async fn health_check(&self) -> Result<String, AppError> {
        Ok("ok".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// 테스트용 Mock AI 클라이언트 (항상 같은 에러)
struct MockAiClientError {
    transient: bool,
    calls: Arc<AtomicU32>,
}

impl MockAiClientError {
    fn transient() -> Self {
        Self {
            transient: true,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn permanent() -> Self {
        Self {
            transient: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl AiClientTrait for MockAiClientError {
    async fn submit(&self, _prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.transient {
            Err(AppError::TransientGenerationFailure("HTTP 503".to_string()))
        } else {
            Err(AppError::PermanentGenerationFailure(
                "invalid_request_error: context length exceeded".to_string(),
            ))
        }
    }

    async fn health_check(&self) -> Result<String, AppError> {
        Err(AppError::TransientGenerationFailure("connection refused".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}

/// 처음 `failures` 번은 일시적 오류, 이후 성공
struct MockAiClientFlaky {
    failures: u32,
    calls: Arc<AtomicU32>,
}

#[async_trait::async_trait]
impl AiClientTrait for MockAiClientFlaky {
    async fn submit(&self, _prompt: &str) -> Result<String, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(AppError::TransientGenerationFailure("rate limited".to_string()))
        } else {
            Ok(format!("{}번째 시도에서 생성된 레포트", call))
        }
    }

    async fn health_check(&self) -> Result<String, AppError> {
        Ok("ok".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn server_with(client: impl AiClientTrait + 'static) -> TestServer {
    TestServer::new(create_test_router_with_client(Arc::new(client)).unwrap()).unwrap()
}

fn meeting_body() -> Value {
    json!({
        "title": "12월 송년회",
        "description": "연말 팀 회식 일정 조율",
        "host": "minji",
        "votedParticipants": ["minji", "junho"],
        "participantSelections": {
            "minji": ["2025-12-09", "2025-12-10"],
            "junho": ["2025-12-10"]
        }
    })
}

mod meeting_summary_handler {
    use super::*;

    #[tokio::test]
    async fn should_return_200_for_valid_request() {
        // Arrange
        let mock = MockAiClientSuccess::new("12월 10일(수)에 모두 참석 가능합니다.");
        let calls = Arc::clone(&mock.calls);
        let server = server_with(mock);

        // Act
        let response = server
            .post("/api/reports/meeting-summary")
            .json(&meeting_body())
            .await;

        // Assert
        response.assert_status_ok();
        response.assert_json_contains(&json!({
            "isSuccess": true,
            "code": "COMMON200",
            "result": {
                "content": "12월 10일(수)에 모두 참석 가능합니다.",
                "attempts": 1,
                "success": true
            }
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_report_attempt_count_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let server = server_with(MockAiClientFlaky {
            failures: 3,
            calls: Arc::clone(&calls),
        });

        let response = server
            .post("/api/reports/meeting-summary")
            .json(&meeting_body())
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["result"]["attempts"], 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn should_return_503_after_retry_limit() {
        // Arrange
        let mock = MockAiClientError::transient();
        let calls = Arc::clone(&mock.calls);
        let server = server_with(mock);

        // Act
        let response = server
            .post("/api/reports/meeting-summary")
            .json(&meeting_body())
            .expect_failure()
            .await;

        // Assert
        response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
        response.assert_json_contains(&json!({
            "isSuccess": false,
            "code": "REPORT_004"
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn should_return_502_without_retry_for_permanent_failure() {
        let mock = MockAiClientError::permanent();
        let calls = Arc::clone(&mock.calls);
        let server = server_with(mock);

        let response = server
            .post("/api/reports/meeting-summary")
            .json(&meeting_body())
            .expect_failure()
            .await;

        response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
        response.assert_json_contains(&json!({ "code": "REPORT_003" }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 외부 API 에러 상세는 응답에 노출하지 않음
        let body: Value = response.json();
        assert!(!body["message"].as_str().unwrap().contains("context length"));
    }

    #[tokio::test]
    async fn should_return_400_for_empty_title() {
        let mock = MockAiClientSuccess::new("unused");
        let calls = Arc::clone(&mock.calls);
        let server = server_with(mock);

        let response = server
            .post("/api/reports/meeting-summary")
            .json(&json!({ "title": "" }))
            .expect_failure()
            .await;

        response.assert_status_bad_request();
        response.assert_json_contains(&json!({ "code": "COMMON400" }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_return_400_for_oversized_description_without_calling_provider() {
        let mock = MockAiClientSuccess::new("unused");
        let calls = Arc::clone(&mock.calls);
        let server = server_with(mock);
        let mut body = meeting_body();
        body["description"] = json!("가".repeat(2001));

        let response = server
            .post("/api/reports/meeting-summary")
            .json(&body)
            .expect_failure()
            .await;

        response.assert_status_bad_request();
        response.assert_json_contains(&json!({ "code": "COMMON400" }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_return_400_for_malformed_json() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        let response = server
            .post("/api/reports/meeting-summary")
            .bytes(axum::body::Bytes::from_static(b"{\"title\": "))
            .content_type("application/json")
            .expect_failure()
            .await;

        response.assert_status_bad_request();
        response.assert_json_contains(&json!({ "isSuccess": false, "code": "COMMON400" }));
    }

    #[tokio::test]
    async fn should_accept_minimal_meeting() {
        let server = server_with(MockAiClientSuccess::new("참여자가 아직 없습니다."));

        let response = server
            .post("/api/reports/meeting-summary")
            .json(&json!({ "title": "번개 모임" }))
            .await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn concurrent_requests_should_not_interfere() {
        let server = server_with(MockAiClientSuccess::new("동시 요청 레포트"));

        let requests = (0..4).map(|_| {
            server
                .post("/api/reports/meeting-summary")
                .json(&meeting_body())
                .into_future()
        });
        let responses = futures::future::join_all(requests).await;

        for response in responses {
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["result"]["content"], "동시 요청 레포트");
        }
    }
}

mod meeting_report_job_handler {
    use super::*;

    async fn poll_until_settled(server: &TestServer, meeting_id: i64) -> Value {
        for _ in 0..200 {
            let response = server
                .get(&format!("/api/meetings/{}/report", meeting_id))
                .await;
            let body: Value = response.json();
            if body["result"]["status"] != "PENDING" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("report for meeting {} never settled", meeting_id);
    }

    #[tokio::test]
    async fn should_accept_job_and_store_completed_report() {
        // Arrange
        let server = server_with(MockAiClientSuccess::new("송년회는 12월 10일입니다."));

        // Act
        let response = server
            .post("/api/meetings/42/report")
            .json(&meeting_body())
            .await;

        // Assert
        response.assert_status(axum::http::StatusCode::ACCEPTED);
        response.assert_json_contains(&json!({
            "isSuccess": true,
            "code": "COMMON202",
            "result": { "meetingId": 42, "status": "PENDING" }
        }));

        let body = poll_until_settled(&server, 42).await;
        assert_eq!(body["result"]["status"], "COMPLETED");
        assert_eq!(body["result"]["summaryText"], "송년회는 12월 10일입니다.");
        assert_eq!(body["result"]["attempts"], 1);
    }

    #[tokio::test]
    async fn should_store_failed_report_after_retry_limit() {
        let server = server_with(MockAiClientError::transient());

        server
            .post("/api/meetings/7/report")
            .json(&meeting_body())
            .await
            .assert_status(axum::http::StatusCode::ACCEPTED);

        let body = poll_until_settled(&server, 7).await;
        assert_eq!(body["result"]["status"], "FAILED");
        assert_eq!(body["result"]["attempts"], 5);
        assert!(body["result"]["summaryText"].is_null());
    }

    #[tokio::test]
    async fn should_return_404_for_unknown_meeting() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        let response = server
            .get("/api/meetings/999/report")
            .expect_failure()
            .await;

        response.assert_status_not_found();
        response.assert_json_contains(&json!({ "code": "COMMON404" }));
    }

    #[tokio::test]
    async fn should_reject_invalid_input_before_enqueue() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        server
            .post("/api/meetings/3/report")
            .json(&json!({ "title": "" }))
            .expect_failure()
            .await
            .assert_status_bad_request();

        server
            .get("/api/meetings/3/report")
            .expect_failure()
            .await
            .assert_status_not_found();
    }
}

mod health_handler {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use meeting_report_server::create_router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_should_return_up() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        let response = server.get("/").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "status": "UP",
            "message": "Meeting report server is running"
        }));
    }

    #[tokio::test]
    async fn health_should_report_provider_status() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        let response = server.get("/health").await;

        response.assert_status_ok();
        response.assert_json_contains(&json!({
            "state": "healthy",
            "provider": { "provider": "openai", "reachable": true }
        }));
        let body: Value = response.json();
        assert!(body["uptimeSecs"].is_u64());
    }

    #[tokio::test]
    async fn health_should_return_503_when_provider_is_down() {
        // tower oneshot 으로 라우터를 직접 호출
        let app = create_router(create_test_state(Arc::new(MockAiClientError::transient())).unwrap());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["state"], "unhealthy");
        assert_eq!(body["provider"]["provider"], "ollama");
        assert_eq!(body["provider"]["reachable"], false);
    }

    #[tokio::test]
    async fn response_should_carry_request_id() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        let response = server
            .get("/")
            .add_header(
                axum::http::HeaderName::from_static("x-request-id"),
                axum::http::HeaderValue::from_static("req-123"),
            )
            .await;

        assert_eq!(response.header("x-request-id"), "req-123");
    }

    #[tokio::test]
    async fn metrics_should_be_404_without_recorder() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        server
            .get("/metrics")
            .expect_failure()
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn openapi_document_should_list_report_paths() {
        let server = server_with(MockAiClientSuccess::new("unused"));

        let response = server.get("/api-docs/openapi.json").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["paths"]["/api/reports/meeting-summary"].is_object());
        assert!(body["paths"]["/api/meetings/{meeting_id}/report"].is_object());
    }
}

mod test_support {
    use super::*;

    #[tokio::test]
    async fn test_state_should_build_from_embedded_template() {
        let state = create_test_state(Arc::new(MockAiClientSuccess::new("unused")));

        assert!(state.is_ok());
        assert!(create_test_router_with_client(Arc::new(MockAiClientSuccess::new("unused"))).is_ok());
    }
}
