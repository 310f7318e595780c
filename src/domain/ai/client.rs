use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use super::provider::AiProvider;
use crate::error::AppError;

/// 재시도하면 회복될 수 있는 API 에러 type 값
///
/// - `server_error`, `rate_limit_error`: OpenAI
/// - `api_error`: Ollama 의 OpenAI 호환 엔드포인트가 5xx 에 붙이는 값
/// - `overloaded_error`, `service_unavailable`: 호환 프록시가 돌려주는 값
const TRANSIENT_ERROR_TYPES: [&str; 5] = [
    "server_error",
    "rate_limit_error",
    "api_error",
    "overloaded_error",
    "service_unavailable",
];

/// 재시도하면 회복될 수 있는 API 에러 code 값
const TRANSIENT_ERROR_CODES: [&str; 2] = ["rate_limit_exceeded", "server_error"];

/// async-openai 내부 재시도를 끄는 백오프
///
/// 재시도 횟수와 간격은 `RetryPolicy` 하나로만 관리한다.
pub(crate) fn no_retry_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// OpenAI 에러를 재시도 가능 여부에 따라 분류
///
/// async-openai 는 HTTP 상태 코드를 `ApiError` 본문으로만 전달하므로
/// `type`/`code` 값으로 판단합니다. `Reqwest` 에러는 응답을 받기 전의 전송 계층 오류입니다.
pub(crate) fn classify_openai_error(error: OpenAIError) -> AppError {
    match &error {
        OpenAIError::ApiError(api_err) => {
            let err_type = api_err.r#type.as_deref().unwrap_or("");
            let err_code = api_err
                .code
                .as_ref()
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let message = &api_err.message;

            if err_code == "insufficient_quota" || err_type == "insufficient_quota" {
                AppError::PermanentGenerationFailure(format!("insufficient_quota: {}", message))
            } else if TRANSIENT_ERROR_TYPES.contains(&err_type)
                || TRANSIENT_ERROR_CODES.contains(&err_code)
                || message.to_lowercase().contains("rate limit")
            {
                AppError::TransientGenerationFailure(format!("{}: {}", err_type, message))
            } else {
                // invalid_request_error, authentication_error, type 이 없는 에러 ...
                AppError::PermanentGenerationFailure(format!("{}: {}", err_type, message))
            }
        }
        OpenAIError::Reqwest(req_err) => {
            AppError::TransientGenerationFailure(format!("transport error: {}", req_err))
        }
        // HTML 에러 페이지처럼 JSON 이 아닌 본문
        OpenAIError::JSONDeserialize(_) | OpenAIError::StreamError(_) => {
            AppError::TransientGenerationFailure(error.to_string())
        }
        _ => AppError::PermanentGenerationFailure(error.to_string()),
    }
}

/// 텍스트 생성 클라이언트 인터페이스
///
/// 외부 LLM 호출을 추상화하여 테스트에서 Mock 객체로 대체할 수 있습니다.
/// 구현체는 실패를 반드시 `TransientGenerationFailure` 또는
/// `PermanentGenerationFailure` 로 분류해서 반환해야 합니다.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AiClientTrait: Send + Sync {
    /// 완성된 프롬프트를 제출하고 생성된 텍스트를 받습니다.
    async fn submit(&self, prompt: &str) -> Result<String, AppError>;

    /// 헬스체크용 최소 텍스트 생성
    async fn health_check(&self) -> Result<String, AppError>;

    /// Provider 이름 (예: "openai", "ollama")
    fn provider_name(&self) -> &'static str;
}

/// Arc로 래핑된 AiClient (Clone 지원)
pub type AiClient = Arc<dyn AiClientTrait>;

/// OpenAI 호환 API 클라이언트 구현체
///
/// Ollama 도 OpenAI 호환 엔드포인트를 제공하므로 같은 구현을 사용합니다.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    provider: AiProvider,
}

impl OpenAiClient {
    pub fn new(provider: AiProvider, api_key: &str, api_base: Option<&str>, model: &str) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }

        Self {
            client: Client::with_config(config).with_backoff(no_retry_backoff()),
            model: model.to_string(),
            provider,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, content: &str, max_tokens: Option<u16>) -> Result<String, AppError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.as_str())
            .messages(vec![build_user_message(content)?]);
        if let Some(max_tokens) = max_tokens {
            args.max_tokens(max_tokens);
        }
        let request = args
            .build()
            .map_err(|e| AppError::PermanentGenerationFailure(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl AiClientTrait for OpenAiClient {
    async fn submit(&self, prompt: &str) -> Result<String, AppError> {
        tracing::debug!(
            provider = self.provider.code(),
            model = %self.model,
            prompt_length = prompt.len(),
            "Submitting prompt"
        );

        let text = self.chat(prompt, None).await?;

        tracing::debug!(response_length = text.len(), "Received completion");
        Ok(text)
    }

    async fn health_check(&self) -> Result<String, AppError> {
        // 최소 토큰으로 실제 텍스트 생성 검증, 타임아웃은 HealthChecker 가 건다
        self.chat("Respond with exactly 'ok'", Some(5)).await
    }

    fn provider_name(&self) -> &'static str {
        self.provider.code()
    }
}

pub(crate) fn build_user_message(content: &str) -> Result<ChatCompletionRequestMessage, AppError> {
    Ok(ChatCompletionRequestMessage::User(
        ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| AppError::PermanentGenerationFailure(e.to_string()))?,
    ))
}
