use std::sync::Arc;

use super::client::{AiClient, OpenAiClient};
use crate::config::AppConfig;

/// 지원하는 AI Provider 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    /// OpenAI GPT
    OpenAi,
    /// Ollama (로컬 LLM, OpenAI 호환 엔드포인트)
    Ollama,
}

impl AiProvider {
    const ALL: [AiProvider; 2] = [AiProvider::OpenAi, AiProvider::Ollama];

    pub fn code(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Ollama => "ollama",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OpenAI GPT",
            AiProvider::Ollama => "Ollama (Local LLM)",
        }
    }

    /// Provider 코드로 조회 (대소문자 무시)
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.code().eq_ignore_ascii_case(code.trim()))
    }
}

/// 설정된 Provider 에 맞는 클라이언트 생성
pub fn build_client(config: &AppConfig) -> AiClient {
    let client = match config.ai_provider {
        AiProvider::OpenAi => OpenAiClient::new(
            AiProvider::OpenAi,
            &config.openai_api_key,
            config.openai_api_base.as_deref(),
            &config.openai_model,
        ),
        AiProvider::Ollama => OpenAiClient::new(
            AiProvider::Ollama,
            "ollama",
            Some(&config.ollama_api_base),
            &config.ollama_model,
        ),
    };

    tracing::info!(
        provider = config.ai_provider.code(),
        description = config.ai_provider.description(),
        model = client.model(),
        "Using AI provider"
    );

    Arc::new(client)
}
