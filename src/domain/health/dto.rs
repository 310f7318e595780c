use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// `/health` 응답
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub state: ServiceState,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    #[schema(example = 3600)]
    pub uptime_secs: u64,
    /// 마지막 provider 점검 결과 (최대 30초 캐시)
    pub provider: ProviderCheck,
}

/// 레포트 생성 가능 여부 기준의 서버 상태
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// provider 가 제때 응답
    Healthy,
    /// 응답은 하지만 느려서 레포트 생성이 재시도에 기대게 됨
    Degraded,
    /// 레포트를 만들 수 없음
    Unhealthy,
}

/// 텍스트 생성 provider 점검 결과
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCheck {
    #[schema(example = "openai")]
    pub provider: &'static str,
    pub reachable: bool,
    #[schema(example = 150)]
    pub latency_ms: u64,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProviderCheck {
    pub fn passed(provider: &'static str, latency_ms: u64) -> Self {
        Self {
            provider,
            reachable: true,
            latency_ms,
            checked_at: Utc::now(),
            reason: None,
        }
    }

    pub fn failed(provider: &'static str, latency_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reachable: false,
            latency_ms,
            checked_at: Utc::now(),
            reason: Some(reason.into()),
        }
    }

    /// 점검 결과를 서버 상태로 환산
    pub fn state(&self, degraded_after_ms: u64) -> ServiceState {
        if !self.reachable {
            ServiceState::Unhealthy
        } else if self.latency_ms >= degraded_after_ms {
            ServiceState::Degraded
        } else {
            ServiceState::Healthy
        }
    }
}

/// 루트 경로 응답
#[derive(Serialize, Debug, ToSchema)]
pub struct RootStatus {
    #[schema(example = "UP")]
    pub status: &'static str,
    #[schema(example = "Meeting report server is running")]
    pub message: &'static str,
}
