use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};

use super::dto::{HealthReport, ProviderCheck};
use crate::domain::ai::AiClient;

/// provider 점검 타임아웃 (5초), 클라이언트 쪽에는 따로 걸지 않는다
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Degraded 상태 임계값 (2초)
const DEGRADED_THRESHOLD: Duration = Duration::from_secs(2);

/// 캐시 유효 시간 (30초)
const CACHE_DURATION: Duration = Duration::from_secs(30);

struct CachedHealth {
    result: ProviderCheck,
    cached_at: Instant,
}

/// provider 헬스체크
///
/// 실제 텍스트 생성 호출은 비용이 들어 결과를 30초간 캐시합니다.
#[derive(Clone)]
pub struct HealthChecker {
    client: AiClient,
    started_at: Instant,
    cache: Arc<RwLock<Option<CachedHealth>>>,
}

impl HealthChecker {
    pub fn new(client: AiClient) -> Self {
        Self {
            client,
            started_at: Instant::now(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// 전체 헬스 체크 수행 (캐싱 적용)
    pub async fn check(&self) -> HealthReport {
        let provider = self.check_provider_cached().await;

        HealthReport {
            state: provider.state(DEGRADED_THRESHOLD.as_millis() as u64),
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: self.uptime_secs(),
            provider,
        }
    }

    async fn check_provider_cached(&self) -> ProviderCheck {
        {
            let cached = self.cache.read().await;
            if let Some(ref c) = *cached {
                if c.cached_at.elapsed() < CACHE_DURATION {
                    tracing::debug!(
                        cache_age_secs = c.cached_at.elapsed().as_secs(),
                        "Using cached health check result"
                    );
                    return c.result.clone();
                }
            }
        }

        tracing::debug!("Performing fresh health check");
        let result = self.check_provider_fresh().await;

        *self.cache.write().await = Some(CachedHealth {
            result: result.clone(),
            cached_at: Instant::now(),
        });

        result
    }

    async fn check_provider_fresh(&self) -> ProviderCheck {
        let provider = self.client.provider_name();
        let start = Instant::now();

        let result = timeout(HEALTH_CHECK_TIMEOUT, self.client.health_check()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                tracing::info!(provider, latency_ms, "Provider health check passed");
                ProviderCheck::passed(provider, latency_ms)
            }
            Ok(Err(e)) => {
                tracing::warn!(provider, latency_ms, error = %e, "Provider health check failed");
                ProviderCheck::failed(provider, latency_ms, e.to_string())
            }
            Err(_) => {
                tracing::warn!(provider, latency_ms, "Provider health check timed out");
                ProviderCheck::failed(
                    provider,
                    latency_ms,
                    format!("timed out after {}s", HEALTH_CHECK_TIMEOUT.as_secs()),
                )
            }
        }
    }
}
