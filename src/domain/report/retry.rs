use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::{backoff::Backoff, future::retry_notify, ExponentialBackoff};
use tokio::time::timeout;

use super::constants::MAX_RETRY_COUNT;
use crate::config::AppConfig;
use crate::error::AppError;

/// 레포트 생성 재시도 정책
///
/// 최대 시도 횟수 안에서 일시적 오류만 지수 백오프로 재시도합니다.
/// 지연은 `initial_delay * multiplier^(k-1)` 이며 `max_delay` 를 넘지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함, 1 이상)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// 시도 1회당 타임아웃
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_COUNT,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(25),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.report_max_retry_count,
            initial_delay: config.report_retry_initial_delay,
            max_delay: config.report_retry_max_delay,
            multiplier: config.report_retry_multiplier,
            attempt_timeout: config.report_attempt_timeout,
        }
    }

    fn create_backoff(&self) -> BoundedBackoff {
        BoundedBackoff::new(
            ExponentialBackoff {
                current_interval: self.initial_delay,
                initial_interval: self.initial_delay,
                max_interval: self.max_delay,
                multiplier: self.multiplier,
                randomization_factor: 0.0,
                // 경과 시간이 아니라 시도 횟수로만 제한
                max_elapsed_time: None,
                ..Default::default()
            },
            self.max_attempts.saturating_sub(1),
        )
    }
}

/// 재시도 횟수를 제한하는 백오프
///
/// `ExponentialBackoff` 는 경과 시간으로만 종료되므로 남은 재시도 횟수를 따로 셉니다.
struct BoundedBackoff {
    inner: ExponentialBackoff,
    max_retries: u32,
    remaining: u32,
}

impl BoundedBackoff {
    fn new(inner: ExponentialBackoff, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            remaining: max_retries,
        }
    }
}

impl Backoff for BoundedBackoff {
    fn reset(&mut self) {
        self.inner.reset();
        self.remaining = self.max_retries;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.inner.next_backoff()
    }
}

/// 지금까지 시작한 시도 횟수
///
/// 호출자가 소유하므로 영구적 오류로 끝나거나 future 가 취소된 뒤에도 실제 횟수를 읽을 수 있습니다.
#[derive(Debug, Default)]
pub struct AttemptCounter(AtomicU32);

impl AttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// 재시도 정책을 적용해 비동기 작업을 실행하고 시도 횟수를 `attempts` 에 기록합니다.
///
/// - 성공 시 즉시 반환합니다.
/// - 일시적 오류는 한도까지 재시도하고, 한도를 소진하면 마지막 오류를 감싼
///   `GenerationFailed` 를 반환합니다.
/// - 영구적 오류는 재시도 없이 그대로 반환합니다.
///
/// 반환된 future 를 drop 하면 진행 중인 시도와 대기 중인 재시도가 함께 취소됩니다.
pub async fn with_bounded_retry<F, Fut, T>(
    policy: &RetryPolicy,
    attempts: &AttemptCounter,
    operation: F,
) -> Result<T, AppError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let operation = &operation;
    let attempt_timeout = policy.attempt_timeout;

    let result = retry_notify(
        policy.create_backoff(),
        move || async move {
            let attempt = attempts.next();
            metrics::counter!("report_generation_attempts_total").increment(1);

            let outcome = match timeout(attempt_timeout, operation(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AppError::TransientGenerationFailure(format!(
                    "attempt {} timed out after {}ms",
                    attempt,
                    attempt_timeout.as_millis()
                ))),
            };

            outcome.map_err(|e| {
                if e.is_transient() {
                    backoff::Error::transient(e)
                } else {
                    tracing::error!(attempt, error = %e, "Permanent error, not retrying");
                    backoff::Error::permanent(e)
                }
            })
        },
        |error: AppError, delay: Duration| {
            tracing::warn!(
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "Retryable error, will retry..."
            );
        },
    )
    .await;

    match result {
        Ok(value) => Ok(value),
        Err(error) if error.is_transient() => {
            let attempts = attempts.get();
            tracing::error!(attempts, error = %error, "Retry limit reached");
            Err(AppError::GenerationFailed {
                attempts,
                source: Box::new(error),
            })
        }
        Err(error) => Err(error),
    }
}
