use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::ai::AiProvider;
use crate::domain::report::constants::{MAX_RETRY_COUNT, PROMPT_TEMPLATE_PATH};

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,

    // AI Provider
    pub ai_provider: AiProvider,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub openai_model: String,
    pub ollama_api_base: String,
    pub ollama_model: String,

    // Report
    pub prompt_template_path: String,
    pub report_max_retry_count: u32,
    pub report_retry_initial_delay: Duration,
    pub report_retry_max_delay: Duration,
    pub report_retry_multiplier: f64,
    pub report_attempt_timeout: Duration,
    pub report_worker_count: usize,
    pub report_queue_capacity: usize,
}

impl AppConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_var("SERVER_PORT", 8080u16).map_err(|_| ConfigError::InvalidPort)?;

        let ai_provider = match env::var("AI_PROVIDER") {
            Ok(code) => AiProvider::from_code(&code)
                .ok_or(ConfigError::UnknownAiProvider(code))?,
            Err(_) => AiProvider::OpenAi,
        };

        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
            if ai_provider == AiProvider::OpenAi {
                tracing::warn!(
                    "OPENAI_API_KEY 환경변수가 설정되지 않았습니다. 프로덕션 환경에서는 반드시 설정하세요."
                );
            }
            "test-key".to_string()
        });
        let openai_api_base = env::var("OPENAI_API_BASE").ok();
        let openai_model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let ollama_api_base = env::var("OLLAMA_API_BASE")
            .unwrap_or_else(|_| "http://localhost:11434/v1".to_string());
        let ollama_model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());

        let prompt_template_path =
            env::var("PROMPT_TEMPLATE_PATH").unwrap_or_else(|_| PROMPT_TEMPLATE_PATH.to_string());

        let report_max_retry_count = parse_var("REPORT_MAX_RETRY_COUNT", MAX_RETRY_COUNT)?;
        if report_max_retry_count == 0 {
            return Err(ConfigError::Invalid {
                key: "REPORT_MAX_RETRY_COUNT",
                reason: "must be at least 1".to_string(),
            });
        }

        let initial_delay_ms: u64 = parse_var("REPORT_RETRY_INITIAL_DELAY_MS", 1_000)?;
        let max_delay_ms: u64 = parse_var("REPORT_RETRY_MAX_DELAY_MS", 30_000)?;
        let report_retry_multiplier: f64 = parse_var("REPORT_RETRY_MULTIPLIER", 2.0)?;
        // NaN 은 모든 비교가 false 라 따로 거른다
        if !report_retry_multiplier.is_finite() || report_retry_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                key: "REPORT_RETRY_MULTIPLIER",
                reason: "must be a finite number >= 1.0".to_string(),
            });
        }
        if max_delay_ms < initial_delay_ms {
            return Err(ConfigError::Invalid {
                key: "REPORT_RETRY_MAX_DELAY_MS",
                reason: format!("must be >= REPORT_RETRY_INITIAL_DELAY_MS ({})", initial_delay_ms),
            });
        }
        let attempt_timeout_secs: u64 = parse_var("REPORT_ATTEMPT_TIMEOUT_SECS", 25)?;

        let report_worker_count: usize = parse_var("REPORT_WORKER_COUNT", 2)?;
        let report_queue_capacity: usize = parse_var("REPORT_QUEUE_CAPACITY", 50)?;
        if report_worker_count == 0 || report_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "REPORT_WORKER_COUNT/REPORT_QUEUE_CAPACITY",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            server_host,
            server_port,
            ai_provider,
            openai_api_key,
            openai_api_base,
            openai_model,
            ollama_api_base,
            ollama_model,
            prompt_template_path,
            report_max_retry_count,
            report_retry_initial_delay: Duration::from_millis(initial_delay_ms),
            report_retry_max_delay: Duration::from_millis(max_delay_ms),
            report_retry_multiplier,
            report_attempt_timeout: Duration::from_secs(attempt_timeout_secs),
            report_worker_count,
            report_queue_capacity,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("cannot parse {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Unknown AI provider code: {0}")]
    UnknownAiProvider(String),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::retry::RetryPolicy;
    use std::sync::Mutex;

    // 환경 변수는 프로세스 전역이라 from_env 를 부르는 테스트는 이 락으로 직렬화합니다.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = f();
        for (key, _) in vars {
            env::remove_var(key);
        }
        result
    }

    fn rejected_key(result: Result<AppConfig, ConfigError>) -> &'static str {
        match result {
            Err(ConfigError::Invalid { key, .. }) => key,
            other => panic!("expected invalid config, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn parse_var_should_return_default_when_missing() {
        let value: u32 = parse_var("MEETING_REPORT_TEST_MISSING_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn parse_var_should_parse_trimmed_value() {
        let value: u64 = with_env(&[("MEETING_REPORT_TEST_PARSE_KEY", " 12 ")], || {
            parse_var("MEETING_REPORT_TEST_PARSE_KEY", 0).unwrap()
        });

        assert_eq!(value, 12);
    }

    #[test]
    fn parse_var_should_reject_garbage() {
        let result: Result<u32, _> = with_env(&[("MEETING_REPORT_TEST_BAD_KEY", "five")], || {
            parse_var("MEETING_REPORT_TEST_BAD_KEY", 5)
        });

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "MEETING_REPORT_TEST_BAD_KEY", .. })
        ));
    }

    #[test]
    fn from_env_should_default_to_five_attempts() {
        let config = with_env(&[], || AppConfig::from_env().unwrap());

        assert_eq!(config.report_max_retry_count, MAX_RETRY_COUNT);
        assert_eq!(config.report_retry_initial_delay, Duration::from_secs(1));
        assert_eq!(config.report_attempt_timeout, Duration::from_secs(25));
        assert_eq!(config.prompt_template_path, PROMPT_TEMPLATE_PATH);
    }

    #[test]
    fn from_env_should_honour_retry_count_override() {
        let config = with_env(&[("REPORT_MAX_RETRY_COUNT", "3")], || {
            AppConfig::from_env().unwrap()
        });

        assert_eq!(config.report_max_retry_count, 3);
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 3);
    }

    #[test]
    fn from_env_should_reject_zero_retry_count() {
        let result = with_env(&[("REPORT_MAX_RETRY_COUNT", "0")], AppConfig::from_env);
        assert_eq!(rejected_key(result), "REPORT_MAX_RETRY_COUNT");
    }

    #[test]
    fn from_env_should_reject_shrinking_multiplier() {
        let result = with_env(&[("REPORT_RETRY_MULTIPLIER", "0.5")], AppConfig::from_env);
        assert_eq!(rejected_key(result), "REPORT_RETRY_MULTIPLIER");
    }

    #[test]
    fn from_env_should_reject_nan_multiplier() {
        let result = with_env(&[("REPORT_RETRY_MULTIPLIER", "NaN")], AppConfig::from_env);
        assert_eq!(rejected_key(result), "REPORT_RETRY_MULTIPLIER");
    }

    #[test]
    fn from_env_should_reject_max_delay_below_initial_delay() {
        let result = with_env(
            &[
                ("REPORT_RETRY_INITIAL_DELAY_MS", "5000"),
                ("REPORT_RETRY_MAX_DELAY_MS", "1000"),
            ],
            AppConfig::from_env,
        );
        assert_eq!(rejected_key(result), "REPORT_RETRY_MAX_DELAY_MS");
    }
}
