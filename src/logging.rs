//! 로깅 초기화
//!
//! stdout 과 일별 로그 파일에 JSON 구조화 로그를 함께 남깁니다.

use std::path::Path;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` 가 없을 때 사용하는 필터
pub const DEFAULT_LOG_FILTER: &str = "info,meeting_report_server=debug";

const LOG_FILE_PREFIX: &str = "meeting-report.log";

/// 로깅 시스템을 초기화합니다.
///
/// 파일명 형식은 `meeting-report.log.YYYY-MM-DD` 입니다.
/// 반환되는 `WorkerGuard` 를 main 에서 유지해야 종료 시 버퍼링된 로그가 손실되지 않습니다.
pub fn init_logging(log_dir: impl AsRef<Path>) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir.as_ref(), LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // 이미 초기화된 경우(테스트 등)에도 서버는 계속 뜬다
    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Failed to initialize tracing: {}", err);
    }

    guard
}
