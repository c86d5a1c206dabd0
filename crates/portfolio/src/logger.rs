use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "portfolio.log";

/// stdout + 일 단위 롤링 파일 로그 초기화
///
/// 반환된 가드가 살아있는 동안만 파일 로그가 flush되므로 main에서 유지해야 함
pub fn init_tracing(log_dir: impl AsRef<Path>) -> Vec<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(stdout_writer).with_target(true))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    vec![stdout_guard, file_guard]
}
