use candela_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 初始化全局日志：控制台输出 + 按天滚动的日志文件。
///
/// # Logic
/// 1. 创建按天滚动的文件写入器，并包装为非阻塞写入。
/// 2. 过滤级别优先取 `RUST_LOG`，否则使用配置中的级别。
/// 3. 注册控制台层与不带 ANSI 颜色的文件层。
///
/// # Returns
/// 非阻塞写入器的 WorkerGuard，必须持有到进程结束，否则尾部日志会丢失。
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, InitError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_name)
        .build(&config.dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}
