mod guard;
mod logging;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use candela_core::common::Instrument;
use candela_core::common::time::{RealTimeProvider, TimeProvider};
use candela_feed::http::HttpQuoteSource;
use candela_sampler::runner::SamplingLoop;
use candela_sampler::sampler::TickSampler;
use candela_sampler::schedule::MarketSchedule;
use candela_store::candle::SqliteCandleStore;
use guard::{GuardError, InstanceGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 SamplingLoop。
///
/// # Logic
/// 1. 加载配置并初始化全局日志。
/// 2. 获取单实例锁，已有实例运行时直接退出。
/// 3. 实例化基础设施层（Feed、Store、Clock）。
/// 4. 构造采样器与主循环，并在后台任务中运行。
/// 5. 等待退出信号，取消循环并等待当前周期结束。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config = settings::load()?;
    let _log_guard = logging::init(&config.logging)?;
    info!("Candela sampler starting...");

    // 2. 单实例锁
    let _instance = match InstanceGuard::acquire(&config.instance.lock_file) {
        Ok(guard) => guard,
        Err(GuardError::AlreadyRunning(path)) => {
            warn!("Sampler already running (lock held at {}). Exiting.", path);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // reqwest 使用 rustls-no-provider，需要显式安装加密后端
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }
    candela_store::config::set_root_dir(PathBuf::from(&config.database.data_dir));

    // 3. 实例化基础设施层
    let instrument = Instrument::new(
        config.instrument.symbol.clone(),
        config.instrument.exchange.clone(),
    );
    let source = Arc::new(HttpQuoteSource::new(&config.feed)?);
    let store = Arc::new(SqliteCandleStore::new()?);
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);

    // 4. 构造主循环
    let schedule = MarketSchedule::from_config(&config.schedule)?;
    let sampler = TickSampler::new(
        source,
        clock.clone(),
        Duration::from_millis(config.sampler.poll_interval_ms),
    );
    let sampling = SamplingLoop::new(
        instrument,
        schedule,
        sampler,
        store,
        clock,
        Duration::from_secs(config.sampler.idle_interval_secs),
    );

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { sampling.run(token).await });

    info!("SamplingLoop started. Waiting for signals...");

    // 5. 挂起主线程，等待外部退出信号
    wait_for_shutdown().await?;
    info!("Shutdown signal received. Finishing current cycle...");
    shutdown.cancel();
    handle.await?;

    info!("Candela sampler stopped.");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
