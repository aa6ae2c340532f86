use crate::aggregate::aggregate;
use crate::sampler::TickSampler;
use crate::schedule::MarketSchedule;
use candela_core::common::time::TimeProvider;
use candela_core::common::{Instrument, format_local};
use candela_core::market::entity::StoredCandle;
use candela_core::market::error::{AggregationError, SamplerError};
use candela_core::store::port::CandleStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 非交易时段的默认等待间隔
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(60);

/// # Summary
/// 采样循环所处的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    // 非交易时段，等待下一次判断
    Waiting,
    // 一个完整的 采样→聚合→落库 周期正在进行
    Sampling,
}

/// # Summary
/// 编排 MarketSchedule → TickSampler → 聚合 → 落库 的主循环。
///
/// # Invariants
/// - 周期严格串行，前一个窗口完成后才开始下一个。
/// - 任何单周期错误只记录日志，不会终止循环。
/// - 取消信号只在周期之间以及等待期间被观察，进行中的周期总会跑完。
pub struct SamplingLoop {
    instrument: Instrument,
    schedule: MarketSchedule,
    sampler: TickSampler,
    store: Arc<dyn CandleStore>,
    clock: Arc<dyn TimeProvider>,
    idle_interval: Duration,
}

impl SamplingLoop {
    pub fn new(
        instrument: Instrument,
        schedule: MarketSchedule,
        sampler: TickSampler,
        store: Arc<dyn CandleStore>,
        clock: Arc<dyn TimeProvider>,
        idle_interval: Duration,
    ) -> Self {
        Self {
            instrument,
            schedule,
            sampler,
            store,
            clock,
            idle_interval,
        }
    }

    /// 按当前时刻判断下一步应处的状态
    pub fn next_state(&self) -> LoopState {
        if self.schedule.should_run_now(self.clock.now()) {
            LoopState::Sampling
        } else {
            LoopState::Waiting
        }
    }

    /// # Summary
    /// 执行一个完整周期：采样、聚合、落库。
    ///
    /// # Logic
    /// 1. 通过 TickSampler 采集当前分钟窗口。
    /// 2. 聚合为 K 线，失败则整个周期作废。
    /// 3. 调用存储层保存一次，不重试。
    ///
    /// # Returns
    /// 成功返回已存储的 K 线，否则返回 SamplerError。
    pub async fn run_cycle(&self) -> Result<StoredCandle, SamplerError> {
        let window = self.sampler.sample().await?;
        let candle = aggregate(&window)?;

        info!("Open price: {}", candle.open_price);
        info!("Close price: {}", candle.close_price);
        info!("High price: {}", candle.high_price);
        info!("Low price: {}", candle.low_price);
        info!("Average price: {}", candle.average_value);

        Ok(self.store.save_candle(&self.instrument, &candle).await?)
    }

    /// # Summary
    /// 持续运行直到收到取消信号。
    ///
    /// # Logic
    /// 1. 每轮开始前检查取消信号。
    /// 2. 交易时段内立即执行一个周期，错误在此边界吸收；成交量读取失败后等待一个轮询间隔。
    /// 3. 非交易时段等待 `idle_interval`，等待期间可被取消。
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("########## Starting sampling loop for {} ##########", self.instrument);

        while !shutdown.is_cancelled() {
            match self.next_state() {
                LoopState::Sampling => match self.run_cycle().await {
                    Ok(stored) => info!("Saved {} (#{})", stored.candle, stored.id),
                    Err(e) => {
                        self.report(&e);
                        // 成交量读取失败时窗口尚未运行，等待一个轮询间隔再重试
                        if matches!(e, SamplerError::Volume(_)) {
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = tokio::time::sleep(self.sampler.poll_interval()) => {}
                            }
                        }
                    }
                },
                LoopState::Waiting => {
                    info!(
                        "{} - Sampler is idle outside market hours. Waiting...",
                        format_local(self.clock.now(), &self.schedule.timezone())
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.idle_interval) => {}
                    }
                }
            }
        }

        info!("Sampling loop for {} stopped", self.instrument);
    }

    fn report(&self, e: &SamplerError) {
        match e {
            SamplerError::Aggregation(AggregationError::InsufficientData) => {
                warn!("No priced ticks this minute, candle skipped: {}", e)
            }
            SamplerError::Aggregation(AggregationError::DivisionByZero(_)) => {
                error!("Anomalous zero price from feed, candle skipped: {}", e)
            }
            SamplerError::Aggregation(AggregationError::Overflow(_)) => {
                error!("Out-of-range price from feed, candle skipped: {}", e)
            }
            SamplerError::Volume(_) => warn!("Cycle aborted: {}", e),
            SamplerError::Store(_) => error!("Failed to persist candle, discarded: {}", e),
        }
    }
}
