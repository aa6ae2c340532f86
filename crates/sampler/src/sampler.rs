use candela_core::common::time::TimeProvider;
use candela_core::market::entity::{SampleWindow, Tick};
use candela_core::market::error::{QuoteError, SamplerError};
use candela_core::market::parse::{parse_price, parse_volume};
use candela_core::market::port::QuoteSource;
use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// # Summary
/// 计算当前自然分钟的结束时刻（秒取 59，亚秒取最大值）。
///
/// # Arguments
/// * `now`: 当前时刻。
///
/// # Returns
/// 同一分钟内的最后一个纳秒。
pub fn window_end(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_second(59)
        .and_then(|t| t.with_nanosecond(999_999_999))
        .unwrap_or(now)
}

/// # Summary
/// 分钟对齐的报价采样器。
///
/// # Invariants
/// - 每次调用 `sample` 恰好产出一个 SampleWindow。
/// - 轮询严格串行，相邻两次之间固定等待 `poll_interval`。
/// - 循环在时钟越过分钟末时终止，不会无限阻塞。
pub struct TickSampler {
    source: Arc<dyn QuoteSource>,
    clock: Arc<dyn TimeProvider>,
    poll_interval: Duration,
}

impl TickSampler {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        clock: Arc<dyn TimeProvider>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            poll_interval,
        }
    }

    /// 相邻两次轮询之间的间隔
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// # Summary
    /// 采集一个分钟窗口。
    ///
    /// # Logic
    /// 1. 读取起始累计成交量。
    /// 2. 计算当前分钟的结束时刻。
    /// 3. 在结束前循环读取报价，仅记录与上一个值不同的 Tick。
    /// 4. 读取结束累计成交量。
    ///
    /// # Returns
    /// 成功返回 SampleWindow；成交量快照失败返回 `SamplerError::Volume`。
    pub async fn sample(&self) -> Result<SampleWindow, SamplerError> {
        let volume_start = self.read_volume().await?;
        let started = self.clock.now();
        let end = window_end(started);
        let mut window = SampleWindow::new(volume_start, end);

        info!("Start of information collection: {}", started.format("%Y-%m-%d %H:%M"));

        let mut polls = 0usize;
        while self.clock.now() < end {
            let tick = self.capture().await;
            window.record(tick);
            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
        }

        window.volume_stop = self.read_volume().await?;

        info!(
            "Stop of information collection: {} ({} polls, {} ticks)",
            self.clock.now().format("%Y-%m-%d %H:%M"),
            polls,
            window.ticks.len()
        );

        Ok(window)
    }

    /// # Summary
    /// 读取一次报价。失败不丢弃本轮，而是产出一个空值 Tick。
    async fn capture(&self) -> Tick {
        let now = self.clock.now();
        let captured_at = now.with_nanosecond(0).unwrap_or(now);

        let value = match self.source.price_text().await {
            Ok(text) => match parse_price(&text) {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("Failed to parse quote '{}': {}", text, e);
                    None
                }
            },
            Err(QuoteError::Unavailable(reason)) => {
                debug!("Quote unavailable: {}", reason);
                None
            }
            Err(e) => {
                warn!("Quote read failed: {}", e);
                None
            }
        };

        Tick::new(value, captured_at)
    }

    async fn read_volume(&self) -> Result<i64, QuoteError> {
        let text = self.source.volume_text().await?;
        Ok(parse_volume(&text)?)
    }
}
