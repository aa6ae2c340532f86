use candela_core::common::Instrument;
use candela_core::common::time::{FakeClockProvider, TimeProvider};
use candela_core::market::error::{AggregationError, SamplerError};
use candela_core::store::port::CandleStore;
use candela_core::testing::{MemCandleStore, PausedClock, ScriptedQuoteSource};
use candela_sampler::runner::{DEFAULT_IDLE_INTERVAL, LoopState, SamplingLoop};
use candela_sampler::sampler::{DEFAULT_POLL_INTERVAL, TickSampler};
use candela_sampler::schedule::MarketSchedule;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fx() -> Instrument {
    Instrument::new("EURUSD", Some("OANDA".into()))
}

fn build_loop(
    source: Arc<ScriptedQuoteSource>,
    store: Arc<MemCandleStore>,
    clock: Arc<dyn TimeProvider>,
) -> SamplingLoop {
    let schedule = MarketSchedule::new(chrono_tz::UTC, 8, 24).unwrap();
    let sampler = TickSampler::new(source, clock.clone(), DEFAULT_POLL_INTERVAL);
    SamplingLoop::new(fx(), schedule, sampler, store, clock, DEFAULT_IDLE_INTERVAL)
}

fn utc(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, minute, second).unwrap()
}

#[test]
fn test_next_state_follows_schedule() {
    let clock = Arc::new(FakeClockProvider::new(utc(12, 10, 0, 0)));
    let source = Arc::new(ScriptedQuoteSource::new());
    let sampling = build_loop(source, Arc::new(MemCandleStore::new()), clock.clone());

    assert_eq!(sampling.next_state(), LoopState::Sampling);
    clock.set_time(utc(12, 3, 0, 0));
    assert_eq!(sampling.next_state(), LoopState::Waiting);
    clock.set_time(utc(17, 10, 0, 0));
    assert_eq!(sampling.next_state(), LoopState::Waiting);
}

/// # Summary
/// 一个完整周期：采样、聚合并落库一根 K 线。
#[tokio::test(start_paused = true)]
async fn test_cycle_persists_candle() {
    let source = Arc::new(
        ScriptedQuoteSource::new()
            .with_prices(["1,12345", "1,12345", "1,12400"])
            .with_volumes(["1000", "2000"]),
    );
    let store = Arc::new(MemCandleStore::new());
    let clock = Arc::new(PausedClock::new(utc(12, 10, 0, 55)));
    let sampling = build_loop(source, store.clone(), clock);

    let stored = sampling.run_cycle().await.unwrap();

    assert_eq!(stored.candle.minute, utc(12, 10, 0, 0));
    assert_eq!(stored.candle.open_price, dec!(1.12345));
    assert_eq!(stored.candle.close_price, dec!(1.124));
    assert_eq!(stored.candle.number_of_changes, 1);
    assert_eq!(stored.candle.max_delay, dec!(1));
    assert_eq!(stored.candle.volume_percent_change, dec!(100));
    assert_eq!(store.candles().len(), 1);
    assert_eq!(store.latest_candles(&fx(), 1).await.unwrap()[0].id, stored.id);
}

/// # Summary
/// 没有有效报价或存储失败时，周期返回错误且不留下记录。
#[tokio::test(start_paused = true)]
async fn test_cycle_failures_leave_nothing_behind() {
    let source = Arc::new(ScriptedQuoteSource::new().with_volumes(["1000"]));
    let store = Arc::new(MemCandleStore::new());
    let clock = Arc::new(PausedClock::new(utc(12, 10, 0, 57)));
    let sampling = build_loop(source.clone(), store.clone(), clock);

    let result = sampling.run_cycle().await;
    assert!(matches!(
        result,
        Err(SamplerError::Aggregation(AggregationError::InsufficientData))
    ));

    source.push_prices([Ok("1,1".to_string())]);
    store.set_failing(true);
    let result = sampling.run_cycle().await;
    assert!(matches!(result, Err(SamplerError::Store(_))));

    source.push_prices([Ok("0".to_string())]);
    store.set_failing(false);
    let result = sampling.run_cycle().await;
    assert!(matches!(
        result,
        Err(SamplerError::Aggregation(AggregationError::DivisionByZero(_)))
    ));

    assert!(store.candles().is_empty());
}

/// # Summary
/// 交易时段内每分钟产出一根 K 线，错误不会终止循环，取消后干净退出。
#[tokio::test(start_paused = true)]
async fn test_loop_produces_one_candle_per_minute() {
    let source = Arc::new(
        ScriptedQuoteSource::new()
            .with_prices(["1,1000", "1,1005", "1,0995"])
            .with_volumes(["1000"]),
    );
    let store = Arc::new(MemCandleStore::new());
    let clock = Arc::new(PausedClock::new(utc(12, 10, 0, 30)));
    let sampling = build_loop(source, store.clone(), clock);

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { sampling.run(token).await });

    tokio::time::sleep(Duration::from_secs(150)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let candles = store.candles();
    assert!(candles.len() >= 2, "got {} candles", candles.len());
    assert_eq!(candles[0].minute, utc(12, 10, 0, 0));
    assert_eq!(candles[1].minute, utc(12, 10, 1, 0));
    assert!(candles.windows(2).all(|p| p[0].minute < p[1].minute));
}

/// # Summary
/// 周末只等待不采样，取消信号可以打断等待。
#[tokio::test(start_paused = true)]
async fn test_loop_idles_on_weekend() {
    let source = Arc::new(ScriptedQuoteSource::new().with_prices(["1,1"]).with_volumes(["1"]));
    let store = Arc::new(MemCandleStore::new());
    let clock = Arc::new(PausedClock::new(utc(17, 10, 0, 0)));
    let sampling = build_loop(source.clone(), store.clone(), clock);

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { sampling.run(token).await });

    tokio::time::sleep(Duration::from_secs(300)).await;
    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(source.price_calls(), 0);
    assert_eq!(source.volume_calls(), 0);
    assert!(store.candles().is_empty());
}

/// # Summary
/// 开盘前等待，到达开盘时间后转入采样。
#[tokio::test(start_paused = true)]
async fn test_loop_wakes_at_market_open() {
    let source = Arc::new(ScriptedQuoteSource::new().with_prices(["1,1"]).with_volumes(["1"]));
    let store = Arc::new(MemCandleStore::new());
    let clock = Arc::new(PausedClock::new(utc(12, 7, 59, 0)));
    let sampling = build_loop(source, store.clone(), clock);

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { sampling.run(token).await });

    tokio::time::sleep(Duration::from_secs(200)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let candles = store.candles();
    assert!(!candles.is_empty());
    assert_eq!(candles[0].minute, utc(12, 8, 0, 0));
}

/// # Summary
/// 成交量持续不可用时，循环按轮询间隔重试，调用频率不超过约 2 Hz。
#[tokio::test(start_paused = true)]
async fn test_volume_outage_is_retried_at_poll_rate() {
    let source = Arc::new(ScriptedQuoteSource::new().with_prices(["1,1"]));
    let store = Arc::new(MemCandleStore::new());
    let clock = Arc::new(PausedClock::new(utc(12, 10, 0, 0)));
    let sampling = build_loop(source.clone(), store.clone(), clock);

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { sampling.run(token).await });

    tokio::time::sleep(Duration::from_secs(60)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let calls = source.volume_calls();
    assert!((100..=125).contains(&calls), "volume_calls = {calls}");
    assert_eq!(source.price_calls(), 0);
    assert!(store.candles().is_empty());
}
