//! 供下游 crate 测试使用的模拟实现（`test-utils` feature）。

use crate::common::Instrument;
use crate::common::time::TimeProvider;
use crate::market::entity::{Candle, StoredCandle};
use crate::market::error::QuoteError;
use crate::market::port::QuoteSource;
use crate::store::error::StoreError;
use crate::store::port::CandleStore;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// # Summary
/// 按预设脚本回放的报价序列。
///
/// # Invariants
/// - 脚本耗尽后重复回放最后一个结果；从未设置脚本时返回 Unavailable。
#[derive(Default)]
struct Script {
    queue: VecDeque<Result<String, QuoteError>>,
    last: Option<Result<String, QuoteError>>,
}

impl Script {
    fn next(&mut self) -> Result<String, QuoteError> {
        if let Some(item) = self.queue.pop_front() {
            self.last = Some(item.clone());
            return item;
        }
        self.last
            .clone()
            .unwrap_or_else(|| Err(QuoteError::Unavailable("script is empty".into())))
    }
}

/// # Summary
/// 脚本驱动的模拟报价源，记录调用次数。
#[derive(Default)]
pub struct ScriptedQuoteSource {
    prices: Mutex<Script>,
    volumes: Mutex<Script>,
    price_calls: AtomicUsize,
    volume_calls: AtomicUsize,
}

impl ScriptedQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加价格文本脚本
    pub fn with_prices<I, S>(self, prices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_prices(prices.into_iter().map(|p| Ok(p.into())));
        self
    }

    /// 追加成交量文本脚本
    pub fn with_volumes<I, S>(self, volumes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut script = self.volumes.lock().unwrap_or_else(|e| e.into_inner());
            script.queue.extend(volumes.into_iter().map(|v| Ok(v.into())));
        }
        self
    }

    /// 追加任意价格结果（含错误）
    pub fn push_prices<I>(&self, items: I)
    where
        I: IntoIterator<Item = Result<String, QuoteError>>,
    {
        let mut script = self.prices.lock().unwrap_or_else(|e| e.into_inner());
        script.queue.extend(items);
    }

    /// 追加任意成交量结果（含错误）
    pub fn push_volumes<I>(&self, items: I)
    where
        I: IntoIterator<Item = Result<String, QuoteError>>,
    {
        let mut script = self.volumes.lock().unwrap_or_else(|e| e.into_inner());
        script.queue.extend(items);
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn volume_calls(&self) -> usize {
        self.volume_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuoteSource {
    async fn price_text(&self) -> Result<String, QuoteError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.prices.lock().unwrap_or_else(|e| e.into_inner()).next()
    }

    async fn volume_text(&self) -> Result<String, QuoteError> {
        self.volume_calls.fetch_add(1, Ordering::SeqCst);
        self.volumes.lock().unwrap_or_else(|e| e.into_inner()).next()
    }
}

/// # Summary
/// 基于内存的简易 K 线存储，可切换为持续失败模式。
#[derive(Default)]
pub struct MemCandleStore {
    rows: Mutex<Vec<(Instrument, StoredCandle)>>,
    failing: AtomicBool,
}

impl MemCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开启或关闭写入失败模式
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 当前已保存的全部 K 线
    pub fn candles(&self) -> Vec<Candle> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, stored)| stored.candle.clone())
            .collect()
    }
}

#[async_trait]
impl CandleStore for MemCandleStore {
    async fn save_candle(
        &self,
        instrument: &Instrument,
        candle: &Candle,
    ) -> Result<StoredCandle, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store is failing".into()));
        }
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let id = i64::try_from(rows.len()).unwrap_or(i64::MAX).saturating_add(1);
        let stored = StoredCandle {
            id,
            created_at: Utc::now(),
            candle: candle.clone(),
        };
        rows.push((instrument.clone(), stored.clone()));
        Ok(stored)
    }

    async fn load_candles(
        &self,
        instrument: &Instrument,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredCandle>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<StoredCandle> = rows
            .iter()
            .filter(|(i, s)| i == instrument && s.candle.minute >= start && s.candle.minute <= end)
            .map(|(_, s)| s.clone())
            .collect();
        found.sort_by_key(|s| s.candle.minute);
        Ok(found)
    }

    async fn latest_candles(
        &self,
        instrument: &Instrument,
        limit: usize,
    ) -> Result<Vec<StoredCandle>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .iter()
            .rev()
            .filter(|(i, _)| i == instrument)
            .take(limit)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

/// # Summary
/// 锚定在 tokio 虚拟时间上的时钟，配合 `start_paused` 测试使用。
///
/// # Invariants
/// - 返回值 = 起点 + 自创建以来 tokio 时间的流逝量。
pub struct PausedClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl PausedClock {
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

impl TimeProvider for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.origin + elapsed
    }
}
