use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单次报价观测。
///
/// # Invariants
/// - `captured_at` 为秒级精度。
/// - `value` 为 None 代表本轮报价获取或解析失败。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    // 报价，提取失败时为空
    pub value: Option<Decimal>,
    // 观测时刻
    pub captured_at: DateTime<Utc>,
}

impl Tick {
    pub fn new(value: Option<Decimal>, captured_at: DateTime<Utc>) -> Self {
        Self { value, captured_at }
    }
}

/// # Summary
/// 一个分钟采样周期的原始产出。
///
/// # Invariants
/// - `ticks` 严格按时间排序。
/// - 相邻两个 Tick 的 `value` 不相等（两个空值视为相等）。
/// - 每个采样周期新建一次，被聚合器消费一次后丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub ticks: Vec<Tick>,
    // 轮询开始前的累计成交量
    pub volume_start: i64,
    // 轮询结束后的累计成交量
    pub volume_stop: i64,
    // 轮询运行到的分钟末时刻
    pub window_end: DateTime<Utc>,
}

impl SampleWindow {
    pub fn new(volume_start: i64, window_end: DateTime<Utc>) -> Self {
        Self {
            ticks: Vec::new(),
            volume_start,
            volume_stop: volume_start,
            window_end,
        }
    }

    /// # Summary
    /// 记录一个 Tick，维持相邻去重不变量。
    ///
    /// # Logic
    /// 1. 与最后一个已记录 Tick 的值比较。
    /// 2. 仅当不同（或尚无记录）时追加。
    ///
    /// # Returns
    /// 追加成功返回 true。
    pub fn record(&mut self, tick: Tick) -> bool {
        if self.ticks.last().is_some_and(|last| last.value == tick.value) {
            return false;
        }
        self.ticks.push(tick);
        true
    }
}

/// # Summary
/// 分钟 K 线聚合记录，包含价格、波动、时延与成交量统计。
///
/// # Invariants
/// - `high_price` 大于或等于 `low_price`。
/// - `number_of_changes` 等于窗口内 Tick 数减一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    // 所属的自然分钟（秒与亚秒为零）
    pub minute: DateTime<Utc>,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub average_value: Decimal,
    pub absolute_volatility: Decimal,
    // 相对开盘价的波动百分比
    pub percentage_volatility_open: Decimal,
    // 相对最低价的波动百分比
    pub percentage_volatility_low: Decimal,
    pub number_of_changes: u32,
    // 相邻 Tick 之间的秒数统计
    pub max_delay: Decimal,
    pub min_delay: Decimal,
    pub average_delay: Decimal,
    pub volume_start: i64,
    pub volume_stop: i64,
    pub volume_delta: i64,
    pub volume_percent_change: Decimal,
    pub volume_average_per_minute: Decimal,
}

impl std::fmt::Display for Candle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Candle at {} - Open: {}, Close: {}",
            self.minute.format(crate::common::TIMESTAMP_FORMAT),
            self.open_price,
            self.close_price
        )
    }
}

/// # Summary
/// 已持久化的 K 线，附带存储层分配的标识与写入时间。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCandle {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub candle: Candle,
}
