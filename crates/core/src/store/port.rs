use super::error::StoreError;
use crate::common::Instrument;
use crate::market::entity::{Candle, StoredCandle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// K 线存储接口，负责分钟 K 线的持久化与读取。
///
/// # Invariants
/// - 单根 K 线的写入必须是原子的：要么完整落库，要么不留任何记录。
/// - `created_at` 与 `id` 由存储层在写入时分配。
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// # Summary
    /// 保存一根聚合完成的 K 线。
    ///
    /// # Logic
    /// 1. 定位标的对应的存储位置。
    /// 2. 在单个事务内写入记录并分配写入时间。
    ///
    /// # Arguments
    /// * `instrument`: 目标标的。
    /// * `candle`: 聚合结果。
    ///
    /// # Returns
    /// 成功返回带标识的已存储 K 线，失败返回 `StoreError`。
    async fn save_candle(
        &self,
        instrument: &Instrument,
        candle: &Candle,
    ) -> Result<StoredCandle, StoreError>;

    /// # Summary
    /// 加载分钟区间 `[start, end]` 内的 K 线，按分钟升序。
    async fn load_candles(
        &self,
        instrument: &Instrument,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredCandle>, StoreError>;

    /// # Summary
    /// 加载最近写入的 `limit` 根 K 线，按写入顺序倒序。
    async fn latest_candles(
        &self,
        instrument: &Instrument,
        limit: usize,
    ) -> Result<Vec<StoredCandle>, StoreError>;
}
