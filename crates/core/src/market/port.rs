use crate::market::error::QuoteError;
use async_trait::async_trait;

/// # Summary
/// 实时报价源接口（原始数据源）。
///
/// # Invariants
/// - 实现者必须能承受约 2 Hz、持续 60 秒的连续调用。
/// - 数据缺失时返回 `QuoteError::Unavailable`，不得阻塞等待。
/// - 同一实例在进程生命周期内被复用，不会被并发调用。
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// # Summary
    /// 读取当前报价的原始文本。
    ///
    /// # Returns
    /// 成功返回报价文本，否则返回 QuoteError。
    async fn price_text(&self) -> Result<String, QuoteError>;

    /// # Summary
    /// 读取当前累计成交量的原始文本。
    ///
    /// # Returns
    /// 成功返回成交量文本，否则返回 QuoteError。
    async fn volume_text(&self) -> Result<String, QuoteError>;
}
