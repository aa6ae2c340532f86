use crate::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 报价源错误枚举，处理数据缺失、网络及格式问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 可克隆，便于测试脚本重复回放同一错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    // 报价源本轮没有可返回的数据
    #[error("Quote unavailable: {0}")]
    Unavailable(String),
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 文本无法解析为数值
    #[error("Malformed quote: {0}")]
    Malformed(String),
}

/// # Summary
/// 报价文本解析错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty value")]
    Empty,
    #[error("Not a number: '{0}'")]
    Invalid(String),
}

impl From<ParseError> for QuoteError {
    fn from(e: ParseError) -> Self {
        QuoteError::Malformed(e.to_string())
    }
}

/// # Summary
/// K 线聚合错误，出现时整个采样周期作废，不落库。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    // 窗口内没有任何有效报价
    #[error("Insufficient data: no priced ticks in window")]
    InsufficientData,
    // 价格为零导致百分比无法计算，通常意味着数据源损坏
    #[error("Division by zero while computing {0}")]
    DivisionByZero(&'static str),
    // 数值超出 Decimal 表示范围
    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}

/// # Summary
/// 单个采样周期的错误汇总，在 SamplingLoop 边界被吸收并记录。
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Volume snapshot failed: {0}")]
    Volume(#[from] QuoteError),
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("Store failed: {0}")]
    Store(#[from] StoreError),
}
