pub mod time;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 与外部协作方交换时间戳时使用的字面格式（本地时间，秒级精度）。
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// # Summary
/// 被采样的交易标的，代表报价源所对应的货币对或资产。
///
/// # Invariants
/// - `symbol` 必须是合法的交易代码。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    // 交易代码 (例如: EURUSD)
    pub symbol: String,
    // 报价来源的交易商或交易所 (可选，例如: OANDA)
    pub exchange: Option<String>,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, exchange: Option<String>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.exchange {
            Some(exchange) => write!(f, "{}:{}", exchange, self.symbol),
            None => write!(f, "{}", self.symbol),
        }
    }
}

/// # Summary
/// 将 UTC 时刻渲染为指定时区下的 `YYYY-MM-DD HH:MM:SS` 文本。
///
/// # Arguments
/// * `instant`: 待渲染的时刻。
/// * `tz`: 目标时区。
///
/// # Returns
/// 本地时间字符串。
pub fn format_local<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string()
}
