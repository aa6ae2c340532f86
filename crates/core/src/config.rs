use serde::{Deserialize, Serialize};
use thiserror::Error;

/// # Summary
/// 全局应用配置。
///
/// # Invariants
/// - 每个分段都带有默认值，配置文件与环境变量只需覆盖差异项。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub instrument: InstrumentConfig,
    pub feed: FeedConfig,
    pub schedule: ScheduleConfig,
    pub sampler: SamplerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub instance: InstanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub exchange: Option<String>,
}

/// 报价源配置。价格与成交量通过 JSON Pointer 从响应体中提取。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub price_pointer: String,
    pub volume_pointer: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// 市场时段配置，小时区间为左闭右开 `[open_hour, close_hour)`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    // IANA 时区名称
    pub timezone: String,
    pub open_hour: u32,
    pub close_hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    // 两次报价轮询之间的间隔
    pub poll_interval_ms: u64,
    // 非交易时段的等待间隔
    pub idle_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_name: String,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    // 单实例锁文件路径
    pub lock_file: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            exchange: Some("OANDA".to_string()),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9222/quote".to_string(),
            price_pointer: "/last".to_string(),
            volume_pointer: "/volume".to_string(),
            timeout_secs: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Kyiv".to_string(),
            open_hour: 8,
            close_hour: 24,
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            idle_interval_secs: 60,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file_name: "sampler.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            lock_file: "/tmp/candela-sampler.lock".to_string(),
        }
    }
}

/// # Summary
/// 配置校验错误，在启动阶段暴露非法配置。
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid timezone '{0}'")]
    InvalidTimezone(String),
    #[error("Invalid market hours: open {open}, close {close}")]
    InvalidHours { open: u32, close: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.instrument.symbol, "EURUSD");
        assert_eq!(config.schedule.timezone, "Europe/Kyiv");
        assert_eq!(config.schedule.open_hour, 8);
        assert_eq!(config.schedule.close_hour, 24);
        assert_eq!(config.sampler.poll_interval_ms, 500);
        assert_eq!(config.sampler.idle_interval_secs, 60);
        assert_eq!(config.database.data_dir, "data");
    }
}
