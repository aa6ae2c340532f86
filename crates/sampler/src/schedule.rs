use candela_core::config::{ConfigError, ScheduleConfig};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// # Summary
/// 市场时段判断器，是采样是否运行的唯一依据。
///
/// # Invariants
/// - 仅周一至周五开放。
/// - 本地小时落在 `[open_hour, close_hour)` 内才开放，`close_hour` 可取 24。
/// - 纯函数，无缓存，每次循环重新判断。
#[derive(Debug, Clone, Copy)]
pub struct MarketSchedule {
    tz: Tz,
    open_hour: u32,
    close_hour: u32,
}

impl MarketSchedule {
    /// # Summary
    /// 以给定时区和小时区间创建判断器。
    ///
    /// # Returns
    /// 小时区间非法（开盘不早于收盘或超过 24）时返回 ConfigError。
    pub fn new(tz: Tz, open_hour: u32, close_hour: u32) -> Result<Self, ConfigError> {
        if open_hour >= close_hour || close_hour > 24 {
            return Err(ConfigError::InvalidHours {
                open: open_hour,
                close: close_hour,
            });
        }
        Ok(Self {
            tz,
            open_hour,
            close_hour,
        })
    }

    /// 从配置构造，解析 IANA 时区名称。
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(config.timezone.clone()))?;
        Self::new(tz, config.open_hour, config.close_hour)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// # Summary
    /// 判断给定时刻是否处于市场时段。
    ///
    /// # Logic
    /// 1. 转换为配置时区的本地时间。
    /// 2. 周末直接关闭。
    /// 3. 检查本地小时是否落在开放区间内。
    pub fn should_run_now(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        match local.weekday() {
            Weekday::Sat | Weekday::Sun => false,
            _ => (self.open_hour..self.close_hour).contains(&local.hour()),
        }
    }
}

impl Default for MarketSchedule {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Europe::Kyiv,
            open_hour: 8,
            close_hour: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc_schedule() -> MarketSchedule {
        MarketSchedule::new(chrono_tz::UTC, 8, 24).unwrap()
    }

    #[test]
    fn test_weekday_hours() {
        let schedule = utc_schedule();
        // 2026-10-12 是周一
        assert!(schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap()));
        assert!(!schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 3, 0, 0).unwrap()));
        assert!(schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap()));
        assert!(!schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 7, 59, 59).unwrap()));
        assert!(schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_weekend_closed() {
        let schedule = utc_schedule();
        assert!(!schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap()));
        assert!(!schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap()));
    }

    #[test]
    fn test_local_timezone_applies() {
        let schedule = MarketSchedule::default();
        // Kyiv 夏令时 UTC+3：05:30 UTC 即本地 08:30
        assert!(schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 5, 30, 0).unwrap()));
        assert!(!schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 12, 4, 30, 0).unwrap()));
        // 周五 22:30 UTC 在 Kyiv 已是周六
        assert!(!schedule.should_run_now(Utc.with_ymd_and_hms(2026, 10, 16, 22, 30, 0).unwrap()));
    }

    #[test]
    fn test_from_config_validation() {
        let mut config = ScheduleConfig::default();
        assert!(MarketSchedule::from_config(&config).is_ok());

        config.timezone = "Mars/Olympus".into();
        assert!(matches!(
            MarketSchedule::from_config(&config),
            Err(ConfigError::InvalidTimezone(_))
        ));

        config.timezone = "UTC".into();
        config.open_hour = 18;
        config.close_hour = 9;
        assert!(matches!(
            MarketSchedule::from_config(&config),
            Err(ConfigError::InvalidHours { .. })
        ));
    }
}
