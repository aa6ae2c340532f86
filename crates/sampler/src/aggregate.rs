use candela_core::market::entity::{Candle, SampleWindow};
use candela_core::market::error::AggregationError;
use chrono::{DurationRound, TimeDelta};
use rust_decimal::Decimal;

/// # Summary
/// 将一个采样窗口聚合为分钟 K 线。
///
/// # Logic
/// 1. 取所有有效报价，首尾分别为开盘与收盘，求最高、最低与均值。
/// 2. 计算绝对波动及相对开盘价、最低价的百分比波动；除数为零直接报错。
/// 3. 变化次数为窗口内 Tick 数减一。
/// 4. 相邻 Tick 的秒级时间差构成时延序列，求最大、最小与均值，空序列取零。
/// 5. 计算成交量增量、相对起始量的百分比（起始量为零时取零）与每分钟均量。
///
/// # Arguments
/// * `window`: 完整的采样窗口。
///
/// # Returns
/// 成功返回 Candle；没有任何有效报价返回 `InsufficientData`，
/// 价格为零返回 `DivisionByZero`，数值超出 Decimal 范围返回 `Overflow`。
pub fn aggregate(window: &SampleWindow) -> Result<Candle, AggregationError> {
    let prices: Vec<Decimal> = window.ticks.iter().filter_map(|t| t.value).collect();

    let (Some(&open_price), Some(&close_price)) = (prices.first(), prices.last()) else {
        return Err(AggregationError::InsufficientData);
    };
    let high_price = prices.iter().copied().max().unwrap_or(open_price);
    let low_price = prices.iter().copied().min().unwrap_or(open_price);
    let average_value = mean(&prices, "average_value")?;

    let absolute_volatility = high_price
        .checked_sub(low_price)
        .ok_or(AggregationError::Overflow("absolute_volatility"))?;
    let percentage_volatility_open = percent(absolute_volatility, open_price, "percentage_volatility_open")?;
    let percentage_volatility_low = percent(absolute_volatility, low_price, "percentage_volatility_low")?;

    let number_of_changes = u32::try_from(window.ticks.len().saturating_sub(1)).unwrap_or(u32::MAX);

    let delays: Vec<Decimal> = window
        .ticks
        .windows(2)
        .map(|pair| Decimal::from((pair[1].captured_at - pair[0].captured_at).num_seconds()))
        .collect();
    let max_delay = delays.iter().copied().max().unwrap_or(Decimal::ZERO);
    let min_delay = delays.iter().copied().min().unwrap_or(Decimal::ZERO);
    let average_delay = mean(&delays, "average_delay")?;

    let volume_delta = window
        .volume_stop
        .checked_sub(window.volume_start)
        .ok_or(AggregationError::Overflow("volume_delta"))?;
    let volume_percent_change = if window.volume_start == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(volume_delta) / Decimal::from(window.volume_start) * Decimal::ONE_HUNDRED
    };
    let volume_average_per_minute = Decimal::from(volume_delta) / Decimal::from(60);

    let minute = window
        .window_end
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(window.window_end);

    Ok(Candle {
        minute,
        open_price,
        high_price,
        low_price,
        close_price,
        average_value,
        absolute_volatility,
        percentage_volatility_open,
        percentage_volatility_low,
        number_of_changes,
        max_delay,
        min_delay,
        average_delay,
        volume_start: window.volume_start,
        volume_stop: window.volume_stop,
        volume_delta,
        volume_percent_change,
        volume_average_per_minute,
    })
}

/// 空序列均值为零
fn mean(values: &[Decimal], field: &'static str) -> Result<Decimal, AggregationError> {
    if values.is_empty() {
        return Ok(Decimal::ZERO);
    }
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .and_then(|sum| sum.checked_div(Decimal::from(values.len())))
        .ok_or(AggregationError::Overflow(field))
}

fn percent(
    numerator: Decimal,
    divisor: Decimal,
    field: &'static str,
) -> Result<Decimal, AggregationError> {
    if divisor.is_zero() {
        return Err(AggregationError::DivisionByZero(field));
    }
    numerator
        .checked_div(divisor)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(AggregationError::Overflow(field))
}
