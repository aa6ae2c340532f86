//! 报价文本解析。
//!
//! 行情页面使用逗号作为小数分隔符、空格（含不换行空格）作为千位分隔符，
//! 负号可能是 Unicode 减号。成交量可能带 K/M/B 数量级后缀。

use super::error::ParseError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// # Summary
/// 将价格文本解析为十进制数。
///
/// # Logic
/// 1. 去除所有空白字符（千位分隔符）。
/// 2. 将逗号替换为小数点，将 Unicode 减号替换为 ASCII 减号。
/// 3. 按十进制解析。
///
/// # Arguments
/// * `text`: 报价源返回的原始文本。
///
/// # Returns
/// 成功返回 Decimal，空文本或非数字返回 ParseError。
pub fn parse_price(text: &str) -> Result<Decimal, ParseError> {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            ',' => '.',
            '\u{2212}' => '-',
            other => other,
        })
        .collect();

    if normalized.is_empty() {
        return Err(ParseError::Empty);
    }

    Decimal::from_str(&normalized).map_err(|_| ParseError::Invalid(text.trim().to_string()))
}

/// # Summary
/// 将累计成交量文本解析为整数。
///
/// # Logic
/// 1. 剥离末尾的数量级后缀（K/M/B，大小写不敏感，最多一个）。
/// 2. 去除空白字符（千位分隔符）；剩余部分只允许数字与小数分隔符，逗号视为小数点。
/// 3. 乘以数量级并截断为整数。
///
/// # Arguments
/// * `text`: 报价源返回的原始文本，例如 `"12,5 K"`。
///
/// # Returns
/// 成功返回非负整数成交量；含有其他字符（包括负号）返回 `Invalid`。
pub fn parse_volume(text: &str) -> Result<i64, ParseError> {
    let trimmed = text.trim();
    let (body, multiplier) = match trimmed.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&trimmed[..trimmed.len() - 1], Decimal::from(1_000)),
        Some('M') => (&trimmed[..trimmed.len() - 1], Decimal::from(1_000_000)),
        Some('B') => (&trimmed[..trimmed.len() - 1], Decimal::from(1_000_000_000)),
        _ => (trimmed, Decimal::ONE),
    };

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ParseError::Empty);
    }
    if !compact.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return Err(ParseError::Invalid(trimmed.to_string()));
    }

    let digits = compact.replace(',', ".");
    let amount =
        Decimal::from_str(&digits).map_err(|_| ParseError::Invalid(trimmed.to_string()))?;

    amount
        .checked_mul(multiplier)
        .and_then(|v| v.trunc().to_i64())
        .ok_or_else(|| ParseError::Invalid(trimmed.to_string()))
}
