use candela_core::common::Instrument;
use candela_core::market::entity::Candle;
use candela_core::store::port::CandleStore;
use candela_store::candle::SqliteCandleStore;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn sample_candle(minute: DateTime<Utc>) -> Candle {
    Candle {
        minute,
        open_price: dec!(1.12345),
        high_price: dec!(1.124),
        low_price: dec!(1.12345),
        close_price: dec!(1.124),
        average_value: dec!(1.123725),
        absolute_volatility: dec!(0.00055),
        percentage_volatility_open: dec!(0.0489563398460100583025501803),
        percentage_volatility_low: dec!(0.0489563398460100583025501803),
        number_of_changes: 1,
        max_delay: dec!(1),
        min_delay: dec!(1),
        average_delay: dec!(1),
        volume_start: 1000,
        volume_stop: 2000,
        volume_delta: 1000,
        volume_percent_change: dec!(100),
        volume_average_per_minute: dec!(16.666666666666666666666666667),
    }
}

#[tokio::test]
async fn test_candle_store_roundtrip() {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let store = SqliteCandleStore::with_base_path(tmp_dir.path().join("candles"))
        .expect("Failed to create candle store");
    let fx = Instrument::new("EURUSD", Some("OANDA".into()));

    // 2. 写入
    let minute = Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap();
    let stored = store.save_candle(&fx, &sample_candle(minute)).await.unwrap();
    assert_eq!(stored.id, 1);

    // 验证物理路径
    assert!(tmp_dir.path().join("candles").join("EURUSD_OANDA.db").exists());

    // 3. 读取验证：十进制按 10 位小数截断
    let loaded = store
        .load_candles(&fx, minute, minute + TimeDelta::minutes(1))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    let candle = &loaded[0].candle;
    assert_eq!(candle.minute, minute);
    assert_eq!(candle.open_price, dec!(1.12345));
    assert_eq!(candle.average_value, dec!(1.123725));
    assert_eq!(candle.percentage_volatility_open, dec!(0.0489563398));
    assert_eq!(candle.volume_average_per_minute, dec!(16.6666666667));
    assert_eq!(candle.volume_delta, 1000);
    assert_eq!(candle.number_of_changes, 1);
    assert_eq!(loaded[0].id, stored.id);
}

#[tokio::test]
async fn test_candle_store_range_and_latest() {
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let store = SqliteCandleStore::with_base_path(tmp_dir.path().to_path_buf()).unwrap();
    let fx = Instrument::new("EURUSD", Some("OANDA".into()));
    let other = Instrument::new("GBPUSD", None);

    let base = Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap();
    for i in 0..5 {
        store
            .save_candle(&fx, &sample_candle(base + TimeDelta::minutes(i)))
            .await
            .unwrap();
    }
    store.save_candle(&other, &sample_candle(base)).await.unwrap();

    // 区间查询为闭区间，按分钟升序
    let range = store
        .load_candles(&fx, base + TimeDelta::minutes(1), base + TimeDelta::minutes(3))
        .await
        .unwrap();
    let minutes: Vec<_> = range.iter().map(|s| s.candle.minute).collect();
    assert_eq!(
        minutes,
        vec![
            base + TimeDelta::minutes(1),
            base + TimeDelta::minutes(2),
            base + TimeDelta::minutes(3)
        ]
    );

    // 最近写入优先
    let latest = store.latest_candles(&fx, 2).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].candle.minute, base + TimeDelta::minutes(4));
    assert_eq!(latest[1].candle.minute, base + TimeDelta::minutes(3));

    // 不同标的落在不同的库文件中
    assert_eq!(store.latest_candles(&other, 10).await.unwrap().len(), 1);
    assert!(tmp_dir.path().join("GBPUSD_UNKNOWN.db").exists());
}
