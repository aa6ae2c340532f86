use async_trait::async_trait;
use candela_core::common::Instrument;
use candela_core::market::entity::{Candle, StoredCandle};
use candela_core::store::error::StoreError;
use candela_core::store::port::CandleStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// 十进制字段落库时保留的小数位数
const DECIMAL_PLACES: u32 = 10;

const SELECT_COLUMNS: &str = r#"
    id, created_at, minute, open_price, high_price, low_price, close_price, average_value,
    absolute_volatility, percentage_volatility_open, percentage_volatility_low,
    number_of_changes, max_delay, min_delay, average_delay,
    volume_start, volume_stop, volume_delta, volume_percent_change, volume_average_per_minute
"#;

/// CandleStore 的 SQLite 实现，采用“一库一标的”策略。
///
/// # Summary
/// 为每个标的维护一个独立的 SQLite 数据库文件，以实现物理数据隔离。
///
/// # Invariants
/// * 数据库文件存储在 `base_path` 目录下，文件名为 `<SYMBOL>_<EXCHANGE>.db`。
/// * 连接池被缓存以避免频繁的文件打开操作。
/// * 十进制数以 TEXT 存储，保留 10 位小数，避免浮点误差。
pub struct SqliteCandleStore {
    base_path: PathBuf,
    pools: DashMap<String, SqlitePool>,
}

impl SqliteCandleStore {
    /// 在全局数据根目录的 `candles` 子目录下创建存储实例。
    pub fn new() -> Result<Self, StoreError> {
        Self::with_base_path(crate::config::get_root_dir().join("candles"))
    }

    /// # Summary
    /// 在指定目录下创建存储实例。
    ///
    /// # Logic
    /// 1. 确保目录存在。
    /// 2. 初始化空的连接池缓存。
    ///
    /// # Arguments
    /// * `base_path` - 存放数据库文件的目录。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或错误。
    pub fn with_base_path(base_path: PathBuf) -> Result<Self, StoreError> {
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path).map_err(|e| StoreError::InitError(e.to_string()))?;
        }
        Ok(Self {
            base_path,
            pools: DashMap::new(),
        })
    }

    /// 标的对应的数据库文件路径
    pub fn db_path(&self, instrument: &Instrument) -> PathBuf {
        self.base_path.join(format!("{}.db", Self::key(instrument)))
    }

    fn key(instrument: &Instrument) -> String {
        let exchange = instrument.exchange.as_deref().unwrap_or("UNKNOWN");
        format!("{}_{}", instrument.symbol, exchange)
    }

    /// 获取或初始化特定标的的连接池。
    ///
    /// # Logic
    /// 1. 根据标的代码和交易商生成文件名。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing`。
    /// 3. 如果缓存中没有，则创建新连接池并运行初始化建表 SQL。
    async fn get_or_init_pool(&self, instrument: &Instrument) -> Result<SqlitePool, StoreError> {
        let key = Self::key(instrument);

        if let Some(pool) = self.pools.get(&key) {
            return Ok(pool.clone());
        }

        let options = SqliteConnectOptions::new()
            .filename(self.db_path(instrument))
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                minute DATETIME NOT NULL,
                open_price TEXT NOT NULL,
                high_price TEXT NOT NULL,
                low_price TEXT NOT NULL,
                close_price TEXT NOT NULL,
                average_value TEXT NOT NULL,
                absolute_volatility TEXT NOT NULL,
                percentage_volatility_open TEXT NOT NULL,
                percentage_volatility_low TEXT NOT NULL,
                number_of_changes INTEGER NOT NULL,
                max_delay TEXT NOT NULL,
                min_delay TEXT NOT NULL,
                average_delay TEXT NOT NULL,
                volume_start INTEGER NOT NULL,
                volume_stop INTEGER NOT NULL,
                volume_delta INTEGER NOT NULL,
                volume_percent_change TEXT NOT NULL,
                volume_average_per_minute TEXT NOT NULL,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_candles_minute ON candles (minute);
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        self.pools.insert(key, pool.clone());
        Ok(pool)
    }
}

/// 十进制数的落库文本
fn encode(value: Decimal) -> String {
    value.round_dp(DECIMAL_PLACES).normalize().to_string()
}

fn decode(row: &SqliteRow, column: &str) -> Result<Decimal, StoreError> {
    let text: String = row
        .try_get(column)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    Decimal::from_str(&text).map_err(|e| StoreError::Decode(format!("{column}: {e}")))
}

fn read_row(row: &SqliteRow) -> Result<StoredCandle, StoreError> {
    let get_err = |e: sqlx::Error| StoreError::Decode(e.to_string());

    Ok(StoredCandle {
        id: row.try_get("id").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        candle: Candle {
            minute: row.try_get("minute").map_err(get_err)?,
            open_price: decode(row, "open_price")?,
            high_price: decode(row, "high_price")?,
            low_price: decode(row, "low_price")?,
            close_price: decode(row, "close_price")?,
            average_value: decode(row, "average_value")?,
            absolute_volatility: decode(row, "absolute_volatility")?,
            percentage_volatility_open: decode(row, "percentage_volatility_open")?,
            percentage_volatility_low: decode(row, "percentage_volatility_low")?,
            number_of_changes: row.try_get("number_of_changes").map_err(get_err)?,
            max_delay: decode(row, "max_delay")?,
            min_delay: decode(row, "min_delay")?,
            average_delay: decode(row, "average_delay")?,
            volume_start: row.try_get("volume_start").map_err(get_err)?,
            volume_stop: row.try_get("volume_stop").map_err(get_err)?,
            volume_delta: row.try_get("volume_delta").map_err(get_err)?,
            volume_percent_change: decode(row, "volume_percent_change")?,
            volume_average_per_minute: decode(row, "volume_average_per_minute")?,
        },
    })
}

#[async_trait]
impl CandleStore for SqliteCandleStore {
    /// # Summary
    /// 在单个事务内写入一根 K 线。
    ///
    /// # Logic
    /// 1. 获取标的连接池并开启事务。
    /// 2. 将十进制字段按 10 位小数编码为文本后插入。
    /// 3. 提交事务，返回带自增 id 与写入时间的记录。
    async fn save_candle(
        &self,
        instrument: &Instrument,
        candle: &Candle,
    ) -> Result<StoredCandle, StoreError> {
        let pool = self.get_or_init_pool(instrument).await?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO candles (
                minute, open_price, high_price, low_price, close_price, average_value,
                absolute_volatility, percentage_volatility_open, percentage_volatility_low,
                number_of_changes, max_delay, min_delay, average_delay,
                volume_start, volume_stop, volume_delta, volume_percent_change, volume_average_per_minute,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(candle.minute)
        .bind(encode(candle.open_price))
        .bind(encode(candle.high_price))
        .bind(encode(candle.low_price))
        .bind(encode(candle.close_price))
        .bind(encode(candle.average_value))
        .bind(encode(candle.absolute_volatility))
        .bind(encode(candle.percentage_volatility_open))
        .bind(encode(candle.percentage_volatility_low))
        .bind(candle.number_of_changes)
        .bind(encode(candle.max_delay))
        .bind(encode(candle.min_delay))
        .bind(encode(candle.average_delay))
        .bind(candle.volume_start)
        .bind(candle.volume_stop)
        .bind(candle.volume_delta)
        .bind(encode(candle.volume_percent_change))
        .bind(encode(candle.volume_average_per_minute))
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        debug!("Stored candle #{} for {}", id, instrument);

        Ok(StoredCandle {
            id,
            created_at,
            candle: candle.clone(),
        })
    }

    /// # Summary
    /// 按分钟区间查询 `candles` 表，升序返回。
    async fn load_candles(
        &self,
        instrument: &Instrument,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredCandle>, StoreError> {
        let pool = self.get_or_init_pool(instrument).await?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM candles WHERE minute >= ? AND minute <= ? ORDER BY minute ASC, id ASC"
        );

        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(read_row).collect()
    }

    /// # Summary
    /// 返回最近写入的 `limit` 根 K 线，按 id 倒序。
    async fn latest_candles(
        &self,
        instrument: &Instrument,
        limit: usize,
    ) -> Result<Vec<StoredCandle>, StoreError> {
        let pool = self.get_or_init_pool(instrument).await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM candles ORDER BY id DESC LIMIT ?");

        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(read_row).collect()
    }
}
