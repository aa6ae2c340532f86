use async_trait::async_trait;
use candela_core::config::FeedConfig;
use candela_core::market::error::QuoteError;
use candela_core::market::port::QuoteSource;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// # Summary
/// 基于 HTTP JSON 快照的报价源实现。
///
/// # Invariants
/// - 使用同一个 `reqwest` 异步客户端完成所有轮询，不按周期重建。
/// - 价格与成交量通过 JSON Pointer 从同一快照接口中提取。
#[derive(Clone)]
pub struct HttpQuoteSource {
    /// 内部使用的 HTTP 客户端
    client: Client,
    url: String,
    price_pointer: String,
    volume_pointer: String,
}

impl HttpQuoteSource {
    /// # Summary
    /// 根据配置创建报价源。
    ///
    /// # Logic
    /// 1. 按配置设置超时与伪装浏览器 User-Agent。
    /// 2. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 报价源配置。
    ///
    /// # Returns
    /// 成功返回 HttpQuoteSource，客户端构建失败返回 QuoteError。
    pub fn new(config: &FeedConfig) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            price_pointer: config.price_pointer.clone(),
            volume_pointer: config.volume_pointer.clone(),
        })
    }

    /// # Summary
    /// 拉取一次快照并提取指定字段的文本。
    ///
    /// # Logic
    /// 1. 发起 GET 请求，非 2xx 视为网络错误。
    /// 2. 解析 JSON 响应体。
    /// 3. 按 JSON Pointer 取值并转换为文本。
    async fn fetch_field(&self, pointer: &str) -> Result<String, QuoteError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(QuoteError::Network(format!("HTTP {}", resp.status())));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| QuoteError::Malformed(e.to_string()))?;

        let text = extract(&body, pointer)?;
        debug!("Quote field {} = {}", pointer, text);
        Ok(text)
    }
}

/// 字符串原样返回，数字渲染为文本；缺失或 null 视为暂无数据。
fn extract(body: &Value, pointer: &str) -> Result<String, QuoteError> {
    match body.pointer(pointer) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Null) | None => Err(QuoteError::Unavailable(format!(
            "field {pointer} missing"
        ))),
        Some(other) => Err(QuoteError::Malformed(format!(
            "field {pointer} is not a scalar: {other}"
        ))),
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn price_text(&self) -> Result<String, QuoteError> {
        self.fetch_field(&self.price_pointer).await
    }

    async fn volume_text(&self) -> Result<String, QuoteError> {
        self.fetch_field(&self.volume_pointer).await
    }
}
