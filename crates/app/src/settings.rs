use candela_core::config::AppConfig;
use config::{Config, ConfigError, Environment, File};

/// 配置文件路径的环境变量名
pub const CONFIG_PATH_ENV: &str = "CANDELA_CONFIG";
/// 未指定时的配置文件路径（不含扩展名）
pub const DEFAULT_CONFIG_PATH: &str = "config/candela";

/// 读取 `CANDELA_CONFIG` 指定的配置文件并叠加环境变量
pub fn load() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from(&path)
}

/// # Summary
/// 按优先级合并配置来源。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 作为底层。
/// 2. 叠加配置文件（可选，不存在时忽略）。
/// 3. 叠加 `CANDELA__SECTION__KEY` 形式的环境变量。
///
/// # Arguments
/// * `path`: 配置文件路径，扩展名可省略。
///
/// # Returns
/// 合并后的 AppConfig。
pub fn load_from(path: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("CANDELA")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
