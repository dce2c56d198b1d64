use crate::error::ConfigError;
use crate::service::matcher::MAX_ENUMERABLE_INVOICES;
use bigdecimal::{BigDecimal, Zero};
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// 默认匹配容差 (0.01 货币单位)
pub const DEFAULT_TOLERANCE: &str = "0.01";
/// 默认返回的匹配组合数量上限
pub const DEFAULT_MAX_RESULTS: usize = 5;
/// 默认组合搜索的发票数量上限
pub const DEFAULT_MAX_INVOICES: usize = 20;
/// 默认搜索超时 (毫秒)
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 5_000;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 匹配引擎配置 (原始值，经 `settings()` 校验后使用)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub tolerance: String,
    pub max_results: usize,
    pub max_invoices: usize,
    pub oversize_policy: OversizePolicy,
    /// 0 表示不设超时
    pub search_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// 发票数量超过搜索上限时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizePolicy {
    /// 直接拒绝整个计算
    Reject,
    /// 跳过组合搜索，只返回顺序分配结果
    AllocatorOnly,
    /// 照常搜索，依赖超时兜底
    RunAnyway,
}

/// 校验后的匹配参数
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub tolerance: BigDecimal,
    pub max_results: usize,
    pub max_invoices: usize,
    pub oversize_policy: OversizePolicy,
    pub search_timeout: Option<Duration>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            tolerance: BigDecimal::new(1i32.into(), 2),
            max_results: DEFAULT_MAX_RESULTS,
            max_invoices: DEFAULT_MAX_INVOICES,
            oversize_policy: OversizePolicy::Reject,
            search_timeout: Some(Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS)),
        }
    }
}

impl AppConfig {
    /// 加载配置: 内置默认值 -> config/reconcile.* (可选) -> RECONCILE__* 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::defaults()?
            .add_source(File::with_name("config/reconcile").required(false))
            .add_source(
                Environment::with_prefix("RECONCILE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// 从 TOML 文本加载 (未出现的键使用默认值)
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings = Self::defaults()?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080i64)?
            .set_default("matching.tolerance", DEFAULT_TOLERANCE)?
            .set_default("matching.max_results", DEFAULT_MAX_RESULTS as i64)?
            .set_default("matching.max_invoices", DEFAULT_MAX_INVOICES as i64)?
            .set_default("matching.oversize_policy", "reject")?
            .set_default("matching.search_timeout_ms", DEFAULT_SEARCH_TIMEOUT_MS as i64)?
            .set_default("logging.level", "info")?)
    }
}

impl MatchingConfig {
    /// 校验并转换为匹配参数; 发票上限不超过子集掩码可表示的范围
    pub fn settings(&self) -> Result<MatchSettings, ConfigError> {
        let tolerance = BigDecimal::from_str(self.tolerance.trim())
            .map_err(|_| ConfigError::InvalidTolerance(self.tolerance.clone()))?;
        if tolerance < BigDecimal::zero() {
            return Err(ConfigError::InvalidTolerance(self.tolerance.clone()));
        }
        if self.max_results == 0 {
            return Err(ConfigError::InvalidMaxResults);
        }

        let search_timeout = match self.search_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(MatchSettings {
            tolerance,
            max_results: self.max_results,
            max_invoices: self.max_invoices.min(MAX_ENUMERABLE_INVOICES),
            oversize_policy: self.oversize_policy,
            search_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_source_is_empty() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");

        let settings = config.matching.settings().unwrap();
        assert_eq!(settings.tolerance, BigDecimal::from_str("0.01").unwrap());
        assert_eq!(settings.max_results, 5);
        assert_eq!(settings.max_invoices, 20);
        assert_eq!(settings.oversize_policy, OversizePolicy::Reject);
        assert_eq!(settings.search_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn overrides_are_read_from_toml() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000

            [matching]
            max_invoices = 12
            oversize_policy = "allocator_only"
            search_timeout_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        let settings = config.matching.settings().unwrap();
        assert_eq!(settings.max_invoices, 12);
        assert_eq!(settings.oversize_policy, OversizePolicy::AllocatorOnly);
        assert_eq!(settings.search_timeout, None);
    }

    #[test]
    fn invoice_limit_is_clamped_to_mask_width() {
        let config = AppConfig::from_toml("[matching]\nmax_invoices = 500").unwrap();
        let settings = config.matching.settings().unwrap();
        assert_eq!(settings.max_invoices, MAX_ENUMERABLE_INVOICES);
    }

    #[test]
    fn rejects_bad_matching_values() {
        let config = AppConfig::from_toml("[matching]\ntolerance = \"-0.5\"").unwrap();
        assert!(matches!(
            config.matching.settings(),
            Err(ConfigError::InvalidTolerance(_))
        ));

        let config = AppConfig::from_toml("[matching]\nmax_results = 0").unwrap();
        assert!(matches!(
            config.matching.settings(),
            Err(ConfigError::InvalidMaxResults)
        ));
    }
}
