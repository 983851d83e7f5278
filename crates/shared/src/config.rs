//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 规则周期的调度方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// 所有规则周期同时推进，通过 join 等待全部结束
    #[default]
    Concurrent,
    /// 按插入顺序逐条执行
    Sequential,
}

/// 规则引擎配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub execution_mode: ExecutionMode,
    /// 单次动作调用的超时时间（毫秒），为空表示不限制
    pub action_timeout_ms: Option<u64>,
    /// 规则文件路径（JSON 数组），为空时使用内置示例规则
    pub rules_file: Option<String>,
}

impl EngineConfig {
    pub fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_ms.map(Duration::from_millis)
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（RULES_ 前缀，层级用双下划线，如 RULES_ENGINE__EXECUTION_MODE -> engine.execution_mode）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RULES_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(&config_dir, service_name, &env)
    }

    /// 从指定目录加载配置（不读取 RULES_ENV / CONFIG_DIR）
    pub fn load_from(config_dir: &str, service_name: &str, env: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(Path::new(config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            // 字段名本身含下划线，层级分隔符使用双下划线
            .add_source(
                Environment::with_prefix("RULES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
