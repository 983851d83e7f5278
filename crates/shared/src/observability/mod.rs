//! 统一可观测性模块
//!
//! 所有二进制通过单一入口点初始化日志，确保一致的日志格式和过滤规则。
//! 指标通过 `metrics` 门面上报，未安装 recorder 时为空操作。

pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// # Example
///
/// ```ignore
/// use rules_shared::config::AppConfig;
/// use rules_shared::observability;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("rule-engine")?;
///     observability::init(&config.service_name, &config.observability)?;
///     Ok(())
/// }
/// ```
pub fn init(service_name: &str, config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;

    info!(
        service = %service_name,
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Observability initialized"
    );

    Ok(())
}
