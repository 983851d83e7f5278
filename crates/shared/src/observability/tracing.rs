//! 日志订阅器初始化
//!
//! 基于 tracing-subscriber 构建 EnvFilter + fmt 层，支持 JSON 与 pretty 两种输出。

use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;

/// 构建环境过滤器，RUST_LOG 优先于配置中的 log_level
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局日志订阅器
///
/// 重复初始化会返回错误，由调用方决定是否忽略。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = if config.json_logs() {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
