//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// 文案为对外约定的诊断格式，不可改动
    #[error("Function '{0}' not found or not a function.")]
    FunctionNotFound(String),

    #[error("函数 '{name}' 执行失败: {reason}")]
    ActionFailed { name: String, reason: String },

    #[error("函数 '{name}' 执行时发生 panic: {message}")]
    ActionPanicked { name: String, message: String },

    #[error("函数 '{name}' 执行超时 ({timeout_ms} ms)")]
    ActionTimeout { name: String, timeout_ms: u64 },

    #[error("无效的操作数: {operator} 不支持类型 {value_type}")]
    InvalidOperand {
        operator: String,
        value_type: String,
    },

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_not_found_message() {
        let err = RuleError::FunctionNotFound("nonExistentFunction".to_string());
        assert_eq!(
            err.to_string(),
            "Function 'nonExistentFunction' not found or not a function."
        );
    }
}
