//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 封闭集合，未知的操作符在解析阶段即失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    // 相等比较（不做类型转换）
    #[serde(alias = "===")]
    StrictEqual,
    #[serde(alias = "!==")]
    NotEqual,

    // 顺序比较
    #[serde(alias = ">")]
    GreaterThan,
    #[serde(alias = ">=")]
    GreaterThanOrEqual,
    #[serde(alias = "<")]
    LessThan,
    #[serde(alias = "<=")]
    LessThanOrEqual,
}

impl Operator {
    /// 是否为顺序比较操作符
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::StrictEqual | Self::NotEqual)
    }

    /// 序列化使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrictEqual => "STRICT_EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StrictEqual => "===",
            Self::NotEqual => "!==",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
        };
        write!(f, "{}", s)
    }
}
