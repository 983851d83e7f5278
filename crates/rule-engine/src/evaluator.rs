//! 条件评估器
//!
//! 纯函数：在事实集合上评估条件树，返回布尔结论。
//!
//! - `and` 列表：所有元素为真才为真，空列表恒为真
//! - `or` 列表：任一元素为真即为真，空列表恒为假
//! - 两者都缺省的组恒为真；两者都存在时结论取与

use crate::error::{Result, RuleError};
use crate::models::{Condition, ConditionGroup, ConditionNode, Facts};
use crate::operators::Operator;
use serde_json::Value;
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件组
    pub fn evaluate(group: &ConditionGroup, facts: &Facts) -> Result<bool> {
        let and_verdict = match &group.and {
            Some(children) => Some(Self::all(children, facts)?),
            None => None,
        };

        // AND 已为假时整组为假，无需再看 OR
        if and_verdict == Some(false) {
            return Ok(false);
        }

        let or_verdict = match &group.or {
            Some(children) => Some(Self::any(children, facts)?),
            None => None,
        };

        Ok(match (and_verdict, or_verdict) {
            (None, None) => true,
            (Some(a), None) => a,
            (None, Some(o)) => o,
            (Some(a), Some(o)) => a && o,
        })
    }

    /// 评估条件树中的单个元素
    pub fn evaluate_node(node: &ConditionNode, facts: &Facts) -> Result<bool> {
        match node {
            ConditionNode::Condition(cond) => Self::evaluate_condition(cond, facts),
            ConditionNode::Group(group) => Self::evaluate(group, facts),
        }
    }

    /// 评估单个条件
    pub fn evaluate_condition(cond: &Condition, facts: &Facts) -> Result<bool> {
        Self::compare(facts.get(&cond.fact), cond.operator, cond.value.as_ref())
    }

    /// 用操作符比较事实值与期望值
    ///
    /// `None` 表示未定义：事实不存在，或条件没有字面量。两个未定义的值严格相等，
    /// 顺序比较中任一侧未定义即为假。
    ///
    /// # Arguments
    /// * `fact_value` - 从事实集合中取得的值
    /// * `operator` - 操作符
    /// * `expected_value` - 条件中的字面量
    pub fn compare(
        fact_value: Option<&Value>,
        operator: Operator,
        expected_value: Option<&Value>,
    ) -> Result<bool> {
        if operator.is_ordering() {
            if let Some(expected) = expected_value {
                Self::ensure_orderable(operator, expected)?;
            }
        }

        let matched = match operator {
            Operator::StrictEqual => Self::strict_eq(fact_value, expected_value),
            Operator::NotEqual => !Self::strict_eq(fact_value, expected_value),
            Operator::GreaterThan => {
                Self::order(fact_value, expected_value).is_some_and(|o| o == Ordering::Greater)
            }
            Operator::GreaterThanOrEqual => {
                Self::order(fact_value, expected_value).is_some_and(|o| o != Ordering::Less)
            }
            Operator::LessThan => {
                Self::order(fact_value, expected_value).is_some_and(|o| o == Ordering::Less)
            }
            Operator::LessThanOrEqual => {
                Self::order(fact_value, expected_value).is_some_and(|o| o != Ordering::Greater)
            }
        };

        Ok(matched)
    }

    /// AND：遇到 false 立即返回
    fn all(children: &[ConditionNode], facts: &Facts) -> Result<bool> {
        for child in children {
            if !Self::evaluate_node(child, facts)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// OR：遇到 true 立即返回
    fn any(children: &[ConditionNode], facts: &Facts) -> Result<bool> {
        for child in children {
            if Self::evaluate_node(child, facts)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 严格相等：数值按数值比较（100 与 100.0 相等），其他类型不做转换
    fn strict_eq(fact: Option<&Value>, expected: Option<&Value>) -> bool {
        match (fact, expected) {
            (None, None) => true,
            (Some(Value::Number(a)), Some(Value::Number(b))) => a == b || a.as_f64() == b.as_f64(),
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// 顺序比较：仅数值与数值、字符串与字符串可比，其余组合不可比
    fn order(fact: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
        match (fact?, expected?) {
            (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// 顺序操作符的字面量必须是数值或字符串，否则条件本身有误
    fn ensure_orderable(operator: Operator, expected: &Value) -> Result<()> {
        match expected {
            Value::Number(_) | Value::String(_) => Ok(()),
            other => Err(RuleError::InvalidOperand {
                operator: operator.as_str().to_string(),
                value_type: Self::type_name(other).to_string(),
            }),
        }
    }

    /// 获取值的类型名称
    fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}
