//! 规则引擎领域模型

use crate::operators::Operator;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// 规则定义：前置动作 → 条件树 → 后置动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// 仅用于日志和诊断
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub before: ActionRef,
    #[serde(default)]
    pub conditions: ConditionGroup,
    pub after: ActionRef,
}

impl Rule {
    pub fn new(
        before: impl Into<ActionRef>,
        conditions: ConditionGroup,
        after: impl Into<ActionRef>,
    ) -> Self {
        Self {
            name: None,
            before: before.into(),
            conditions,
            after: after.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 条件树中引用的全部事实名（去重）
    pub fn referenced_facts(&self) -> BTreeSet<&str> {
        let mut facts = BTreeSet::new();
        self.conditions.collect_facts(&mut facts);
        facts
    }
}

/// 动作引用：函数名 + 可选参数
///
/// 反序列化时同时接受 `"name"` 与 `{ "func": "name", "params": ... }` 两种写法。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionRefRepr")]
pub struct ActionRef {
    pub func: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ActionRef {
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            params: None,
        }
    }

    pub fn with_params(func: impl Into<String>, params: Value) -> Self {
        Self {
            func: func.into(),
            params: Some(params),
        }
    }
}

impl From<&str> for ActionRef {
    fn from(func: &str) -> Self {
        Self::new(func)
    }
}

impl From<String> for ActionRef {
    fn from(func: String) -> Self {
        Self::new(func)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionRefRepr {
    Name(String),
    Full {
        func: String,
        #[serde(default)]
        params: Option<Value>,
    },
}

impl From<ActionRefRepr> for ActionRef {
    fn from(repr: ActionRefRepr) -> Self {
        match repr {
            ActionRefRepr::Name(func) => Self::new(func),
            ActionRefRepr::Full { func, params } => Self { func, params },
        }
    }
}

/// 条件组节点
///
/// `and` 与 `or` 均缺省时恒为真；同时存在时两者结论取与。
/// 拒绝未知字段，避免写错的条件被当作空组静默放行。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<ConditionNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<ConditionNode>>,
}

impl ConditionGroup {
    /// 无任何条件的组（恒为真）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all(children: Vec<ConditionNode>) -> Self {
        Self {
            and: Some(children),
            or: None,
        }
    }

    pub fn any(children: Vec<ConditionNode>) -> Self {
        Self {
            and: None,
            or: Some(children),
        }
    }

    pub fn both(and: Vec<ConditionNode>, or: Vec<ConditionNode>) -> Self {
        Self {
            and: Some(and),
            or: Some(or),
        }
    }

    fn collect_facts<'a>(&'a self, facts: &mut BTreeSet<&'a str>) {
        let children = self.and.iter().chain(self.or.iter()).flatten();
        for child in children {
            match child {
                ConditionNode::Condition(cond) => {
                    facts.insert(cond.fact.as_str());
                }
                ConditionNode::Group(group) => group.collect_facts(facts),
            }
        }
    }
}

/// 条件树中的单个元素：叶子条件或嵌套条件组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

impl From<Condition> for ConditionNode {
    fn from(cond: Condition) -> Self {
        Self::Condition(cond)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        Self::Group(group)
    }
}

/// 条件节点
///
/// `value` 缺省与显式的 `null` 不同：缺省表示"未定义"，
/// 只与不存在的事实严格相等。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub fact: String,
    pub operator: Operator,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(fact: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            fact: fact.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// 不带字面量的条件
    pub fn undefined(fact: impl Into<String>, operator: Operator) -> Self {
        Self {
            fact: fact.into(),
            operator,
            value: None,
        }
    }
}

/// 字段出现即为 `Some`，包括 `null`
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// 事实集合：前置动作的返回值
///
/// 每个规则周期独立构造，不在规则之间共享。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    data: Value,
}

impl Facts {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 按顶层键获取事实值
    ///
    /// 名字按字面匹配，`"a.b"` 不会进入嵌套对象。
    pub fn get(&self, name: &str) -> Option<&Value> {
        match &self.data {
            Value::Object(map) => map.get(name),
            _ => None,
        }
    }

    /// 获取底层数据
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_inner(self) -> Value {
        self.data
    }
}

impl From<Value> for Facts {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_deserialization() {
        let json = r#"
        {
            "before": { "func": "getCourier", "params": { "courierId": "6633d4699c759c778ab5b399" } },
            "conditions": {
                "and": [
                    { "fact": "status", "operator": "STRICT_EQUAL", "value": 200 }
                ],
                "or": [
                    { "fact": "vehicle", "operator": "STRICT_EQUAL", "value": "Bike" },
                    { "fact": "vehicle", "operator": "STRICT_EQUAL", "value": "Car" }
                ]
            },
            "after": { "func": "logCourierInfo", "params": { "success": true } }
        }
        "#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.before.func, "getCourier");
        assert_eq!(
            rule.before.params,
            Some(json!({ "courierId": "6633d4699c759c778ab5b399" }))
        );
        assert_eq!(rule.conditions.and.as_ref().unwrap().len(), 1);
        assert_eq!(rule.conditions.or.as_ref().unwrap().len(), 2);
        assert_eq!(rule.after.func, "logCourierInfo");
        assert!(rule.name.is_none());
    }

    #[test]
    fn test_bare_string_action_ref() {
        let json = r#"{ "before": "beforeFunction", "conditions": { "and": [] }, "after": "afterFunction" }"#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.before, ActionRef::new("beforeFunction"));
        assert_eq!(rule.after, ActionRef::new("afterFunction"));
        assert_eq!(rule.conditions, ConditionGroup::all(vec![]));
    }

    #[test]
    fn test_nested_group_deserialization() {
        let json = r#"
        {
            "and": [
                { "fact": "status", "operator": ">=", "value": 200 },
                { "or": [
                    { "fact": "vehicle", "operator": "===", "value": "Bike" },
                    { "fact": "vehicle", "operator": "===", "value": "Car" }
                ] }
            ]
        }
        "#;

        let group: ConditionGroup = serde_json::from_str(json).unwrap();
        let children = group.and.unwrap();
        assert!(matches!(children[0], ConditionNode::Condition(_)));
        match &children[1] {
            ConditionNode::Group(inner) => assert_eq!(inner.or.as_ref().unwrap().len(), 2),
            other => panic!("expected nested group, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_condition_is_rejected() {
        // 未知操作符既不是合法条件，也不是合法条件组
        let json = r#"{ "and": [ { "fact": "v", "operator": "BETWEEN", "value": 1 } ] }"#;
        assert!(serde_json::from_str::<ConditionGroup>(json).is_err());

        let json = r#"{ "all": [] }"#;
        assert!(serde_json::from_str::<ConditionGroup>(json).is_err());
    }

    #[test]
    fn test_rule_serialization_skips_absent_keys() {
        let rule = Rule::new(
            "f",
            ConditionGroup::any(vec![
                Condition::new("v", Operator::GreaterThan, 5).into(),
            ]),
            ActionRef::with_params("g", json!({ "message": "ok" })),
        );

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "before": { "func": "f" },
                "conditions": { "or": [ { "fact": "v", "operator": "GREATER_THAN", "value": 5 } ] },
                "after": { "func": "g", "params": { "message": "ok" } }
            })
        );

        let parsed: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_referenced_facts() {
        let rule = Rule::new(
            "f",
            ConditionGroup::both(
                vec![Condition::new("status", Operator::StrictEqual, 200).into()],
                vec![
                    Condition::new("vehicle", Operator::StrictEqual, "Bike").into(),
                    ConditionGroup::all(vec![
                        Condition::new("vehicle", Operator::StrictEqual, "Car").into(),
                        Condition::new("warehouse", Operator::StrictEqual, "Izmir").into(),
                    ])
                    .into(),
                ],
            ),
            "g",
        );

        let facts: Vec<_> = rule.referenced_facts().into_iter().collect();
        assert_eq!(facts, vec!["status", "vehicle", "warehouse"]);
    }

    #[test]
    fn test_facts_lookup() {
        let facts = Facts::new(json!({
            "status": 200,
            "vehicle": "Bike",
            "courierInfo": {
                "name": "John Doe",
                "warehouse": "Izmir"
            },
            "items": [ { "sku": "A-1" } ],
            "a.b": "literal key"
        }));

        assert_eq!(facts.get("status"), Some(&json!(200)));
        assert_eq!(
            facts.get("courierInfo"),
            Some(&json!({ "name": "John Doe", "warehouse": "Izmir" }))
        );
        assert_eq!(facts.get("a.b"), Some(&json!("literal key")));
        assert_eq!(facts.get("nonexistent"), None);
    }

    #[test]
    fn test_facts_lookup_does_not_follow_paths() {
        let facts = Facts::new(json!({
            "a": { "b": 1 },
            "items": [ { "sku": "A-1" } ]
        }));

        assert_eq!(facts.get("a.b"), None);
        assert_eq!(facts.get("items.0.sku"), None);
        assert_eq!(facts.get("a"), Some(&json!({ "b": 1 })));
    }

    #[test]
    fn test_condition_value_absent_vs_null() {
        let cond: Condition =
            serde_json::from_str(r#"{ "fact": "missing", "operator": "STRICT_EQUAL" }"#).unwrap();
        assert_eq!(cond, Condition::undefined("missing", Operator::StrictEqual));

        let cond: Condition =
            serde_json::from_str(r#"{ "fact": "v", "operator": "STRICT_EQUAL", "value": null }"#)
                .unwrap();
        assert_eq!(cond.value, Some(Value::Null));

        let value = serde_json::to_value(Condition::undefined("v", Operator::NotEqual)).unwrap();
        assert_eq!(value, json!({ "fact": "v", "operator": "NOT_EQUAL" }));
    }

    #[test]
    fn test_non_object_facts_miss() {
        let facts = Facts::new(json!(42));
        assert_eq!(facts.get("status"), None);

        let facts = Facts::default();
        assert_eq!(facts.get("status"), None);
        assert_eq!(facts.into_inner(), Value::Null);
    }
}
