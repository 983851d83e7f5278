//! 规则存储管理
//!
//! 只追加、保持插入顺序的规则列表。允许重复规则，不做唯一性校验。
//! 内部使用 `parking_lot::RwLock`，clone 共享同一份存储。

use crate::error::Result;
use crate::models::Rule;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, instrument};

/// 规则存储
#[derive(Clone, Default)]
pub struct RuleStore {
    rules: Arc<RwLock<Vec<Arc<Rule>>>>,
}

impl RuleStore {
    /// 创建新的规则存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// 追加规则
    #[instrument(skip(self, rule), fields(before = %rule.before.func, after = %rule.after.func))]
    pub fn add(&self, rule: Rule) {
        self.push(rule);
    }

    /// 加载规则（从 JSON 字符串），返回规则下标
    #[instrument(skip(self, json))]
    pub fn load_from_json(&self, json: &str) -> Result<usize> {
        let rule: Rule = serde_json::from_str(json)?;
        Ok(self.push(rule))
    }

    fn push(&self, rule: Rule) -> usize {
        let index = {
            let mut rules = self.rules.write();
            rules.push(Arc::new(rule));
            rules.len() - 1
        };

        info!(rule_index = index, "规则已加载");
        index
    }

    /// 批量加载规则（JSON 数组）
    ///
    /// 整个数组解析成功后才会写入，解析失败时存储保持不变。
    #[instrument(skip(self, json))]
    pub fn load_batch_from_json(&self, json: &str) -> Result<usize> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;
        let count = rules.len();

        self.rules.write().extend(rules.into_iter().map(Arc::new));

        info!("批量加载完成: {} 条规则", count);
        Ok(count)
    }

    /// 按下标获取规则
    pub fn get(&self, index: usize) -> Option<Arc<Rule>> {
        self.rules.read().get(index).cloned()
    }

    /// 获取所有规则（插入顺序的快照）
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.rules.read().clone()
    }

    /// 获取规则统计信息
    pub fn stats(&self) -> RuleStoreStats {
        let rules = self.rules.read();
        let rules_count = rules.len();
        let total_facts: usize = rules.iter().map(|r| r.referenced_facts().len()).sum();

        RuleStoreStats {
            rules_count,
            total_facts,
            avg_facts_per_rule: if rules_count > 0 {
                total_facts as f64 / rules_count as f64
            } else {
                0.0
            },
        }
    }
}

/// 规则存储统计信息
#[derive(Debug, Clone)]
pub struct RuleStoreStats {
    /// 规则总数
    pub rules_count: usize,
    /// 所有规则引用的事实总数（每条规则内去重）
    pub total_facts: usize,
    /// 平均每条规则引用的事实数
    pub avg_facts_per_rule: f64,
}
