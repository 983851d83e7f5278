//! 规则执行引擎
//!
//! 对每条规则独立执行一个周期：
//!
//! ```text
//! 解析前置动作 → 调用前置动作 → 评估条件树 → 解析后置动作 → 调用后置动作
//! ```
//!
//! 任一步失败都只终止该规则的周期并通过诊断通道上报，不影响同一轮中的其他规则。
//! 条件不满足不是错误，周期静默结束。

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{ActionRef, Facts, Rule};
use crate::registry::{Action, ActionCall, FunctionRegistry};
use crate::reporter::{CycleStage, Diagnostic, DiagnosticReporter, TracingReporter};
use crate::store::RuleStore;
use futures::FutureExt;
use futures::future::join_all;
use rules_shared::config::{EngineConfig, ExecutionMode};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// 单个规则周期的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 条件满足，后置动作已执行
    Completed,
    /// 条件不满足，后置动作未执行
    ConditionsNotMet,
    /// 解析或执行失败，已上报诊断
    Failed,
}

impl CycleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ConditionsNotMet => "conditions_not_met",
            Self::Failed => "failed",
        }
    }
}

/// 一轮评估的汇总计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObeySummary {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ObeySummary {
    fn record(&mut self, outcome: CycleOutcome) {
        self.total += 1;
        match outcome {
            CycleOutcome::Completed => self.completed += 1,
            CycleOutcome::ConditionsNotMet => self.skipped += 1,
            CycleOutcome::Failed => self.failed += 1,
        }
    }
}

/// 规则引擎
pub struct RuleEngine {
    registry: Arc<FunctionRegistry>,
    store: RuleStore,
    reporter: Arc<dyn DiagnosticReporter>,
    config: EngineConfig,
}

impl RuleEngine {
    /// 使用函数注册表创建引擎，诊断默认写入 tracing
    pub fn new(registry: impl Into<Arc<FunctionRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            store: RuleStore::new(),
            reporter: Arc::new(TracingReporter),
            config: EngineConfig::default(),
        }
    }

    /// 替换诊断通道
    pub fn with_reporter(mut self, reporter: Arc<dyn DiagnosticReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用外部规则存储（与调用方共享）
    pub fn with_store(mut self, store: RuleStore) -> Self {
        self.store = store;
        self
    }

    /// 注册规则
    pub fn add_rule(&self, rule: Rule) {
        self.store.add(rule);
    }

    /// 已注册的规则（插入顺序）
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.store.rules()
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 对当前全部规则执行一轮评估
    ///
    /// 开始时对规则列表取快照，本轮期间新增的规则留到下一轮。
    /// 规则周期的失败只进入诊断通道，本方法不会因此失败。
    #[instrument(skip(self), fields(rules = self.store.len(), mode = ?self.config.execution_mode))]
    pub async fn obey(&self) -> ObeySummary {
        let start = Instant::now();
        let rules = self.store.rules();

        let outcomes = match self.config.execution_mode {
            ExecutionMode::Concurrent => {
                let cycles = rules
                    .iter()
                    .enumerate()
                    .map(|(index, rule)| self.run_cycle(index, rule));
                join_all(cycles).await
            }
            ExecutionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(rules.len());
                for (index, rule) in rules.iter().enumerate() {
                    outcomes.push(self.run_cycle(index, rule).await);
                }
                outcomes
            }
        };

        let mut summary = ObeySummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }

        let elapsed = start.elapsed();
        metrics::histogram!("rule_obey_duration_seconds").record(elapsed.as_secs_f64());

        info!(
            total = summary.total,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "规则评估完成"
        );

        summary
    }

    /// 执行单条规则的周期并上报失败
    async fn run_cycle(&self, index: usize, rule: &Rule) -> CycleOutcome {
        let outcome = match self.try_cycle(rule).await {
            Ok(true) => CycleOutcome::Completed,
            Ok(false) => CycleOutcome::ConditionsNotMet,
            Err((stage, error)) => {
                self.reporter
                    .report(&Diagnostic::new(index, rule.name.clone(), stage, error));
                CycleOutcome::Failed
            }
        };

        metrics::counter!("rule_cycles_total", "outcome" => outcome.as_str()).increment(1);
        debug!(
            rule_index = index,
            rule_name = rule.name.as_deref().unwrap_or(""),
            outcome = outcome.as_str(),
            "规则周期结束"
        );

        outcome
    }

    /// 返回 `Ok(true)` 表示后置动作已执行，`Ok(false)` 表示条件不满足
    async fn try_cycle(&self, rule: &Rule) -> std::result::Result<bool, (CycleStage, RuleError)> {
        let before = self
            .registry
            .resolve(&rule.before.func)
            .map_err(at(CycleStage::Before))?;
        let result = self
            .invoke(
                &rule.before,
                before,
                ActionCall::before(rule.before.params.clone()),
                CycleStage::Before,
            )
            .await
            .map_err(at(CycleStage::Before))?;

        // 每个周期持有自己的事实集合
        let facts = Facts::new(result);
        let matched = ConditionEvaluator::evaluate(&rule.conditions, &facts)
            .map_err(at(CycleStage::Conditions))?;
        if !matched {
            return Ok(false);
        }

        let after = self
            .registry
            .resolve(&rule.after.func)
            .map_err(at(CycleStage::After))?;
        self.invoke(
            &rule.after,
            after,
            ActionCall::after(facts.into_inner(), rule.after.params.clone()),
            CycleStage::After,
        )
        .await
        .map_err(at(CycleStage::After))?;

        Ok(true)
    }

    /// 调用动作：捕获错误、panic 与超时
    async fn invoke(
        &self,
        action_ref: &ActionRef,
        action: Arc<dyn Action>,
        call: ActionCall,
        stage: CycleStage,
    ) -> Result<Value> {
        let name = action_ref.func.as_str();
        metrics::counter!("rule_action_invocations_total", "stage" => stage.as_str()).increment(1);
        debug!(function = %name, stage = %stage, "调用函数");

        // 调用放进 async 块，闭包同步阶段的 panic 也能被捕获
        let call_future = AssertUnwindSafe(async move { action.call(call).await }).catch_unwind();

        let outcome = match self.config.action_timeout_ms {
            Some(timeout_ms) => tokio::time::timeout(Duration::from_millis(timeout_ms), call_future)
                .await
                .map_err(|_| RuleError::ActionTimeout {
                    name: name.to_string(),
                    timeout_ms,
                })?,
            None => call_future.await,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RuleError::ActionFailed {
                name: name.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(payload) => Err(RuleError::ActionPanicked {
                name: name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn at(stage: CycleStage) -> impl FnOnce(RuleError) -> (CycleStage, RuleError) {
    move |error| (stage, error)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
