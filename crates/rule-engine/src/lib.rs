//! 声明式规则执行引擎
//!
//! 调用方注册规则，每条规则包含：
//! - 前置动作：按名解析并调用，返回事实集合
//! - 条件树：AND/OR 组合的比较条件，在事实集合上求值
//! - 后置动作：仅在条件树成立时调用，接收前置结果与自身参数
//!
//! 动作由调用方通过 [`FunctionRegistry`] 按名提供，引擎只负责调度与失败隔离。

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod operators;
pub mod registry;
pub mod reporter;
pub mod store;

pub use engine::{CycleOutcome, ObeySummary, RuleEngine};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use models::{ActionRef, Condition, ConditionGroup, ConditionNode, Facts, Rule};
pub use operators::Operator;
pub use registry::{Action, ActionCall, AsyncFnAction, FnAction, FunctionRegistry};
pub use reporter::{
    CycleStage, Diagnostic, DiagnosticReporter, MemoryReporter, ReportedDiagnostic,
    TracingReporter,
};
pub use store::{RuleStore, RuleStoreStats};
