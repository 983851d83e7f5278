//! 诊断上报
//!
//! 规则周期内的失败不会向调用方抛出，只通过注入的 `DiagnosticReporter` 上报。
//! 默认实现写入 tracing；`MemoryReporter` 在内存中收集，便于测试和嵌入方读取。

use crate::error::RuleError;
use parking_lot::Mutex;
use std::fmt;
use tracing::error;

/// 失败发生在规则周期的哪个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStage {
    Before,
    Conditions,
    After,
}

impl CycleStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Conditions => "conditions",
            Self::After => "after",
        }
    }
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条诊断记录
///
/// `Display` 只输出错误本身的文案。
#[derive(Debug)]
pub struct Diagnostic {
    pub rule_index: usize,
    pub rule_name: Option<String>,
    pub stage: CycleStage,
    pub error: RuleError,
}

impl Diagnostic {
    pub fn new(
        rule_index: usize,
        rule_name: Option<String>,
        stage: CycleStage,
        error: RuleError,
    ) -> Self {
        Self {
            rule_index,
            rule_name,
            stage,
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// 诊断通道
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticReporter: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// 写入 tracing 的诊断通道（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl DiagnosticReporter for TracingReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        error!(
            rule_index = diagnostic.rule_index,
            rule_name = diagnostic.rule_name.as_deref().unwrap_or(""),
            stage = %diagnostic.stage,
            "{}",
            diagnostic
        );
    }
}

/// 内存诊断通道
#[derive(Debug, Default)]
pub struct MemoryReporter {
    diagnostics: Mutex<Vec<ReportedDiagnostic>>,
}

/// `MemoryReporter` 保存的诊断快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedDiagnostic {
    pub rule_index: usize,
    pub rule_name: Option<String>,
    pub stage: CycleStage,
    pub message: String,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按上报顺序返回全部诊断
    pub fn diagnostics(&self) -> Vec<ReportedDiagnostic> {
        self.diagnostics.lock().clone()
    }

    /// 按上报顺序返回全部诊断文案
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticReporter for MemoryReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        self.diagnostics.lock().push(ReportedDiagnostic {
            rule_index: diagnostic.rule_index,
            rule_name: diagnostic.rule_name.clone(),
            stage: diagnostic.stage,
            message: diagnostic.to_string(),
        });
    }
}
