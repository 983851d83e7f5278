//! 函数注册表
//!
//! 按名字保存调用方提供的动作。引擎只持有只读引用，执行时按名解析，
//! 解析失败以 `RuleError::FunctionNotFound` 返回而不是 panic。

use crate::error::{Result, RuleError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// 一次动作调用的输入
///
/// 前置动作只收到 `params`；后置动作还会收到前置动作的返回值 `facts`。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCall {
    pub facts: Option<Value>,
    pub params: Option<Value>,
}

impl ActionCall {
    pub fn before(params: Option<Value>) -> Self {
        Self {
            facts: None,
            params,
        }
    }

    pub fn after(facts: Value, params: Option<Value>) -> Self {
        Self {
            facts: Some(facts),
            params,
        }
    }

    /// 读取参数对象中的某个键
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_ref()?.get(key)
    }

    /// 读取前置结果中的某个键
    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.facts.as_ref()?.get(key)
    }
}

/// 可按名调用的动作
///
/// 前置动作返回事实集合；后置动作的返回值被引擎忽略。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Action: Send + Sync {
    async fn call(&self, call: ActionCall) -> anyhow::Result<Value>;
}

/// 同步闭包适配器
pub struct FnAction<F>(F);

impl<F> FnAction<F>
where
    F: Fn(ActionCall) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(ActionCall) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    async fn call(&self, call: ActionCall) -> anyhow::Result<Value> {
        (self.0)(call)
    }
}

/// 异步闭包适配器
pub struct AsyncFnAction<F>(F);

impl<F, Fut> AsyncFnAction<F>
where
    F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Action for AsyncFnAction<F>
where
    F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, call: ActionCall) -> anyhow::Result<Value> {
        (self.0)(call).await
    }
}

/// 函数注册表
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册动作，同名动作会被替换
    pub fn register(&mut self, name: impl Into<String>, action: Arc<dyn Action>) -> &mut Self {
        let name = name.into();
        debug!(function = %name, "函数已注册");
        self.actions.insert(name, action);
        self
    }

    /// 注册同步闭包
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(ActionCall) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnAction::new(f)))
    }

    /// 注册异步闭包
    pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(name, Arc::new(AsyncFnAction::new(f)))
    }

    /// 按名解析动作
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::FunctionNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// 已注册的函数名（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
