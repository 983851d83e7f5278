//! 规则引擎示例服务
//!
//! 注册快递员示例函数，加载规则后执行一轮评估。

use anyhow::{Context, Result};
use rule_engine::{
    ActionCall, ActionRef, Condition, ConditionGroup, FunctionRegistry, Operator, Rule, RuleEngine,
};
use rules_shared::config::AppConfig;
use rules_shared::observability;
use serde_json::{json, Value};
use tracing::info;

const SERVICE_NAME: &str = "rule-engine";

#[tokio::main]
async fn main() -> Result<()> {
    // 统一加载配置：config/default.toml → config/{env}.toml → config/rule-engine.toml → RULES_ 环境变量
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            ..Default::default()
        }
    });

    observability::init(&config.service_name, &config.observability)?;

    info!(environment = %config.environment, "Starting rule-engine...");

    let engine = RuleEngine::new(courier_functions()).with_config(config.engine.clone());

    match &config.engine.rules_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("读取规则文件失败: {}", path))?;
            let count = engine
                .store()
                .load_batch_from_json(&json)
                .with_context(|| format!("解析规则文件失败: {}", path))?;
            info!(path = %path, count, "Loaded rules from file");
        }
        None => {
            for rule in demo_rules() {
                engine.add_rule(rule);
            }
            info!(count = engine.store().len(), "Loaded built-in demo rules");
        }
    }

    let summary = engine.obey().await;

    info!(
        total = summary.total,
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Rule pass finished"
    );
    Ok(())
}

/// 示例函数注册表
fn courier_functions() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry
        .register_async("getCourier", get_courier)
        .register_async("logCourierInfo", log_courier_info);
    registry
}

/// 前置动作：查询快递员信息
async fn get_courier(call: ActionCall) -> Result<Value> {
    let id = call.param("courierId").cloned().unwrap_or(Value::Null);

    Ok(json!({
        "id": id,
        "status": 200,
        "vehicle": "Bike",
        "courierInfo": {
            "name": "John Doe",
            "warehouse": "Izmir"
        }
    }))
}

/// 后置动作：输出快递员状态与规则参数
async fn log_courier_info(call: ActionCall) -> Result<Value> {
    let output = json!({
        "courierInfo": {
            "status": call.fact("status"),
            "vehicle": call.fact("vehicle"),
        },
        "params": call.params,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(Value::Null)
}

/// 内置示例规则：一条会命中，一条条件不满足
fn demo_rules() -> Vec<Rule> {
    let before = ActionRef::with_params(
        "getCourier",
        json!({ "courierId": "6633d4699c759c778ab5b399" }),
    );
    let after = ActionRef::with_params(
        "logCourierInfo",
        json!({ "message": "Rule work with success!", "success": true }),
    );

    vec![
        Rule::new(
            before.clone(),
            ConditionGroup::both(
                vec![Condition::new("status", Operator::StrictEqual, 200).into()],
                vec![
                    Condition::new("vehicle", Operator::StrictEqual, "Bike").into(),
                    Condition::new("vehicle", Operator::StrictEqual, "Car").into(),
                ],
            ),
            after.clone(),
        )
        .with_name("courier-ok"),
        Rule::new(
            before,
            ConditionGroup::all(vec![
                Condition::new("status", Operator::StrictEqual, 400).into(),
            ]),
            after,
        )
        .with_name("courier-bad-request"),
    ]
}
