//! 工具注册表
//!
//! 所有可执行工具实现 Tool trait（name / description / execute），按名注册到 ToolSet，
//! 注册时给出安全分级（safe / sensitive）。委派与离开（CompleteOrEscalate）是只参与路由的控制信号，
//! 没有可执行体。引擎只依赖 ToolRegistry 能力接口：classify + execute。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::HandlerId;

/// 离开信号的惯用名称：当前专门助手完成或升级回上一级
pub const COMPLETE_OR_ESCALATE: &str = "CompleteOrEscalate";

/// 工具分级
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolClass {
    /// 直接执行
    Safe,
    /// 执行前需要人工审批
    Sensitive,
    /// 把对话所有权交给指定助手
    Delegation { handler: HandlerId },
    /// 当前助手完成/升级，弹出委派栈
    Leave,
}

impl ToolClass {
    /// 委派或离开：只影响路由，不执行
    pub fn is_control(&self) -> bool {
        matches!(self, ToolClass::Delegation { .. } | ToolClass::Leave)
    }
}

/// 工具 trait：名称、描述（供推理端理解）、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 引擎消费的注册表能力接口
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// 未注册的工具返回 None
    fn classify(&self, tool_name: &str) -> Option<ToolClass>;

    async fn execute(&self, tool_name: &str, args: Value) -> Result<String, String>;
}

struct Entry {
    class: ToolClass,
    tool: Option<Arc<dyn Tool>>,
    description: String,
}

/// 内存工具集：按名称存储工具与分级
#[derive(Default)]
pub struct ToolSet {
    entries: HashMap<String, Entry>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_tool(&mut self, tool: impl Tool + 'static, class: ToolClass) {
        let name = tool.name().to_string();
        let description = tool.description().to_string();
        self.entries.insert(
            name,
            Entry {
                class,
                tool: Some(Arc::new(tool)),
                description,
            },
        );
    }

    /// 注册可直接执行的工具
    pub fn register_safe(&mut self, tool: impl Tool + 'static) -> &mut Self {
        self.insert_tool(tool, ToolClass::Safe);
        self
    }

    /// 注册需审批的工具
    pub fn register_sensitive(&mut self, tool: impl Tool + 'static) -> &mut Self {
        self.insert_tool(tool, ToolClass::Sensitive);
        self
    }

    /// 注册委派信号：调用 name 即把对话交给 handler
    pub fn register_delegation(
        &mut self,
        name: impl Into<String>,
        handler: impl Into<HandlerId>,
        description: impl Into<String>,
    ) -> &mut Self {
        self.entries.insert(
            name.into(),
            Entry {
                class: ToolClass::Delegation {
                    handler: handler.into(),
                },
                tool: None,
                description: description.into(),
            },
        );
        self
    }

    /// 注册离开信号（通常是 COMPLETE_OR_ESCALATE）
    pub fn register_leave(&mut self, name: impl Into<String>) -> &mut Self {
        self.entries.insert(
            name.into(),
            Entry {
                class: ToolClass::Leave,
                tool: None,
                description: "Mark the current task as completed or escalate control to the main assistant.".to_string(),
            },
        );
        self
    }

    /// 按名称排序的 (name, description) 列表，供推理端或控制台展示可用工具
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        let mut tools: Vec<(String, String)> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.description.clone()))
            .collect();
        tools.sort();
        tools
    }
}

#[async_trait]
impl ToolRegistry for ToolSet {
    fn classify(&self, tool_name: &str) -> Option<ToolClass> {
        self.entries.get(tool_name).map(|e| e.class.clone())
    }

    async fn execute(&self, tool_name: &str, args: Value) -> Result<String, String> {
        let entry = self
            .entries
            .get(tool_name)
            .ok_or_else(|| format!("Unknown tool: {tool_name}"))?;
        let tool = entry
            .tool
            .as_ref()
            .ok_or_else(|| format!("{tool_name} is a routing signal and cannot be executed"))?;
        tool.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    fn tool_set() -> ToolSet {
        let mut set = ToolSet::new();
        set.register_safe(EchoTool::new())
            .register_sensitive(EchoTool::named("cancel_ticket"))
            .register_delegation("ToBookingAssistant", "booking", "Hand off to booking")
            .register_leave(COMPLETE_OR_ESCALATE);
        set
    }

    #[test]
    fn test_classify() {
        let set = tool_set();
        assert_eq!(set.classify("echo"), Some(ToolClass::Safe));
        assert_eq!(set.classify("cancel_ticket"), Some(ToolClass::Sensitive));
        assert_eq!(
            set.classify("ToBookingAssistant"),
            Some(ToolClass::Delegation { handler: "booking".into() })
        );
        assert_eq!(set.classify(COMPLETE_OR_ESCALATE), Some(ToolClass::Leave));
        assert_eq!(set.classify("nope"), None);
    }

    #[tokio::test]
    async fn test_execute_rejects_unknown_and_control_tools() {
        let set = tool_set();
        assert_eq!(
            set.execute("echo", serde_json::json!({"text": "hi"})).await,
            Ok("hi".to_string())
        );
        assert!(set.execute("nope", Value::Null).await.is_err());
        assert!(set.execute(COMPLETE_OR_ESCALATE, Value::Null).await.is_err());
    }

    #[test]
    fn test_descriptions_list_every_entry() {
        let set = tool_set();
        let tools = set.tool_descriptions();
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0].0, COMPLETE_OR_ESCALATE);
        assert!(tools.iter().any(|(name, desc)| name == "ToBookingAssistant" && desc == "Hand off to booking"));
    }
}
