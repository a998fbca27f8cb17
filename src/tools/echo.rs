//! Echo 工具（演示与测试用），名称可配置，便于模拟任意领域工具

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::Tool;

/// Echo 工具：回显 args.text；无 text 时回显整个参数
pub struct EchoTool {
    name: String,
}

impl EchoTool {
    pub fn new() -> Self {
        Self::named("echo")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echo text (for testing). Args: {\"text\": \"message\"}"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        match args.get("text").and_then(|v| v.as_str()) {
            Some(text) => Ok(text.to_string()),
            None => Ok(format!("{} executed with {}", self.name, args)),
        }
    }
}
