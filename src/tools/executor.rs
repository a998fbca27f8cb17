//! 工具执行器
//!
//! 持有 ToolRegistry 与单次调用超时；execute 在超时内调用 registry.execute，
//! 超时或失败转为 NodeFault（ToolTimeout / ToolFailed / UnknownTool），绝不中断整批；
//! 每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{NodeFault, RecoveryEngine};
use crate::memory::{Message, ToolCall};
use crate::tools::ToolRegistry;

/// 单个调用的执行结果
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub call_id: String,
    pub tool_name: String,
    pub result: Result<String, NodeFault>,
}

impl ToolOutcome {
    /// 成功载荷或错误载荷，都变成一条 tool 结果消息
    pub fn to_message(&self, recovery: &RecoveryEngine) -> Message {
        match &self.result {
            Ok(content) => Message::tool_result(&self.call_id, content.clone()),
            Err(fault) => Message::tool_result(&self.call_id, recovery.tool_error_text(fault)),
        }
    }
}

/// 工具执行器：对每次调用施加超时，并将结果映射为 NodeFault
pub struct ToolExecutor {
    registry: Arc<dyn ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<dyn ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    /// 执行单个调用；输出 JSON 审计日志
    pub async fn execute(&self, call: &ToolCall) -> Result<String, NodeFault> {
        if self.registry.classify(&call.tool_name).is_none() {
            tracing::warn!(tool = %call.tool_name, "unknown tool requested");
            return Err(NodeFault::UnknownTool(call.tool_name.clone()));
        }

        let start = Instant::now();
        let args_preview = args_preview(&call.arguments);
        let result = timeout(
            self.timeout,
            self.registry.execute(&call.tool_name, call.arguments.clone()),
        )
        .await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.tool_name,
            "call_id": call.call_id,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(NodeFault::ToolFailed(e)),
            Err(_) => Err(NodeFault::ToolTimeout(call.tool_name.clone())),
        }
    }

    /// 顺序执行整批调用，每个调用恰好一个结果
    pub async fn execute_batch(&self, calls: &[ToolCall]) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.execute(call).await;
            outcomes.push(ToolOutcome {
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                result,
            });
        }
        outcomes
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{EchoTool, Tool, ToolSet};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "explode"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("database locked".to_string())
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn executor() -> ToolExecutor {
        let mut set = ToolSet::new();
        set.register_safe(EchoTool::new())
            .register_safe(FailingTool)
            .register_safe(SlowTool);
        ToolExecutor::new(Arc::new(set), 30).with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_batch_captures_faults_without_aborting() {
        let executor = executor();
        let calls = vec![
            ToolCall::new("explode", Value::Null),
            ToolCall::new("missing", Value::Null),
            ToolCall::new("slow", Value::Null),
            ToolCall::new("echo", json!({"text": "still runs"})),
        ];
        let outcomes = executor.execute_batch(&calls).await;
        assert_eq!(outcomes.len(), 4);
        assert_eq!(
            outcomes[0].result,
            Err(NodeFault::ToolFailed("database locked".into()))
        );
        assert_eq!(outcomes[1].result, Err(NodeFault::UnknownTool("missing".into())));
        assert_eq!(outcomes[2].result, Err(NodeFault::ToolTimeout("slow".into())));
        assert_eq!(outcomes[3].result, Ok("still runs".to_string()));
    }

    #[tokio::test]
    async fn test_outcome_message_links_call_id() {
        let executor = executor();
        let call = ToolCall::new("explode", Value::Null).with_id("call_1");
        let outcome = executor.execute_batch(std::slice::from_ref(&call)).await.remove(0);
        let msg = outcome.to_message(&RecoveryEngine::new());
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(msg.content.starts_with("Error: Tool execution failed: database locked"));
    }
}
