//! 引擎过程事件：每个线程的操作日志，可推送给前端或写入审计
//!
//! 发送失败（接收端已关闭）静默忽略，不影响回合执行。

use serde::Serialize;
use serde_json::Value;

use crate::workflow::types::TurnStatus;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// advance 开始；input 为 message / approve / reject
    TurnStarted { thread_id: String, input: String },
    /// 进入节点
    NodeEntered { thread_id: String, node: String },
    /// 执行工具调用
    ToolCall {
        thread_id: String,
        call_id: String,
        tool: String,
        args: Value,
    },
    /// 工具结果（预览）
    ToolResult {
        thread_id: String,
        call_id: String,
        tool: String,
        ok: bool,
        preview: String,
    },
    /// 非致命节点故障
    NodeFault {
        thread_id: String,
        node: String,
        reason: String,
    },
    /// 输入守卫拒绝，本轮不进入任何助手
    InputRefused { thread_id: String, reason: String },
    /// 挂起等待审批
    ApprovalRequested {
        thread_id: String,
        approval_id: String,
        origin: String,
        tools: Vec<String>,
    },
    /// 审批决定已消费
    ApprovalResolved {
        thread_id: String,
        approval_id: String,
        approved: bool,
    },
    /// advance 结束
    TurnFinished {
        thread_id: String,
        status: TurnStatus,
        appended: usize,
    },
}

pub(crate) fn send_event(
    tx: &Option<tokio::sync::mpsc::UnboundedSender<EngineEvent>>,
    ev: EngineEvent,
) {
    if let Some(tx) = tx {
        let _ = tx.send(ev);
    }
}

pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let ev = EngineEvent::TurnFinished {
            thread_id: "t1".into(),
            status: TurnStatus::AwaitingApproval,
            appended: 2,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "turn_finished");
        assert_eq!(json["status"], "awaiting_approval");
    }

    #[test]
    fn test_send_without_receiver_is_silent() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        send_event(
            &Some(tx),
            EngineEvent::NodeEntered {
                thread_id: "t1".into(),
                node: "entry".into(),
            },
        );
        send_event(&None, EngineEvent::NodeEntered { thread_id: "t1".into(), node: "x".into() });
    }
}
