//! 工作流类型定义
//!
//! 节点引用、回合输入（新消息或审批决定）、回合结果与图配置错误

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{HandlerId, PendingApproval};
use crate::memory::Message;

/// 图中的节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", content = "value", rename_all = "snake_case")]
pub enum NodeRef {
    /// 入口：缺失时获取上下文，然后交给栈顶助手
    Entry,
    /// 助手节点（主助手或专门助手）
    Handler(HandlerId),
    /// 委派进入：压栈后进入该助手
    EnterHandler(HandlerId),
    /// 委派离开：弹栈后回到新的栈顶
    LeaveHandler,
    /// 安全工具执行
    SafeTools,
    /// 敏感工具执行：进入即挂起
    SensitiveTools,
    /// 错误报告：把非法批次的原因告诉所属助手
    ReportError(String),
}

impl NodeRef {
    /// 日志与事件用的短名称
    pub fn label(&self) -> String {
        match self {
            NodeRef::Entry => "entry".to_string(),
            NodeRef::Handler(h) => format!("handler:{h}"),
            NodeRef::EnterHandler(h) => format!("enter:{h}"),
            NodeRef::LeaveHandler => "leave".to_string(),
            NodeRef::SafeTools => "safe_tools".to_string(),
            NodeRef::SensitiveTools => "sensitive_tools".to_string(),
            NodeRef::ReportError(_) => "report_error".to_string(),
        }
    }
}

/// 人工审批决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approve {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approval_id: Option<String>,
    },
    Reject {
        #[serde(default)]
        feedback: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approval_id: Option<String>,
    },
}

impl Decision {
    pub fn approve() -> Self {
        Decision::Approve { approval_id: None }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Decision::Reject {
            feedback: feedback.into(),
            approval_id: None,
        }
    }

    /// 绑定到具体的审批，防止回答过期请求
    pub fn for_approval(self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match self {
            Decision::Approve { .. } => Decision::Approve { approval_id: id },
            Decision::Reject { feedback, .. } => Decision::Reject {
                feedback,
                approval_id: id,
            },
        }
    }

    pub fn approval_id(&self) -> Option<&str> {
        match self {
            Decision::Approve { approval_id } | Decision::Reject { approval_id, .. } => {
                approval_id.as_deref()
            }
        }
    }
}

/// 一次 advance 的外部输入
#[derive(Debug, Clone, PartialEq)]
pub enum TurnInput {
    Message(String),
    Decision(Decision),
}

impl TurnInput {
    pub fn message(text: impl Into<String>) -> Self {
        TurnInput::Message(text.into())
    }
}

/// 回合结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Complete,
    AwaitingApproval,
}

/// advance 的返回值
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    /// 本次调用追加的消息（不含用户输入本身）
    pub messages: Vec<Message>,
    /// status = AwaitingApproval 时的待审批内容
    pub pending_approval: Option<PendingApproval>,
}

impl TurnOutcome {
    /// 最后一条 assistant 文字回复
    pub fn reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::memory::Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.as_str())
    }
}

/// 工作流（助手图）配置错误
#[derive(Error, Debug, PartialEq)]
pub enum WorkflowError {
    #[error("Handler not found: {0}")]
    HandlerNotFound(String),
    #[error("Duplicate handler: {0}")]
    DuplicateHandler(String),
    #[error("Invalid workflow configuration: {0}")]
    InvalidConfiguration(String),
}
