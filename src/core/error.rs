//! 引擎错误类型
//!
//! 三类错误：
//! - NodeFault：节点故障（推理不可用、工具失败、批次非法等），非致命，转为诊断消息后继续路由；
//! - 协议违规（无待审批却提交决定、待审批时提交新输入、重复/过期决定），在任何状态修改前拒绝；
//! - 持久化故障：原样向调用方传播，不写入部分状态。

use thiserror::Error;

use crate::checkpoint::CheckpointError;

/// advance 等调用面向调用方的错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No pending approval for thread {0}")]
    NoPendingApproval(String),

    #[error("Thread {0} is awaiting approval; resolve it before sending new input")]
    ApprovalRequired(String),

    #[error("Decision targets approval {given}, but pending approval is {pending}")]
    StaleDecision { given: String, pending: String },

    #[error("Thread {0} is busy")]
    ThreadBusy(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl EngineError {
    /// 协议违规：调用在修改任何状态之前即被拒绝
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            EngineError::NoPendingApproval(_)
                | EngineError::ApprovalRequired(_)
                | EngineError::StaleDecision { .. }
        )
    }
}

/// 节点执行中的非致命故障，由 RecoveryEngine 转为对话可见的诊断文本
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeFault {
    #[error("Reasoning unavailable: {0}")]
    ReasoningUnavailable(String),

    /// 超时时长（毫秒）
    #[error("Reasoning timed out after {0}ms")]
    ReasoningTimeout(u64),

    #[error("Handler {0} produced no output")]
    EmptyResponse(String),

    #[error("Tool execution failed: {0}")]
    ToolFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool call batch: {0}")]
    InvalidBatch(String),

    #[error("Turn stopped after {0} steps")]
    StepLimitExceeded(usize),

    #[error("Context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Input guard unavailable: {0}")]
    GuardUnavailable(String),
}
