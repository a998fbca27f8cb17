//! 故障恢复：把 NodeFault 映射为对话可见的诊断消息
//!
//! 工具类故障变成 tool 结果（每个调用一条，保持调用与结果一一对应），
//! 推理类故障变成一条不带工具调用的 assistant 消息，路由器据此结束本轮。

use crate::core::NodeFault;
use crate::memory::{Message, ToolCall};

/// 诊断消息生成器
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// 工具侧故障：让所属助手看到错误并自行修正
    pub fn tool_error_text(&self, fault: &NodeFault) -> String {
        format!("Error: {fault}\nPlease fix your mistakes.")
    }

    /// 为一批调用中的每一个生成错误结果
    pub fn tool_error_messages(&self, calls: &[ToolCall], fault: &NodeFault) -> Vec<Message> {
        let text = self.tool_error_text(fault);
        calls
            .iter()
            .map(|call| Message::tool_result(&call.call_id, text.clone()))
            .collect()
    }

    /// 助手侧故障：以 assistant 身份向用户致歉，本轮随之结束
    pub fn assistant_notice(&self, fault: &NodeFault) -> Message {
        let text = match fault {
            NodeFault::ReasoningUnavailable(_) | NodeFault::ReasoningTimeout(_) => {
                "I'm having trouble reaching my reasoning service right now. Please try again in a moment."
            }
            NodeFault::EmptyResponse(_) => {
                "I'm sorry, I didn't understand that. Could you please rephrase?"
            }
            NodeFault::StepLimitExceeded(_) => {
                "I wasn't able to finish this request. Please try again or rephrase it."
            }
            _ => "An unexpected error occurred while processing your request.",
        };
        Message::assistant(format!("{text} ({fault})"))
    }
}
