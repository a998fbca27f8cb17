//! 推理适配器抽象
//!
//! 助手节点只通过 ReasoningAdapter 决定「说什么 / 调哪个工具」；适配器之外的一切由引擎负责。
//! 实现可以是 OpenAI 兼容客户端、规则 Mock 或测试用脚本。

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{Context, DialogStack};
use crate::memory::Message;

/// 推理适配器错误；引擎一律当作非致命节点故障处理
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReasoningError {
    #[error("Reasoning unavailable: {0}")]
    Unavailable(String),
}

/// 一次推理调用的输入（借用线程状态，不复制消息日志）
#[derive(Debug, Clone, Copy)]
pub struct ReasoningRequest<'a> {
    pub thread_id: &'a str,
    /// 当前执行的助手（栈顶）
    pub handler: &'a str,
    pub messages: &'a [Message],
    pub context: Option<&'a Context>,
    pub dialog_stack: &'a DialogStack,
    /// 空回复重试时附加的临时提示，不写入日志
    pub nudge: Option<&'a str>,
}

/// 推理适配器：给定状态，产出一条 assistant 消息（文字回复或一组工具调用）
#[async_trait]
pub trait ReasoningAdapter: Send + Sync {
    async fn invoke(&self, request: ReasoningRequest<'_>) -> Result<Message, ReasoningError>;
}
