//! Mock 推理适配器（无需模型 API）
//!
//! - MockReasoner：规则回显。用户输入 `!工具名 {json}` 时产出对应工具调用，否则回显文本；
//!   最后一条是工具结果时总结结果。用于控制台演示完整的挂起/恢复流程。
//! - ScriptedReasoner：按助手排队的脚本回复，测试用，记录每次调用。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ReasoningAdapter, ReasoningError, ReasoningRequest};
use crate::memory::{Message, Role, ToolCall};

/// 规则回显推理器
#[derive(Debug, Default)]
pub struct MockReasoner;

impl MockReasoner {
    /// 解析 `!tool_name {"k": "v"}`；参数缺省为空对象
    fn parse_command(text: &str) -> Option<ToolCall> {
        let rest = text.trim().strip_prefix('!')?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        if name.is_empty() {
            return None;
        }
        let arguments = if args.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(args).unwrap_or_else(|_| serde_json::json!({ "text": args }))
        };
        Some(ToolCall::new(name, arguments))
    }
}

#[async_trait]
impl ReasoningAdapter for MockReasoner {
    async fn invoke(&self, request: ReasoningRequest<'_>) -> Result<Message, ReasoningError> {
        let last = request.messages.last();
        match last.map(|m| m.role) {
            Some(Role::Tool) => {
                let content = last.map(|m| m.content.as_str()).unwrap_or_default();
                Ok(Message::assistant(format!(
                    "[{}] Tool result: {}",
                    request.handler, content
                )))
            }
            Some(Role::User) => {
                let text = last.map(|m| m.content.as_str()).unwrap_or_default();
                match Self::parse_command(text) {
                    Some(call) => Ok(Message::assistant_with_calls("", vec![call])),
                    None => Ok(Message::assistant(format!(
                        "[{}] Echo from Mock: {}",
                        request.handler, text
                    ))),
                }
            }
            // 委派进入后最后一条是 assistant 的委派调用
            _ => Ok(Message::assistant(format!(
                "[{}] How can I help with this?",
                request.handler
            ))),
        }
    }
}

struct Scripted {
    delay: Option<Duration>,
    reply: Result<Message, ReasoningError>,
}

/// 脚本推理器：每个助手一条回复队列；队列为空时回复 "ok"
#[derive(Default)]
pub struct ScriptedReasoner {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    fn enqueue(&self, handler: &str, item: Scripted) {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.entry(handler.to_string()).or_default().push_back(item);
    }

    /// 为 handler 追加一条回复
    pub fn push(&self, handler: &str, reply: Message) -> &Self {
        self.enqueue(handler, Scripted { delay: None, reply: Ok(reply) });
        self
    }

    /// 追加一条失败
    pub fn push_error(&self, handler: &str, error: ReasoningError) -> &Self {
        self.enqueue(handler, Scripted { delay: None, reply: Err(error) });
        self
    }

    /// 追加一条延迟回复（用于超时测试）
    pub fn push_delayed(&self, handler: &str, delay: Duration, reply: Message) -> &Self {
        self.enqueue(handler, Scripted { delay: Some(delay), reply: Ok(reply) });
        self
    }

    /// 所有调用记录：(handler, nudge)
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, handler: &str) -> usize {
        self.calls().iter().filter(|(h, _)| h == handler).count()
    }
}

#[async_trait]
impl ReasoningAdapter for ScriptedReasoner {
    async fn invoke(&self, request: ReasoningRequest<'_>) -> Result<Message, ReasoningError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((request.handler.to_string(), request.nudge.map(str::to_string)));
        let next = {
            let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
            queues.get_mut(request.handler).and_then(VecDeque::pop_front)
        };
        match next {
            Some(Scripted { delay, reply }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Ok(Message::assistant("ok")),
        }
    }
}
