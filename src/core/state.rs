//! 线程状态：检查点的最小单元
//!
//! ThreadState 在两次 advance 之间归 CheckpointStore 所有，advance 期间归持锁的引擎调用独占。
//! DialogStack 把委派深度显式化（栈底永远是主助手），PendingApproval 每个线程至多一个。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::{Message, ToolCall};
use crate::workflow::NodeRef;

/// 助手（handler）标识
pub type HandlerId = String;

/// 线程标识
pub type ThreadId = String;

/// 线程级辅助上下文（如用户档案、航班快照），首次接触时获取一次，之后只读
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub data: Value,
    pub fetched_at: DateTime<Utc>,
}

impl Context {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            fetched_at: Utc::now(),
        }
    }
}

/// 委派栈：栈顶是当前「拥有」对话的助手；永不为空
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<HandlerId>", into = "Vec<HandlerId>")]
pub struct DialogStack(Vec<HandlerId>);

impl DialogStack {
    pub fn new(primary: impl Into<HandlerId>) -> Self {
        Self(vec![primary.into()])
    }

    pub fn top(&self) -> &HandlerId {
        // 构造与反序列化都保证非空
        &self.0[self.0.len() - 1]
    }

    pub fn primary(&self) -> &HandlerId {
        &self.0[0]
    }

    pub fn push(&mut self, handler: impl Into<HandlerId>) {
        self.0.push(handler.into());
    }

    /// 弹出栈顶；只剩主助手时不弹出，返回 None
    pub fn pop(&mut self) -> Option<HandlerId> {
        if self.0.len() > 1 {
            self.0.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, handler: &str) -> bool {
        self.0.iter().any(|h| h == handler)
    }

    pub fn as_slice(&self) -> &[HandlerId] {
        &self.0
    }
}

impl TryFrom<Vec<HandlerId>> for DialogStack {
    type Error = String;

    fn try_from(value: Vec<HandlerId>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("dialog stack must contain the primary handler".to_string());
        }
        Ok(Self(value))
    }
}

impl From<DialogStack> for Vec<HandlerId> {
    fn from(stack: DialogStack) -> Self {
        stack.0
    }
}

/// 等待人工审批的一批工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub approval_id: String,
    /// 触发挂起的 assistant 消息中的全部调用
    pub tool_calls: Vec<ToolCall>,
    /// 发起请求的助手；审批消费后控制权回到这里
    pub origin: HandlerId,
    pub requested_at: DateTime<Utc>,
}

impl PendingApproval {
    pub fn new(tool_calls: Vec<ToolCall>, origin: impl Into<HandlerId>) -> Self {
        Self {
            approval_id: uuid::Uuid::new_v4().to_string(),
            tool_calls,
            origin: origin.into(),
            requested_at: Utc::now(),
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|c| c.tool_name.as_str()).collect()
    }
}

/// 线程执行阶段；Running 只存在于 advance 执行期间，不会被持久化（见 WorkflowEngine::thread_phase）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Idle,
    Running,
    AwaitingApproval,
}

/// 检查点单元
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadState {
    pub thread_id: ThreadId,
    pub messages: Vec<Message>,
    pub context: Option<Context>,
    pub dialog_stack: DialogStack,
    pub pending_approval: Option<PendingApproval>,
    /// None 表示本轮已完全结束；Some 表示在该节点处挂起，需从这里恢复
    pub next_node: Option<NodeRef>,
    /// 每次保存递增
    #[serde(default)]
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl ThreadState {
    /// 首次接触：空日志，栈 = [primary]
    pub fn new(thread_id: impl Into<ThreadId>, primary: impl Into<HandlerId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            context: None,
            dialog_stack: DialogStack::new(primary),
            pending_approval: None,
            next_node: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// 持久化视角下的阶段：有 PendingApproval 即 AwaitingApproval
    pub fn phase(&self) -> ExecutionPhase {
        if self.pending_approval.is_some() {
            ExecutionPhase::AwaitingApproval
        } else {
            ExecutionPhase::Idle
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn active_handler(&self) -> &HandlerId {
        self.dialog_stack.top()
    }

    /// 保存前调用：版本号递增并刷新时间戳
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
