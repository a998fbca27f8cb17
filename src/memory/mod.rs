//! 记忆层：线程消息日志的数据模型

pub mod conversation;

pub use conversation::{Message, Role, ToolCall};
