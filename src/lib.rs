//! Hive - 多助手工作流引擎
//!
//! 模块划分：
//! - **checkpoint**: 线程状态检查点存储（内存分片 / SQLite）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 线程状态、错误分类、故障恢复、上下文获取、输入守卫
//! - **llm**: 推理适配器抽象与 Mock 实现
//! - **memory**: 对话消息与工具调用
//! - **observability**: tracing 初始化
//! - **tools**: 工具注册表（安全 / 敏感 / 委派 / 离开）与执行器
//! - **workflow**: 助手图、路由器、线程锁、执行引擎（含人工审批挂起/恢复）

pub mod checkpoint;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;
pub mod workflow;

pub use checkpoint::{create_checkpoint_store, CheckpointError, CheckpointStore};
pub use core::{EngineError, PendingApproval, ThreadState};
pub use workflow::{Decision, TurnInput, TurnOutcome, TurnStatus, WorkflowBuilder, WorkflowEngine};
