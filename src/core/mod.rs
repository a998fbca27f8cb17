//! 核心层：错误、故障恢复、线程状态、上下文获取、输入守卫

pub mod context;
pub mod error;
pub mod guard;
pub mod recovery;
pub mod state;

pub use context::{ContextProvider, NoContext, StaticContext};
pub use error::{EngineError, NodeFault};
pub use guard::{refusal_text, AllowAll, GuardVerdict, InputGuard, KeywordGuard};
pub use recovery::RecoveryEngine;
pub use state::{
    Context, DialogStack, ExecutionPhase, HandlerId, PendingApproval, ThreadId, ThreadState,
};
