pub mod builder;
pub mod engine;
pub mod events;
pub mod graph;
pub mod lock;
pub mod router;
pub mod types;

pub use builder::WorkflowBuilder;
pub use engine::{denial_text, WorkflowEngine, EMPTY_RESPONSE_NUDGE};
pub use events::EngineEvent;
pub use graph::{HandlerSpec, WorkflowGraph};
pub use lock::{ThreadLockGuard, ThreadLocks};
pub use router::route;
pub use types::*;
