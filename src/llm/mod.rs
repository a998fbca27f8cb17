//! 推理层：适配器抽象与 Mock 实现

pub mod mock;
pub mod traits;

pub use mock::{MockReasoner, ScriptedReasoner};
pub use traits::{ReasoningAdapter, ReasoningError, ReasoningRequest};
