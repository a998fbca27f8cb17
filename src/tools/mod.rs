pub mod echo;
pub mod executor;
pub mod registry;

pub use echo::EchoTool;
pub use executor::{ToolExecutor, ToolOutcome};
pub use registry::{Tool, ToolClass, ToolRegistry, ToolSet, COMPLETE_OR_ESCALATE};
