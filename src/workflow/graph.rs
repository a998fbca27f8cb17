//! 助手图
//!
//! 一个主助手加任意数量的专门助手；每个助手可带工具白名单（None 表示不限制）。
//! 图在构建后只读，由 WorkflowBuilder 校验。

use std::collections::{HashMap, HashSet};

use crate::core::HandlerId;

/// 单个助手的定义
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSpec {
    pub id: HandlerId,
    pub name: String,
    /// 允许调用的工具（含委派/离开信号）；None 表示不限制
    pub tools: Option<HashSet<String>>,
}

impl HandlerSpec {
    pub fn allows(&self, tool_name: &str) -> bool {
        self.tools
            .as_ref()
            .map_or(true, |tools| tools.contains(tool_name))
    }
}

/// 助手图
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub(crate) handlers: HashMap<HandlerId, HandlerSpec>,
    pub(crate) primary: HandlerId,
}

impl WorkflowGraph {
    pub fn primary(&self) -> &HandlerId {
        &self.primary
    }

    pub fn contains(&self, handler: &str) -> bool {
        self.handlers.contains_key(handler)
    }

    /// 显示名；未注册时回退为 ID
    pub fn display_name<'a>(&'a self, handler: &'a str) -> &'a str {
        self.handlers
            .get(handler)
            .map(|h| h.name.as_str())
            .unwrap_or(handler)
    }

    /// handler 是否可以调用 tool_name；未注册的 handler 一律拒绝
    pub fn allows(&self, handler: &str, tool_name: &str) -> bool {
        self.handlers
            .get(handler)
            .map_or(false, |h| h.allows(tool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_primary_allows_everything() {
        let mut handlers = HashMap::new();
        handlers.insert(
            "primary".to_string(),
            HandlerSpec {
                id: "primary".into(),
                name: "Primary Assistant".into(),
                tools: None,
            },
        );
        let graph = WorkflowGraph {
            handlers,
            primary: "primary".into(),
        };
        assert_eq!(graph.primary(), "primary");
        assert!(graph.allows("primary", "anything"));
        assert!(!graph.allows("hotel", "anything"));
        assert_eq!(graph.display_name("hotel"), "hotel");
        assert!(graph.contains("primary"));
    }
}
