//! 助手图构建器
//!
//! 提供流畅的 API 来声明主助手、专门助手及其工具白名单

use std::collections::{HashMap, HashSet};

use crate::config::HandlerSection;
use crate::core::HandlerId;
use crate::workflow::graph::{HandlerSpec, WorkflowGraph};
use crate::workflow::types::WorkflowError;

/// 助手图构建器
#[derive(Debug, Default)]
pub struct WorkflowBuilder {
    primary: Vec<HandlerId>,
    order: Vec<HandlerId>,
    handlers: HashMap<HandlerId, HandlerSpec>,
    errors: Vec<WorkflowError>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, id: HandlerId, name: String) {
        if self.handlers.contains_key(&id) {
            self.errors.push(WorkflowError::DuplicateHandler(id));
            return;
        }
        self.order.push(id.clone());
        self.handlers.insert(
            id.clone(),
            HandlerSpec {
                id,
                name,
                tools: None,
            },
        );
    }

    /// 声明主助手（栈底）
    pub fn primary(mut self, id: impl Into<HandlerId>, name: impl Into<String>) -> Self {
        let id = id.into();
        self.primary.push(id.clone());
        self.add(id, name.into());
        self
    }

    /// 声明专门助手
    pub fn handler(mut self, id: impl Into<HandlerId>, name: impl Into<String>) -> Self {
        self.add(id.into(), name.into());
        self
    }

    /// 设置工具白名单（委派/离开信号也要列出）
    pub fn tools<I, S>(mut self, id: &str, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.handlers.get_mut(id) {
            Some(handler) => {
                handler.tools = Some(tools.into_iter().map(Into::into).collect::<HashSet<_>>());
            }
            None => self.errors.push(WorkflowError::HandlerNotFound(id.to_string())),
        }
        self
    }

    /// 从 [[handlers]] 配置构建；tools 为空表示不限制
    pub fn from_config(sections: &[HandlerSection]) -> Self {
        sections.iter().fold(Self::new(), |builder, section| {
            let builder = if section.primary {
                builder.primary(&section.id, &section.name)
            } else {
                builder.handler(&section.id, &section.name)
            };
            if section.tools.is_empty() {
                builder
            } else {
                builder.tools(&section.id, section.tools.iter().cloned())
            }
        })
    }

    /// 校验并构建助手图
    pub fn build(mut self) -> Result<WorkflowGraph, WorkflowError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        if self.order.iter().any(|id| id.trim().is_empty()) {
            return Err(WorkflowError::InvalidConfiguration(
                "handler id must not be empty".to_string(),
            ));
        }
        let primary = match self.primary.as_slice() {
            [only] => only.clone(),
            [] => {
                return Err(WorkflowError::InvalidConfiguration(
                    "a primary handler is required".to_string(),
                ))
            }
            _ => {
                return Err(WorkflowError::InvalidConfiguration(
                    "exactly one primary handler is allowed".to_string(),
                ))
            }
        };

        tracing::debug!(handlers = ?self.order, primary = %primary, "workflow graph built");
        Ok(WorkflowGraph {
            handlers: self.handlers,
            primary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_graph_with_allowlists() {
        let graph = WorkflowBuilder::new()
            .primary("primary", "Primary Assistant")
            .handler("hotel", "Hotel Booking Assistant")
            .tools("hotel", ["search_hotels", "CompleteOrEscalate"])
            .build()
            .expect("Failed to build graph");

        assert_eq!(graph.primary(), "primary");
        assert!(graph.allows("hotel", "search_hotels"));
        assert!(!graph.allows("hotel", "cancel_ticket"));
        assert!(graph.allows("primary", "cancel_ticket"));
        assert_eq!(graph.display_name("hotel"), "Hotel Booking Assistant");
        assert!(graph.contains("hotel"));
    }

    #[test]
    fn test_build_requires_exactly_one_primary() {
        let none = WorkflowBuilder::new().handler("hotel", "Hotel").build();
        assert!(matches!(none, Err(WorkflowError::InvalidConfiguration(_))));

        let two = WorkflowBuilder::new()
            .primary("a", "A")
            .primary("b", "B")
            .build();
        assert!(matches!(two, Err(WorkflowError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_build_rejects_duplicates_and_unknown_targets() {
        let dup = WorkflowBuilder::new()
            .primary("primary", "P")
            .handler("primary", "Again")
            .build();
        assert_eq!(dup.unwrap_err(), WorkflowError::DuplicateHandler("primary".into()));

        let unknown = WorkflowBuilder::new()
            .primary("primary", "P")
            .tools("car", ["book_car"])
            .build();
        assert_eq!(unknown.unwrap_err(), WorkflowError::HandlerNotFound("car".into()));

        let empty = WorkflowBuilder::new().primary("", "P").build();
        assert!(empty.is_err());
    }

    #[test]
    fn test_from_config() {
        let sections = vec![
            HandlerSection {
                id: "primary".into(),
                name: "Primary".into(),
                primary: true,
                tools: vec![],
            },
            HandlerSection {
                id: "flight".into(),
                name: "Flight Updates".into(),
                primary: false,
                tools: vec!["update_ticket".into()],
            },
        ];
        let graph = WorkflowBuilder::from_config(&sections).build().unwrap();
        assert!(graph.allows("flight", "update_ticket"));
        assert!(!graph.allows("flight", "search_hotels"));
    }
}
