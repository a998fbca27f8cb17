//! 路由器：给定线程状态，决定下一个节点
//!
//! 纯函数，无副作用。委派压栈/离开弹栈由 EnterHandler / LeaveHandler 节点完成，
//! 路由器只给出去向。优先级：
//! 1. 有待审批 → SensitiveTools（引擎在此短路，不会真的重新路由）
//! 2. 最新消息是 tool 结果或用户输入 → 栈顶助手
//! 3. assistant 且无工具调用 → None（本轮结束）
//! 4. assistant 带工具调用 → 委派 / 离开 / 敏感 / 安全；非法批次 → ReportError

use crate::core::ThreadState;
use crate::memory::{Message, Role};
use crate::tools::{ToolClass, ToolRegistry};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::NodeRef;

/// 计算下一个节点；None 表示本轮结束
pub fn route(
    state: &ThreadState,
    registry: &dyn ToolRegistry,
    graph: &WorkflowGraph,
) -> Option<NodeRef> {
    if state.pending_approval.is_some() {
        return Some(NodeRef::SensitiveTools);
    }

    let top = state.dialog_stack.top();
    let last = match state.last_message() {
        Some(m) => m,
        None => return Some(NodeRef::Handler(top.clone())),
    };

    match last.role {
        Role::User | Role::Tool => Some(NodeRef::Handler(top.clone())),
        Role::Assistant if !last.has_tool_calls() => None,
        Role::Assistant => Some(route_tool_calls(state, last, registry, graph)),
    }
}

fn route_tool_calls(
    state: &ThreadState,
    last: &Message,
    registry: &dyn ToolRegistry,
    graph: &WorkflowGraph,
) -> NodeRef {
    let owner = state.dialog_stack.top();

    if let Some(call) = last
        .tool_calls
        .iter()
        .find(|c| !graph.allows(owner, &c.tool_name))
    {
        return NodeRef::ReportError(format!(
            "{} is not available to {}",
            call.tool_name,
            graph.display_name(owner)
        ));
    }

    // 未注册的工具按普通调用处理，由执行器报告 UnknownTool
    let classes: Vec<Option<ToolClass>> = last
        .tool_calls
        .iter()
        .map(|c| registry.classify(&c.tool_name))
        .collect();
    let controls: Vec<&ToolClass> = classes
        .iter()
        .flatten()
        .filter(|c| c.is_control())
        .collect();

    match controls.as_slice() {
        [] => {
            if classes.iter().flatten().any(|c| *c == ToolClass::Sensitive) {
                NodeRef::SensitiveTools
            } else {
                NodeRef::SafeTools
            }
        }
        [_] if last.tool_calls.len() > 1 => NodeRef::ReportError(
            "a delegation or completion signal cannot be combined with other tool calls in one message"
                .to_string(),
        ),
        [ToolClass::Delegation { handler }] => {
            if !graph.contains(handler) {
                NodeRef::ReportError(format!("no assistant is registered as {handler}"))
            } else if handler == graph.primary() || state.dialog_stack.contains(handler) {
                NodeRef::ReportError(format!(
                    "{} is already part of this conversation",
                    graph.display_name(handler)
                ))
            } else {
                NodeRef::EnterHandler(handler.clone())
            }
        }
        [_] => {
            if state.dialog_stack.depth() > 1 {
                NodeRef::LeaveHandler
            } else {
                NodeRef::ReportError(
                    "the primary assistant has no caller to return control to".to_string(),
                )
            }
        }
        _ => NodeRef::ReportError(
            "only one delegation or completion signal is allowed per message".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PendingApproval;
    use crate::memory::ToolCall;
    use crate::tools::{EchoTool, ToolSet, COMPLETE_OR_ESCALATE};
    use crate::workflow::WorkflowBuilder;
    use serde_json::Value;

    fn registry() -> ToolSet {
        let mut set = ToolSet::new();
        set.register_safe(EchoTool::named("search_flights"))
            .register_sensitive(EchoTool::named("update_ticket"))
            .register_delegation("ToFlightBookingAssistant", "flight", "flight updates")
            .register_delegation("ToHotelBookingAssistant", "hotel", "hotel bookings")
            .register_delegation("ToPrimaryAssistant", "primary", "back to primary")
            .register_leave(COMPLETE_OR_ESCALATE);
        set
    }

    fn graph() -> WorkflowGraph {
        WorkflowBuilder::new()
            .primary("primary", "Primary Assistant")
            .handler("flight", "Flight Updates Assistant")
            .tools(
                "flight",
                ["search_flights", "update_ticket", COMPLETE_OR_ESCALATE],
            )
            .build()
            .unwrap()
    }

    fn calls(names: &[&str]) -> Message {
        Message::assistant_with_calls(
            "",
            names.iter().map(|n| ToolCall::new(*n, Value::Null)).collect(),
        )
    }

    fn state_with(stack: &[&str], last: Message) -> ThreadState {
        let mut state = ThreadState::new("t1", "primary");
        for handler in &stack[1..] {
            state.dialog_stack.push(*handler);
        }
        state.append(Message::user("hi"));
        state.append(last);
        state
    }

    fn route_for(stack: &[&str], last: Message) -> Option<NodeRef> {
        route(&state_with(stack, last), &registry(), &graph())
    }

    #[test]
    fn test_route_to_owner_after_input_or_tool_result() {
        let empty = ThreadState::new("t1", "primary");
        assert_eq!(
            route(&empty, &registry(), &graph()),
            Some(NodeRef::Handler("primary".into()))
        );
        assert_eq!(
            route_for(&["primary", "flight"], Message::tool_result("c1", "[]")),
            Some(NodeRef::Handler("flight".into()))
        );
    }

    #[test]
    fn test_plain_reply_ends_turn() {
        assert_eq!(route_for(&["primary"], Message::assistant("done")), None);
    }

    #[test]
    fn test_safe_and_sensitive_batches() {
        assert_eq!(
            route_for(&["primary", "flight"], calls(&["search_flights"])),
            Some(NodeRef::SafeTools)
        );
        assert_eq!(
            route_for(&["primary", "flight"], calls(&["search_flights", "update_ticket"])),
            Some(NodeRef::SensitiveTools)
        );
        // 未注册工具走安全执行器，由执行器报告
        assert_eq!(
            route_for(&["primary"], calls(&["lookup_policy"])),
            Some(NodeRef::SafeTools)
        );
    }

    #[test]
    fn test_delegation_and_leave() {
        assert_eq!(
            route_for(&["primary"], calls(&["ToFlightBookingAssistant"])),
            Some(NodeRef::EnterHandler("flight".into()))
        );
        assert_eq!(
            route_for(&["primary", "flight"], calls(&[COMPLETE_OR_ESCALATE])),
            Some(NodeRef::LeaveHandler)
        );
    }

    #[test]
    fn test_malformed_batches_report_errors() {
        let cases = [
            (vec!["primary"], vec!["ToFlightBookingAssistant", "search_flights"]),
            (vec!["primary"], vec!["ToFlightBookingAssistant", "ToFlightBookingAssistant"]),
            (vec!["primary"], vec!["ToHotelBookingAssistant"]),
            (vec!["primary"], vec!["ToPrimaryAssistant"]),
            (vec!["primary"], vec![COMPLETE_OR_ESCALATE]),
            (vec!["primary", "flight"], vec!["ToFlightBookingAssistant"]),
        ];
        for (stack, names) in cases {
            let next = route_for(&stack, calls(&names));
            assert!(
                matches!(next, Some(NodeRef::ReportError(_))),
                "{names:?} from {stack:?} routed to {next:?}"
            );
        }
    }

    #[test]
    fn test_allowlist_is_enforced_for_owner() {
        let next = route_for(&["primary", "flight"], calls(&["ToHotelBookingAssistant"]));
        match next {
            Some(NodeRef::ReportError(reason)) => {
                assert!(reason.contains("Flight Updates Assistant"));
            }
            other => panic!("unexpected route {other:?}"),
        }
    }

    #[test]
    fn test_pending_approval_short_circuits() {
        let mut state = state_with(&["primary"], Message::assistant("x"));
        state.pending_approval = Some(PendingApproval::new(vec![], "primary"));
        assert_eq!(
            route(&state, &registry(), &graph()),
            Some(NodeRef::SensitiveTools)
        );
    }
}
