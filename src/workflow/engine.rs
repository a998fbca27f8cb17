//! 工作流引擎
//!
//! 一次 advance 处理一个外部输入（新消息或审批决定）：持线程锁 → 读取检查点 → 协议检查 →
//! 按路由逐节点执行 → 完成或在敏感工具前挂起 → 写回检查点。
//! 新消息回合从入口开始：获取上下文、输入守卫，再交给栈顶助手。
//!
//! 节点故障（推理失败/超时、工具失败、非法批次）转为对话内诊断消息后继续；
//! 协议违规在任何修改前拒绝；检查点故障原样返回，不写入部分状态。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

use crate::checkpoint::CheckpointStore;
use crate::config::EngineSettings;
use crate::core::{
    refusal_text, AllowAll, Context, ContextProvider, EngineError, ExecutionPhase, GuardVerdict,
    InputGuard, NoContext, NodeFault, PendingApproval, RecoveryEngine, ThreadState,
};
use crate::llm::{ReasoningAdapter, ReasoningError, ReasoningRequest};
use crate::memory::{Message, Role, ToolCall};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::workflow::events::{preview, send_event, EngineEvent};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::lock::ThreadLocks;
use crate::workflow::router::route;
use crate::workflow::types::{Decision, NodeRef, TurnInput, TurnOutcome, TurnStatus};

/// 空回复重试时附加给推理端的提示
pub const EMPTY_RESPONSE_NUDGE: &str = "Respond with a real output.";

/// 拒绝审批时合成的工具结果
pub fn denial_text(feedback: &str) -> String {
    if feedback.trim().is_empty() {
        "API call denied by user. Continue assisting, accounting for the user's input.".to_string()
    } else {
        format!(
            "API call denied by user. Reasoning: '{feedback}'. Continue assisting, accounting for the user's input."
        )
    }
}

/// 工作流引擎
pub struct WorkflowEngine {
    graph: WorkflowGraph,
    reasoner: Arc<dyn ReasoningAdapter>,
    executor: ToolExecutor,
    store: Arc<dyn CheckpointStore>,
    context_provider: Arc<dyn ContextProvider>,
    input_guard: Arc<dyn InputGuard>,
    settings: EngineSettings,
    recovery: RecoveryEngine,
    locks: ThreadLocks,
    event_tx: Option<UnboundedSender<EngineEvent>>,
}

impl WorkflowEngine {
    pub fn new(
        graph: WorkflowGraph,
        reasoner: Arc<dyn ReasoningAdapter>,
        registry: Arc<dyn ToolRegistry>,
        store: Arc<dyn CheckpointStore>,
        settings: EngineSettings,
    ) -> Self {
        let executor = ToolExecutor::new(registry, 0).with_timeout(settings.tool_timeout);
        let locks = ThreadLocks::new(settings.lock_policy, settings.lock_wait);
        Self {
            graph,
            reasoner,
            executor,
            store,
            context_provider: Arc::new(NoContext),
            input_guard: Arc::new(AllowAll),
            settings,
            recovery: RecoveryEngine::new(),
            locks,
            event_tx: None,
        }
    }

    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context_provider = provider;
        self
    }

    /// 设置输入守卫；默认全部放行
    pub fn with_input_guard(mut self, guard: Arc<dyn InputGuard>) -> Self {
        self.input_guard = guard;
        self
    }

    /// 设置过程事件发送端（前端展示或审计）
    pub fn with_event_tx(mut self, tx: UnboundedSender<EngineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 推进线程一个回合
    pub async fn advance(
        &self,
        thread_id: &str,
        input: TurnInput,
    ) -> Result<TurnOutcome, EngineError> {
        let _guard = self.locks.acquire(thread_id).await?;
        let mut state = self.load_or_create(thread_id).await?;

        // 协议检查：任何修改之前
        let decision = match input {
            TurnInput::Message(text) => {
                if state.pending_approval.is_some() {
                    return Err(EngineError::ApprovalRequired(thread_id.to_string()));
                }
                send_event(
                    &self.event_tx,
                    EngineEvent::TurnStarted {
                        thread_id: thread_id.to_string(),
                        input: "message".to_string(),
                    },
                );
                state.append(Message::user(text));
                None
            }
            TurnInput::Decision(decision) => {
                let pending = state
                    .pending_approval
                    .as_ref()
                    .ok_or_else(|| EngineError::NoPendingApproval(thread_id.to_string()))?;
                if let Some(given) = decision.approval_id() {
                    if given != pending.approval_id {
                        return Err(EngineError::StaleDecision {
                            given: given.to_string(),
                            pending: pending.approval_id.clone(),
                        });
                    }
                }
                let kind = match decision {
                    Decision::Approve { .. } => "approve",
                    Decision::Reject { .. } => "reject",
                };
                send_event(
                    &self.event_tx,
                    EngineEvent::TurnStarted {
                        thread_id: thread_id.to_string(),
                        input: kind.to_string(),
                    },
                );
                Some(decision)
            }
        };

        tracing::info!(thread_id, stack = ?state.dialog_stack.as_slice(), "turn started");
        let mark = state.messages.len();
        let start = match decision {
            Some(decision) => self.resolve_decision(&mut state, decision).await,
            None => NodeRef::Entry,
        };
        self.run(&mut state, start, mark).await
    }

    /// 读取待审批（不持线程锁，直接读检查点）
    pub async fn peek_pending_approval(
        &self,
        thread_id: &str,
    ) -> Result<Option<PendingApproval>, EngineError> {
        Ok(self
            .store
            .load(thread_id)
            .await?
            .and_then(|state| state.pending_approval))
    }

    /// 读取线程快照（不持线程锁）
    pub async fn thread_state(&self, thread_id: &str) -> Result<Option<ThreadState>, EngineError> {
        Ok(self.store.load(thread_id).await?)
    }

    /// 线程当前阶段：有 advance 持有或等待锁时为 Running，否则取检查点中的阶段
    pub async fn thread_phase(&self, thread_id: &str) -> Result<ExecutionPhase, EngineError> {
        if self.locks.is_active(thread_id) {
            return Ok(ExecutionPhase::Running);
        }
        Ok(self
            .store
            .load(thread_id)
            .await?
            .map_or(ExecutionPhase::Idle, |state| state.phase()))
    }

    /// 显式重新获取线程上下文；获取失败或超时时保留原上下文并返回 None
    pub async fn refresh_context(&self, thread_id: &str) -> Result<Option<Context>, EngineError> {
        let _guard = self.locks.acquire(thread_id).await?;
        let mut state = self.load_or_create(thread_id).await?;
        match self.fetch_context(thread_id).await {
            Ok(context) => {
                state.context = Some(context.clone());
                self.persist(&mut state).await?;
                tracing::info!(thread_id, "context refreshed");
                Ok(Some(context))
            }
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "context refresh failed, keeping previous context");
                Ok(None)
            }
        }
    }

    /// 获取上下文，超过 context_timeout 视为失败
    async fn fetch_context(&self, thread_id: &str) -> Result<Context, String> {
        match timeout(self.settings.context_timeout, self.context_provider.fetch(thread_id)).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "fetch timed out after {}ms",
                self.settings.context_timeout.as_millis()
            )),
        }
    }

    /// 检查本轮的用户消息；返回拒绝原因。守卫超时按放行处理
    async fn screen_input(&self, state: &ThreadState) -> Option<String> {
        let input = match state.last_message() {
            Some(msg) if msg.role == Role::User => msg.content.as_str(),
            _ => return None,
        };
        let check = self.input_guard.check(&state.thread_id, input);
        match timeout(self.settings.reasoning_timeout, check).await {
            Ok(GuardVerdict::Allow) => None,
            Ok(GuardVerdict::Refuse(reason)) => {
                tracing::warn!(thread_id = %state.thread_id, reason = %reason, "input refused");
                send_event(
                    &self.event_tx,
                    EngineEvent::InputRefused {
                        thread_id: state.thread_id.clone(),
                        reason: reason.clone(),
                    },
                );
                Some(reason)
            }
            Err(_) => {
                let fault = NodeFault::GuardUnavailable(format!(
                    "check timed out after {}ms",
                    self.settings.reasoning_timeout.as_millis()
                ));
                self.report_fault(state, "entry", &fault);
                None
            }
        }
    }

    async fn load_or_create(&self, thread_id: &str) -> Result<ThreadState, EngineError> {
        match self.store.load(thread_id).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Ok(ThreadState::new(thread_id, self.graph.primary().clone())),
            Err(e) => {
                tracing::error!(thread_id, error = %e, "checkpoint load failed");
                Err(e.into())
            }
        }
    }

    async fn persist(&self, state: &mut ThreadState) -> Result<(), EngineError> {
        state.touch();
        self.store
            .save(&state.thread_id, state)
            .await
            .map_err(|e| {
                tracing::error!(thread_id = %state.thread_id, error = %e, "checkpoint save failed");
                EngineError::from(e)
            })
    }

    /// 消费待审批：批准则执行全部调用，拒绝则为每个调用合成拒绝结果；控制权回到发起者
    async fn resolve_decision(&self, state: &mut ThreadState, decision: Decision) -> NodeRef {
        let Some(pending) = state.pending_approval.take() else {
            return NodeRef::Handler(state.active_handler().clone());
        };
        state.next_node = None;

        let approved = matches!(decision, Decision::Approve { .. });
        match decision {
            Decision::Approve { .. } => {
                tracing::info!(
                    thread_id = %state.thread_id,
                    approval_id = %pending.approval_id,
                    tools = ?pending.tool_names(),
                    "approval granted, executing tool calls"
                );
                self.execute_calls(state, &pending.tool_calls).await;
            }
            Decision::Reject { feedback, .. } => {
                tracing::info!(
                    thread_id = %state.thread_id,
                    approval_id = %pending.approval_id,
                    "approval rejected"
                );
                let text = denial_text(&feedback);
                for call in &pending.tool_calls {
                    state.append(Message::tool_result(&call.call_id, text.clone()));
                }
            }
        }

        send_event(
            &self.event_tx,
            EngineEvent::ApprovalResolved {
                thread_id: state.thread_id.clone(),
                approval_id: pending.approval_id.clone(),
                approved,
            },
        );
        NodeRef::Handler(pending.origin)
    }

    /// 主循环：直到无后续节点（完成）或下一节点为敏感工具（挂起）
    async fn run(
        &self,
        state: &mut ThreadState,
        start: NodeRef,
        mark: usize,
    ) -> Result<TurnOutcome, EngineError> {
        let mut next = Some(start);
        let mut steps = 0usize;

        while let Some(node) = next {
            if node == NodeRef::SensitiveTools {
                return self.suspend(state, mark).await;
            }
            if steps >= self.settings.max_steps_per_turn {
                self.stop_at_step_limit(state, steps);
                break;
            }
            steps += 1;

            tracing::debug!(thread_id = %state.thread_id, step = steps, node = %node.label(), "node");
            send_event(
                &self.event_tx,
                EngineEvent::NodeEntered {
                    thread_id: state.thread_id.clone(),
                    node: node.label(),
                },
            );
            next = self.run_node(state, node).await;
        }

        state.next_node = None;
        self.persist(state).await?;
        let messages = state.messages[mark..].to_vec();
        tracing::info!(
            thread_id = %state.thread_id,
            steps,
            appended = messages.len(),
            "turn complete"
        );
        self.finish(state, TurnStatus::Complete, messages.len());
        Ok(TurnOutcome {
            status: TurnStatus::Complete,
            messages,
            pending_approval: None,
        })
    }

    /// 执行单个节点，返回下一个节点
    async fn run_node(&self, state: &mut ThreadState, node: NodeRef) -> Option<NodeRef> {
        match node {
            NodeRef::Entry => {
                if state.context.is_none() {
                    match self.fetch_context(&state.thread_id).await {
                        Ok(context) => state.context = Some(context),
                        Err(e) => {
                            tracing::warn!(thread_id = %state.thread_id, error = %e, "context fetch failed, continuing without context");
                            self.report_fault(state, "entry", &NodeFault::ContextUnavailable(e));
                        }
                    }
                }
                if let Some(reason) = self.screen_input(state).await {
                    state.append(Message::assistant(refusal_text(&reason)));
                    return None;
                }
                Some(NodeRef::Handler(state.active_handler().clone()))
            }
            NodeRef::Handler(handler) => {
                self.run_handler(state, &handler).await;
                self.route(state)
            }
            NodeRef::EnterHandler(handler) => {
                tracing::info!(thread_id = %state.thread_id, handler = %handler, "delegating");
                state.dialog_stack.push(handler.clone());
                Some(NodeRef::Handler(handler))
            }
            NodeRef::LeaveHandler => {
                let left = state.dialog_stack.pop();
                tracing::info!(thread_id = %state.thread_id, left = ?left, "returning to {}", state.dialog_stack.top());
                Some(NodeRef::Handler(state.dialog_stack.top().clone()))
            }
            NodeRef::SafeTools => {
                let calls = pending_calls(state);
                self.execute_calls(state, &calls).await;
                self.route(state)
            }
            NodeRef::ReportError(reason) => {
                let fault = NodeFault::InvalidBatch(reason);
                self.report_fault(state, "report_error", &fault);
                let calls = pending_calls(state);
                for msg in self.recovery.tool_error_messages(&calls, &fault) {
                    state.append(msg);
                }
                Some(NodeRef::Handler(state.active_handler().clone()))
            }
            // 由 run 在进入前拦截
            NodeRef::SensitiveTools => None,
        }
    }

    fn route(&self, state: &ThreadState) -> Option<NodeRef> {
        route(state, self.executor.registry().as_ref(), &self.graph)
    }

    /// 助手节点：调用推理端，恰好追加一条 assistant 消息
    async fn run_handler(&self, state: &mut ThreadState, handler: &str) {
        let node = format!("handler:{handler}");
        let mut retries = 0usize;
        let mut nudge: Option<&str> = None;

        loop {
            let request = ReasoningRequest {
                thread_id: &state.thread_id,
                handler,
                messages: &state.messages,
                context: state.context.as_ref(),
                dialog_stack: &state.dialog_stack,
                nudge,
            };
            let result = timeout(self.settings.reasoning_timeout, self.reasoner.invoke(request)).await;

            let fault = match result {
                Ok(Ok(reply)) => {
                    let reply = normalize_reply(reply);
                    if !reply.is_empty_reply() {
                        state.append(reply);
                        return;
                    }
                    if retries < self.settings.empty_response_retries {
                        retries += 1;
                        tracing::debug!(handler, retries, "empty response, retrying with nudge");
                        nudge = Some(EMPTY_RESPONSE_NUDGE);
                        continue;
                    }
                    NodeFault::EmptyResponse(handler.to_string())
                }
                Ok(Err(ReasoningError::Unavailable(reason))) => NodeFault::ReasoningUnavailable(reason),
                Err(_) => {
                    NodeFault::ReasoningTimeout(self.settings.reasoning_timeout.as_millis() as u64)
                }
            };

            self.report_fault(state, &node, &fault);
            state.append(self.recovery.assistant_notice(&fault));
            return;
        }
    }

    /// 执行一批调用：每个调用恰好一条 tool 结果，故障不中断整批
    async fn execute_calls(&self, state: &mut ThreadState, calls: &[ToolCall]) {
        for call in calls {
            send_event(
                &self.event_tx,
                EngineEvent::ToolCall {
                    thread_id: state.thread_id.clone(),
                    call_id: call.call_id.clone(),
                    tool: call.tool_name.clone(),
                    args: call.arguments.clone(),
                },
            );
        }

        for outcome in self.executor.execute_batch(calls).await {
            if let Err(fault) = &outcome.result {
                self.report_fault(state, "tools", fault);
            }
            let msg = outcome.to_message(&self.recovery);
            send_event(
                &self.event_tx,
                EngineEvent::ToolResult {
                    thread_id: state.thread_id.clone(),
                    call_id: outcome.call_id.clone(),
                    tool: outcome.tool_name.clone(),
                    ok: outcome.result.is_ok(),
                    preview: preview(&msg.content),
                },
            );
            state.append(msg);
        }
    }

    /// 挂起：记录待审批（触发消息中的全部调用），持久化后返回
    async fn suspend(
        &self,
        state: &mut ThreadState,
        mark: usize,
    ) -> Result<TurnOutcome, EngineError> {
        let origin = state.active_handler().clone();
        let pending = PendingApproval::new(pending_calls(state), origin);
        state.pending_approval = Some(pending.clone());
        state.next_node = Some(NodeRef::SensitiveTools);
        self.persist(state).await?;

        tracing::info!(
            thread_id = %state.thread_id,
            approval_id = %pending.approval_id,
            origin = %pending.origin,
            tools = ?pending.tool_names(),
            "awaiting approval"
        );
        send_event(
            &self.event_tx,
            EngineEvent::ApprovalRequested {
                thread_id: state.thread_id.clone(),
                approval_id: pending.approval_id.clone(),
                origin: pending.origin.clone(),
                tools: pending.tool_names().into_iter().map(str::to_string).collect(),
            },
        );

        let messages = state.messages[mark..].to_vec();
        self.finish(state, TurnStatus::AwaitingApproval, messages.len());
        Ok(TurnOutcome {
            status: TurnStatus::AwaitingApproval,
            messages,
            pending_approval: Some(pending),
        })
    }

    /// 步数耗尽：补齐未回答的调用，再以一条 assistant 诊断结束本轮
    fn stop_at_step_limit(&self, state: &mut ThreadState, steps: usize) {
        let fault = NodeFault::StepLimitExceeded(steps);
        self.report_fault(state, "engine", &fault);
        let calls = pending_calls(state);
        for msg in self.recovery.tool_error_messages(&calls, &fault) {
            state.append(msg);
        }
        state.append(self.recovery.assistant_notice(&fault));
    }

    fn report_fault(&self, state: &ThreadState, node: &str, fault: &NodeFault) {
        tracing::warn!(thread_id = %state.thread_id, node, fault = %fault, "node fault");
        send_event(
            &self.event_tx,
            EngineEvent::NodeFault {
                thread_id: state.thread_id.clone(),
                node: node.to_string(),
                reason: fault.to_string(),
            },
        );
    }

    fn finish(&self, state: &ThreadState, status: TurnStatus, appended: usize) {
        send_event(
            &self.event_tx,
            EngineEvent::TurnFinished {
                thread_id: state.thread_id.clone(),
                status,
                appended,
            },
        );
    }
}

/// 最后一条 assistant 消息中尚未得到结果的调用
fn pending_calls(state: &ThreadState) -> Vec<ToolCall> {
    match state.last_message() {
        Some(msg) if msg.role == Role::Assistant => msg.tool_calls.clone(),
        _ => Vec::new(),
    }
}

/// 推理端输出统一为 assistant 消息，缺失的 call_id 补齐
fn normalize_reply(mut reply: Message) -> Message {
    reply.role = Role::Assistant;
    reply.tool_call_id = None;
    for call in &mut reply.tool_calls {
        if call.call_id.trim().is_empty() {
            call.call_id = ToolCall::new(call.tool_name.clone(), serde_json::Value::Null).call_id;
        }
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::llm::ScriptedReasoner;
    use crate::tools::{EchoTool, ToolSet};
    use crate::workflow::WorkflowBuilder;
    use std::time::Duration;

    fn engine(reasoner: Arc<ScriptedReasoner>, settings: EngineSettings) -> WorkflowEngine {
        let graph = WorkflowBuilder::new()
            .primary("primary", "Primary Assistant")
            .build()
            .unwrap();
        let mut tools = ToolSet::new();
        tools
            .register_safe(EchoTool::new())
            .register_sensitive(EchoTool::named("cancel_ticket"));
        WorkflowEngine::new(
            graph,
            reasoner,
            Arc::new(tools),
            Arc::new(MemoryCheckpointStore::new()),
            settings,
        )
    }

    #[test]
    fn test_denial_text_wording() {
        assert_eq!(
            denial_text("keep my seat"),
            "API call denied by user. Reasoning: 'keep my seat'. Continue assisting, accounting for the user's input."
        );
        assert!(!denial_text("  ").contains("Reasoning"));
    }

    #[test]
    fn test_normalize_fills_missing_call_ids() {
        let reply = Message::assistant_with_calls(
            "",
            vec![ToolCall::new("echo", serde_json::Value::Null).with_id("")],
        );
        let reply = normalize_reply(reply);
        assert!(reply.tool_calls[0].call_id.starts_with("call_"));
    }

    #[tokio::test]
    async fn test_empty_reply_retried_with_nudge() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner
            .push("primary", Message::assistant(""))
            .push("primary", Message::assistant("real answer"));
        let engine = engine(reasoner.clone(), EngineSettings::default());

        let outcome = engine.advance("t1", TurnInput::message("hi")).await.unwrap();
        assert_eq!(outcome.status, TurnStatus::Complete);
        assert_eq!(outcome.reply(), Some("real answer"));
        assert_eq!(outcome.messages.len(), 1);
        let calls = reasoner.calls();
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_deref(), Some(EMPTY_RESPONSE_NUDGE));
    }

    #[tokio::test]
    async fn test_empty_reply_gives_up_after_retries() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        for _ in 0..3 {
            reasoner.push("primary", Message::assistant(" "));
        }
        let engine = engine(reasoner.clone(), EngineSettings::default());

        let outcome = engine.advance("t1", TurnInput::message("hi")).await.unwrap();
        assert_eq!(reasoner.call_count("primary"), 3);
        assert_eq!(outcome.messages.len(), 1);
        assert!(outcome.messages[0].content.contains("produced no output"));
    }

    #[tokio::test]
    async fn test_step_limit_ends_turn() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        for _ in 0..10 {
            reasoner.push(
                "primary",
                Message::assistant_with_calls("", vec![ToolCall::new("echo", serde_json::json!({"text": "again"}))]),
            );
        }
        let settings = EngineSettings {
            max_steps_per_turn: 4,
            ..EngineSettings::default()
        };
        let engine = engine(reasoner, settings);

        let outcome = engine.advance("t1", TurnInput::message("loop")).await.unwrap();
        assert_eq!(outcome.status, TurnStatus::Complete);
        let last = outcome.messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("4 steps"));
        // 每个调用都有结果
        let state = engine.thread_state("t1").await.unwrap().unwrap();
        let calls: usize = state.messages.iter().map(|m| m.tool_calls.len()).sum();
        let results = state.messages.iter().filter(|m| m.role == Role::Tool).count();
        assert_eq!(calls, results);
        assert_eq!(state.next_node, None);
        assert!(state.pending_approval.is_none());
    }

    #[tokio::test]
    async fn test_reasoning_error_is_diagnostic() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner.push_delayed("primary", Duration::from_millis(200), Message::assistant("late"));
        let settings = EngineSettings {
            reasoning_timeout: Duration::from_millis(20),
            ..EngineSettings::default()
        };
        let engine = engine(reasoner, settings);

        let outcome = engine.advance("t1", TurnInput::message("hi")).await.unwrap();
        assert_eq!(outcome.status, TurnStatus::Complete);
        assert!(outcome.messages[0].content.contains("timed out after 20ms"));
        // 锁已释放，下一轮正常
        let next = engine.advance("t1", TurnInput::message("again")).await.unwrap();
        assert_eq!(next.reply(), Some("ok"));
    }

    #[tokio::test]
    async fn test_events_cover_suspend() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner.push(
            "primary",
            Message::assistant_with_calls("", vec![ToolCall::new("cancel_ticket", serde_json::Value::Null)]),
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let engine = engine(reasoner, EngineSettings::default()).with_event_tx(tx);

        let outcome = engine.advance("t1", TurnInput::message("cancel")).await.unwrap();
        assert_eq!(outcome.status, TurnStatus::AwaitingApproval);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(serde_json::to_value(&ev).unwrap()["type"].as_str().unwrap().to_string());
        }
        assert_eq!(kinds.first().map(String::as_str), Some("turn_started"));
        assert!(kinds.contains(&"approval_requested".to_string()));
        assert_eq!(kinds.last().map(String::as_str), Some("turn_finished"));
        assert!(!kinds.contains(&"tool_call".to_string()));
    }
}
