//! Hive 控制台演示
//!
//! 入口：初始化日志、加载配置、构建助手图与工具集，然后在单个线程上读取标准输入驱动引擎。
//! 使用规则 MockReasoner：输入 `!工具名 {json}` 即让当前助手发起该调用，
//! 敏感调用会挂起，用 /approve 或 /reject <理由> 恢复。

use std::sync::Arc;

use anyhow::Context;
use hive::checkpoint::create_checkpoint_store;
use hive::config::{load_config, EngineSettings};
use hive::core::KeywordGuard;
use hive::llm::MockReasoner;
use hive::tools::{EchoTool, ToolSet, COMPLETE_OR_ESCALATE};
use hive::workflow::{
    Decision, TurnInput, TurnOutcome, TurnStatus, WorkflowBuilder, WorkflowEngine, WorkflowGraph,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /approve, /reject <feedback>, /pending, /status, /tools, /quit\n\
Tool calls: !echo {\"text\": \"hi\"}, !ToBookingAssistant, !update_booking {\"seat\": \"12A\"}, !CompleteOrEscalate";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let graph = if cfg.handlers.is_empty() {
        default_graph()?
    } else {
        WorkflowBuilder::from_config(&cfg.handlers)
            .build()
            .context("Invalid [[handlers]] configuration")?
    };

    let mut tools = ToolSet::new();
    tools
        .register_safe(EchoTool::new())
        .register_sensitive(EchoTool::named("update_booking"))
        .register_delegation(
            "ToBookingAssistant",
            "booking",
            "Transfer the conversation to the booking assistant for changes to a reservation.",
        )
        .register_leave(COMPLETE_OR_ESCALATE);
    let tool_list = tools.tool_descriptions();

    let store = create_checkpoint_store(&cfg.checkpoint);
    let settings: EngineSettings = cfg.engine.into();
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut engine = WorkflowEngine::new(
        graph,
        Arc::new(MockReasoner),
        Arc::new(tools),
        store,
        settings,
    )
    .with_event_tx(event_tx);
    if !cfg.guard.keywords.is_empty() {
        engine = engine.with_input_guard(Arc::new(KeywordGuard::new(cfg.guard.keywords)));
    }

    tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&ev) {
                tracing::debug!(event = %json, "engine");
            }
        }
    });

    let thread_id = std::env::var("HIVE_THREAD").unwrap_or_else(|_| "console".to_string());
    println!("hive console (thread {thread_id})\n{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let input = match line {
            "/quit" => break,
            "/help" => {
                println!("{HELP}");
                continue;
            }
            "/tools" => {
                for (name, description) in &tool_list {
                    println!("{name}: {description}");
                }
                continue;
            }
            "/status" => {
                println!("{:?}", engine.thread_phase(&thread_id).await?);
                continue;
            }
            "/pending" => {
                match engine.peek_pending_approval(&thread_id).await? {
                    Some(p) => println!(
                        "pending {} from {}: {:?}",
                        p.approval_id,
                        p.origin,
                        p.tool_names()
                    ),
                    None => println!("no pending approval"),
                }
                continue;
            }
            "/approve" => TurnInput::Decision(Decision::approve()),
            _ => match line.strip_prefix("/reject") {
                Some(feedback) => TurnInput::Decision(Decision::reject(feedback.trim())),
                None => TurnInput::message(line),
            },
        };

        match engine.advance(&thread_id, input).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) if e.is_protocol_violation() => println!("! {e}"),
            Err(e) => return Err(e).context("Engine failure"),
        }
    }

    Ok(())
}

fn default_graph() -> anyhow::Result<WorkflowGraph> {
    let graph = WorkflowBuilder::new()
        .primary("primary", "Primary Assistant")
        .handler("booking", "Booking Assistant")
        .tools("booking", ["echo", "update_booking", COMPLETE_OR_ESCALATE])
        .build()?;
    Ok(graph)
}

fn print_outcome(outcome: &TurnOutcome) {
    for msg in &outcome.messages {
        if !msg.content.is_empty() {
            println!("[{:?}] {}", msg.role, msg.content);
        }
        for call in &msg.tool_calls {
            println!("  -> {} {}", call.tool_name, call.arguments);
        }
    }
    if outcome.status == TurnStatus::AwaitingApproval {
        if let Some(p) = &outcome.pending_approval {
            println!(
                "Awaiting approval for {:?} (requested by {}). /approve or /reject <feedback>",
                p.tool_names(),
                p.origin
            );
        }
    }
}
