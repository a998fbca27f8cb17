//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__ENGINE__LOCK_POLICY=fail_fast`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineSection,
    pub checkpoint: CheckpointSection,
    pub guard: GuardSection,
    /// [[handlers]]：演示程序据此构建助手图
    pub handlers: Vec<HandlerSection>,
}

/// [engine] 段：超时、步数上限、线程锁策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// 单次推理调用超时（秒）
    pub reasoning_timeout_secs: u64,
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    /// 获取线程上下文的超时（秒）
    pub context_timeout_secs: u64,
    /// 单次 advance 内最多执行的节点数
    pub max_steps_per_turn: usize,
    /// 助手空回复时的重试次数
    pub empty_response_retries: usize,
    pub lock_policy: LockPolicy,
    /// lock_policy = wait 时最长等待（毫秒）
    pub lock_wait_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            reasoning_timeout_secs: 60,
            tool_timeout_secs: 30,
            context_timeout_secs: 10,
            max_steps_per_turn: 25,
            empty_response_retries: 2,
            lock_policy: LockPolicy::Wait,
            lock_wait_ms: 5000,
        }
    }
}

/// 同一线程并发 advance 时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// 排队等待，超过 lock_wait_ms 返回 ThreadBusy
    #[default]
    Wait,
    /// 立即返回 ThreadBusy
    FailFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    #[default]
    Memory,
    Sqlite,
}

/// [checkpoint] 段：存储后端
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointSection {
    pub backend: CheckpointBackend,
    pub sqlite_path: PathBuf,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::Memory,
            sqlite_path: PathBuf::from("data/checkpoints.db"),
        }
    }
}

/// [guard] 段：包含任一关键词的用户输入直接拒绝；为空表示不启用
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GuardSection {
    pub keywords: Vec<String>,
}

/// [[handlers]] 项：助手 ID、显示名、可用工具（为空表示不限制）
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerSection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// 引擎运行参数（由 [engine] 段换算而来）
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub reasoning_timeout: Duration,
    pub tool_timeout: Duration,
    pub context_timeout: Duration,
    pub max_steps_per_turn: usize,
    pub empty_response_retries: usize,
    pub lock_policy: LockPolicy,
    pub lock_wait: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSection::default().into()
    }
}

impl From<EngineSection> for EngineSettings {
    fn from(section: EngineSection) -> Self {
        Self {
            reasoning_timeout: Duration::from_secs(section.reasoning_timeout_secs),
            tool_timeout: Duration::from_secs(section.tool_timeout_secs),
            context_timeout: Duration::from_secs(section.context_timeout_secs),
            max_steps_per_turn: section.max_steps_per_turn.max(1),
            empty_response_retries: section.empty_response_retries,
            lock_policy: section.lock_policy,
            lock_wait: Duration::from_millis(section.lock_wait_ms),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
