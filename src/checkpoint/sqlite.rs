//! SQLite 检查点存储
//!
//! 每个线程一行（thread_id 主键，state 为 JSON），save 用 upsert 保证按 key 原子。
//! 每次调用在 spawn_blocking 中打开独立连接，WAL 模式下不同线程的读写互不阻塞。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{CheckpointError, CheckpointStore};
use crate::core::ThreadState;

/// SQLite 持久化检查点
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    path: PathBuf,
}

impl SqliteCheckpointStore {
    /// 打开（或创建）数据库并初始化表；父目录不存在时自动创建
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CheckpointError::Unavailable(e.to_string()))?;
            }
        }
        let conn = open(&path).map_err(unavailable)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(unavailable)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                version INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(unavailable)?;
        Ok(Self { path })
    }
}

fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

fn unavailable(e: rusqlite::Error) -> CheckpointError {
    CheckpointError::Unavailable(e.to_string())
}

async fn run_blocking<T, F>(f: F) -> Result<T, CheckpointError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CheckpointError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CheckpointError::Unavailable(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadState>, CheckpointError> {
        let path = self.path.clone();
        let id = thread_id.to_string();
        let raw = run_blocking(move || {
            let conn = open(&path).map_err(unavailable)?;
            conn.query_row(
                "SELECT state FROM checkpoints WHERE thread_id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(unavailable)
        })
        .await?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| CheckpointError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn save(&self, thread_id: &str, state: &ThreadState) -> Result<(), CheckpointError> {
        let json =
            serde_json::to_string(state).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let path = self.path.clone();
        let id = thread_id.to_string();
        let version = state.version as i64;
        let updated_at = state.updated_at.to_rfc3339();
        run_blocking(move || {
            let conn = open(&path).map_err(unavailable)?;
            conn.execute(
                "INSERT INTO checkpoints (thread_id, state, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(thread_id) DO UPDATE SET
                    state = excluded.state,
                    version = excluded.version,
                    updated_at = excluded.updated_at",
                params![id, json, version, updated_at],
            )
            .map_err(|e| CheckpointError::WriteFailed(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
