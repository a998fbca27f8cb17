//! 检查点存储抽象层
//!
//! 定义统一的 ThreadState 存取接口（按线程原子地 load / save），支持内存和 SQLite 两种实现。
//! 存储本身只保证按 key 原子；同一线程的串行化由引擎的线程锁负责。

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{CheckpointBackend, CheckpointSection};
use crate::core::ThreadState;

pub use memory::MemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// 持久化故障：对调用方致命，原样传播
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckpointError {
    #[error("Checkpoint store unavailable: {0}")]
    Unavailable(String),

    #[error("Checkpoint write failed: {0}")]
    WriteFailed(String),

    #[error("Checkpoint (de)serialization failed: {0}")]
    Serialization(String),
}

/// 检查点存储接口
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// 读取线程快照；不存在时返回 None
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadState>, CheckpointError>;

    /// 整体替换线程快照
    async fn save(&self, thread_id: &str, state: &ThreadState) -> Result<(), CheckpointError>;
}

/// 创建检查点存储
///
/// backend = sqlite 时打开 sqlite_path；打开失败则告警并回退到内存存储
pub fn create_checkpoint_store(section: &CheckpointSection) -> Arc<dyn CheckpointStore> {
    if section.backend == CheckpointBackend::Sqlite {
        match SqliteCheckpointStore::new(&section.sqlite_path) {
            Ok(store) => {
                tracing::info!("Using SQLite checkpoint store: {:?}", section.sqlite_path);
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("Failed to open SQLite checkpoint store, falling back to memory: {}", e);
            }
        }
    }

    tracing::info!("Using in-memory checkpoint store");
    Arc::new(MemoryCheckpointStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_uses_sqlite_when_configured() {
        let dir = tempfile::TempDir::new().unwrap();
        let section = CheckpointSection {
            backend: CheckpointBackend::Sqlite,
            sqlite_path: dir.path().join("nested").join("cp.db"),
        };
        let store = create_checkpoint_store(&section);
        let state = ThreadState::new("t1", "primary");
        store.save("t1", &state).await.unwrap();
        assert!(section.sqlite_path.exists());
        assert_eq!(store.load("t1").await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_factory_defaults_to_memory() {
        let store = create_checkpoint_store(&CheckpointSection::default());
        assert_eq!(store.load("missing").await.unwrap(), None);
    }
}
