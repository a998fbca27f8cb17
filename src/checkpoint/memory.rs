//! 内存检查点存储
//!
//! 固定数量的分片，每片一把 RwLock；线程 ID 哈希到分片，不同线程不会竞争同一把全局锁。

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CheckpointError, CheckpointStore};
use crate::core::{ThreadId, ThreadState};

const DEFAULT_SHARDS: usize = 16;

/// 分片内存存储，保存完整快照
pub struct MemoryCheckpointStore {
    shards: Vec<RwLock<HashMap<ThreadId, ThreadState>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1)).map(|_| RwLock::new(HashMap::new())).collect();
        Self { shards }
    }

    fn shard(&self, thread_id: &str) -> &RwLock<HashMap<ThreadId, ThreadState>> {
        let mut hasher = DefaultHasher::new();
        thread_id.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// 已保存的线程数
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadState>, CheckpointError> {
        Ok(self.shard(thread_id).read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, state: &ThreadState) -> Result<(), CheckpointError> {
        self.shard(thread_id)
            .write()
            .await
            .insert(thread_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;

    #[tokio::test]
    async fn test_save_replaces_snapshot() {
        let store = MemoryCheckpointStore::new();
        let mut state = ThreadState::new("t1", "primary");
        store.save("t1", &state).await.unwrap();

        state.append(Message::user("hello"));
        store.save("t1", &state).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_loaded_copy_is_detached() {
        let store = MemoryCheckpointStore::with_shards(2);
        store.save("t1", &ThreadState::new("t1", "primary")).await.unwrap();

        let mut copy = store.load("t1").await.unwrap().unwrap();
        copy.append(Message::user("not saved"));

        assert!(store.load("t1").await.unwrap().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_threads_do_not_interfere() {
        let store = std::sync::Arc::new(MemoryCheckpointStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("thread-{i}");
                let mut state = ThreadState::new(&id, "primary");
                state.append(Message::user(id.clone()));
                store.save(&id, &state).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.len().await, 32);
        let loaded = store.load("thread-7").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "thread-7");
    }
}
