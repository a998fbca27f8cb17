//! 线程锁表
//!
//! 每个 thread_id 一把 tokio Mutex，保证同一线程的 advance 严格串行；不同线程互不影响。
//! 表项在无人持有、无人等待时移除。守卫在 Drop 时释放，包括 advance future 被取消的情况。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::LockPolicy;
use crate::core::{EngineError, ThreadId};

type LockTable = Arc<StdMutex<HashMap<ThreadId, Arc<Mutex<()>>>>>;

/// 线程锁表
pub struct ThreadLocks {
    table: LockTable,
    policy: LockPolicy,
    wait: Duration,
}

impl ThreadLocks {
    pub fn new(policy: LockPolicy, wait: Duration) -> Self {
        Self {
            table: Arc::new(StdMutex::new(HashMap::new())),
            policy,
            wait,
        }
    }

    /// 获取线程锁；fail_fast 立即失败，wait 最多等待 wait 时长
    pub async fn acquire(&self, thread_id: &str) -> Result<ThreadLockGuard, EngineError> {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        // 先构造守卫：获取失败或被取消时同样会清理表项
        let mut guard = ThreadLockGuard {
            table: self.table.clone(),
            thread_id: thread_id.to_string(),
            mutex: Some(mutex.clone()),
            held: None,
        };

        let held = match self.policy {
            LockPolicy::FailFast => mutex
                .try_lock_owned()
                .map_err(|_| EngineError::ThreadBusy(thread_id.to_string()))?,
            LockPolicy::Wait => tokio::time::timeout(self.wait, mutex.lock_owned())
                .await
                .map_err(|_| EngineError::ThreadBusy(thread_id.to_string()))?,
        };
        guard.held = Some(held);
        Ok(guard)
    }

    /// 该线程是否有 advance 正在持有或等待锁
    pub fn is_active(&self, thread_id: &str) -> bool {
        self.table
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(thread_id)
    }

    /// 当前表项数（持有或等待中的线程）
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 线程锁守卫
pub struct ThreadLockGuard {
    table: LockTable,
    thread_id: ThreadId,
    mutex: Option<Arc<Mutex<()>>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for ThreadLockGuard {
    fn drop(&mut self) {
        self.held.take();
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        self.mutex.take();
        // 克隆只发生在表锁内，此时计数为 1 说明只剩表本身引用
        if table
            .get(&self.thread_id)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            table.remove(&self.thread_id);
        }
    }
}
