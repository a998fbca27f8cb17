//! 线程上下文获取（外部协作方）
//!
//! 入口节点在上下文缺失时调用一次；之后只有显式 refresh_context 才会重新获取。

use async_trait::async_trait;
use serde_json::Value;

use crate::core::Context;

/// 上下文提供者：按线程获取慢变化的辅助数据
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn fetch(&self, thread_id: &str) -> Result<Context, String>;
}

/// 不提供任何上下文（data 为 null）
#[derive(Debug, Default)]
pub struct NoContext;

#[async_trait]
impl ContextProvider for NoContext {
    async fn fetch(&self, _thread_id: &str) -> Result<Context, String> {
        Ok(Context::new(Value::Null))
    }
}

/// 固定上下文：所有线程返回同一份数据（演示与测试用）
#[derive(Debug, Clone)]
pub struct StaticContext {
    data: Value,
}

impl StaticContext {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    async fn fetch(&self, _thread_id: &str) -> Result<Context, String> {
        Ok(Context::new(self.data.clone()))
    }
}
