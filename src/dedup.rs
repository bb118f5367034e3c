//! 事件去重
//!
//! 同一事件可能被投递多次（上游重试）。`DedupGuard` 根据 `(id, time, eventName)`
//! 生成去重键，并通过注入的 `SeenEventStore` 判断是否已经处理过。
//!
//! ## 局限
//! 默认的 `InMemorySeenEvents` 只在当前进程内有效：不过期、不限容量、
//! 进程重启即丢失。去重只是尽力而为的优化，不是正确性保证。
//! 需要跨进程去重时，实现一个基于外部存储（带 TTL）的 `SeenEventStore` 即可。

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::event::RawEvent;

/// 去重键：`"{id}_{time}_{eventName}"`，缺失部分用空字符串代替
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn from_event(event: &RawEvent) -> Self {
        let id = event.id.as_deref().unwrap_or("");
        let time = event.time.as_deref().unwrap_or("");
        // eventName 不是字符串时使用其 JSON 文本
        let event_name = match event.detail.as_ref().and_then(|d| d.get("eventName")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self(format!("{}_{}_{}", id, time, event_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "这个键是否见过" 的能力
pub trait SeenEventStore: Send + Sync {
    /// 若键未见过则记录并返回 `true`；已见过返回 `false`
    fn check_and_record(&self, key: &DedupKey) -> bool;

    /// 只查询，不记录
    fn contains(&self, key: &DedupKey) -> bool;
}

/// 进程内的已处理事件集合
#[derive(Default)]
pub struct InMemorySeenEvents {
    seen: Mutex<HashSet<DedupKey>>,
}

impl InMemorySeenEvents {
    pub fn new() -> Self {
        Self::default()
    }

    // 锁中毒时仍然使用内部数据：集合只增不减，不存在半更新状态
    fn lock(&self) -> MutexGuard<'_, HashSet<DedupKey>> {
        match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 已记录的键数量
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SeenEventStore for InMemorySeenEvents {
    fn check_and_record(&self, key: &DedupKey) -> bool {
        self.lock().insert(key.clone())
    }

    fn contains(&self, key: &DedupKey) -> bool {
        self.lock().contains(key)
    }
}

/// 去重守卫
pub struct DedupGuard {
    store: Box<dyn SeenEventStore>,
}

impl DedupGuard {
    pub fn new(store: Box<dyn SeenEventStore>) -> Self {
        Self { store }
    }

    /// 使用进程内集合
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemorySeenEvents::new()))
    }

    /// 返回 `true` 表示应该处理（并已记录），`false` 表示重复事件
    pub fn should_process(&self, event: &RawEvent) -> bool {
        let key = DedupKey::from_event(event);
        if self.store.check_and_record(&key) {
            debug!(key = %key, "Recorded new event key");
            true
        } else {
            info!(key = %key, "Duplicate event detected, skipping");
            false
        }
    }
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::in_memory()
    }
}
