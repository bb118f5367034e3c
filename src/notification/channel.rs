//! 通知渠道 trait 定义

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifiedEvent;

/// 通知消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// 主题（事件名）
    pub subject: String,
    /// 正文（事件摘要）
    pub body: String,
}

impl NotificationMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// 聊天消息文本：`"{subject}: {body}"`
    pub fn chat_text(&self) -> String {
        format!("{}: {}", self.subject, self.body)
    }
}

impl From<&ClassifiedEvent> for NotificationMessage {
    fn from(event: &ClassifiedEvent) -> Self {
        Self::new(event.event_name.clone(), event.summary.clone())
    }
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（dry-run 等）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

/// 渠道失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 记录日志后继续
    Swallow,
    /// 记录日志后中止本次分发
    Propagate,
}

/// 通知渠道 trait
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 同步发送消息
    fn send(&self, message: &NotificationMessage) -> Result<SendResult>;
}
