//! 通知分发器 - 按注册顺序把消息发送到各渠道

use super::channel::{FailurePolicy, NotificationChannel, NotificationMessage, SendResult};
use crate::classifier::ClassifiedEvent;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 通知分发器
///
/// 每个渠道注册时带一个 `FailurePolicy`：`Swallow` 的渠道失败只记录日志，
/// `Propagate` 的渠道失败会中止分发并返回错误。已经成功的渠道不会回滚。
pub struct NotificationDispatcher {
    /// 所有注册的渠道（按发送顺序）
    channels: Vec<(Arc<dyn NotificationChannel>, FailurePolicy)>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>, policy: FailurePolicy) {
        info!(channel = channel.name(), policy = ?policy, "Registering notification channel");
        self.channels.push((channel, policy));
    }

    /// 按顺序发送到所有渠道
    pub fn send_sync(&self, message: &NotificationMessage) -> Result<Vec<(String, SendResult)>> {
        let mut results = Vec::new();

        for (channel, policy) in &self.channels {
            let name = channel.name().to_string();

            if self.dry_run {
                eprintln!("[DRY-RUN] Would send to channel {}: {}", name, message.chat_text());
                results.push((name, SendResult::Skipped("dry-run".to_string())));
                continue;
            }

            let failure = match channel.send(message) {
                Ok(SendResult::Failed(reason)) => reason,
                Ok(result) => {
                    results.push((name, result));
                    continue;
                }
                Err(e) => format!("{:#}", e),
            };

            match policy {
                FailurePolicy::Swallow => {
                    warn!(channel = %name, error = %failure, "Channel send failed, continuing");
                    results.push((name, SendResult::Failed(failure)));
                }
                FailurePolicy::Propagate => {
                    error!(channel = %name, error = %failure, "Channel send failed");
                    return Err(anyhow!("Channel {} failed: {}", name, failure));
                }
            }
        }

        Ok(results)
    }

    /// 发送一个已分类的事件
    pub fn deliver(&self, event: &ClassifiedEvent) -> Result<Vec<(String, SendResult)>> {
        self.send_sync(&NotificationMessage::from(event))
    }

    /// 获取已注册的渠道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 获取已注册的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|(c, _)| c.name()).collect()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
