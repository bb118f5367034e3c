//! 通知系统构建器 - 根据投递目标配置渠道

use super::channel::FailurePolicy;
use super::channels::{FileTopicPublisher, HttpTopicPublisher, SlackWebhookChannel, TopicChannel, TopicPublisher};
use super::dispatcher::NotificationDispatcher;
use crate::config::{AlertConfig, DeliveryTargets};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Topic 发布后端
#[derive(Debug, Clone, PartialEq)]
pub enum TopicBackend {
    /// POST 到 pub/sub 网关
    Http { endpoint: String },
    /// 追加到本地 JSONL 文件
    File { path: PathBuf },
}

impl Default for TopicBackend {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("trail-notifier/topic.jsonl");
        Self::File { path }
    }
}

/// 通知系统构建器
///
/// 固定注册两个渠道：先 Slack（失败只记录），后 topic（失败中止）。
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    timeout_ms: u64,
    dry_run: bool,
    topic_backend: TopicBackend,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        let config = AlertConfig::default();
        Self {
            timeout_ms: config.timeout_ms,
            dry_run: config.dry_run,
            topic_backend: TopicBackend::default(),
        }
    }

    /// 使用运行配置中的超时和 dry-run 设置
    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new().timeout_ms(config.timeout_ms).dry_run(config.dry_run)
    }

    /// 设置 HTTP 超时（毫秒）
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 设置 topic 发布后端
    pub fn topic_backend(mut self, backend: TopicBackend) -> Self {
        self.topic_backend = backend;
        self
    }

    fn publisher(&self) -> Result<Box<dyn TopicPublisher>> {
        Ok(match &self.topic_backend {
            TopicBackend::Http { endpoint } => {
                Box::new(HttpTopicPublisher::new(endpoint.clone(), self.timeout_ms)?)
            }
            TopicBackend::File { path } => Box::new(FileTopicPublisher::new(path.clone())),
        })
    }

    /// 构建 NotificationDispatcher
    pub fn build(&self, targets: &DeliveryTargets) -> Result<NotificationDispatcher> {
        let mut dispatcher = NotificationDispatcher::new().with_dry_run(self.dry_run);

        let slack = SlackWebhookChannel::new(targets.webhook_url.clone(), self.timeout_ms)?;
        dispatcher.register_channel(Arc::new(slack), FailurePolicy::Swallow);

        let topic = TopicChannel::new(targets.topic.clone(), self.publisher()?);
        dispatcher.register_channel(Arc::new(topic), FailurePolicy::Propagate);

        info!(
            topic = %targets.topic,
            backend = ?self.topic_backend,
            dry_run = self.dry_run,
            "Notification channels configured"
        );
        Ok(dispatcher)
    }
}

impl Default for NotificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 按投递目标构建分发器（每次调用一次）
pub trait DispatcherFactory: Send + Sync {
    fn build(&self, targets: &DeliveryTargets) -> Result<NotificationDispatcher>;
}

impl DispatcherFactory for NotificationBuilder {
    fn build(&self, targets: &DeliveryTargets) -> Result<NotificationDispatcher> {
        NotificationBuilder::build(self, targets)
    }
}
