//! Pub/sub topic 渠道
//!
//! `TopicChannel` 把消息以 `(topic, subject, message)` 的形式交给 `TopicPublisher`。
//! 内置两种发布器：
//! - `HttpTopicPublisher`：POST 到 pub/sub 网关
//! - `FileTopicPublisher`：追加写入本地 JSONL 文件

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::notification::channel::{NotificationChannel, NotificationMessage, SendResult};

/// Pub/sub 发布器，成功时返回消息 ID
pub trait TopicPublisher: Send + Sync {
    fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<String>;
}

/// 发布请求
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    topic: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// 发布响应
#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(alias = "MessageId", alias = "messageId")]
    message_id: String,
}

/// HTTP pub/sub 网关发布器
pub struct HttpTopicPublisher {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpTopicPublisher {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| anyhow!("Cannot create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl TopicPublisher for HttpTopicPublisher {
    fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PublishRequest {
                topic,
                subject,
                message,
            })
            .send()
            .map_err(|e| anyhow!("Publish request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| anyhow!("Failed to read publish response: {}", e))?;

        if !status.is_success() {
            bail!("Publish rejected ({}): {}", status, body);
        }

        let parsed: PublishResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse publish response: {} - body: {}", e, body))?;
        Ok(parsed.message_id)
    }
}

/// 本地文件中的一条发布记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub ts: DateTime<Utc>,
    pub message_id: String,
    pub topic: String,
    pub subject: String,
    pub message: String,
}

/// 本地 JSONL 文件发布器
pub struct FileTopicPublisher {
    path: PathBuf,
}

impl FileTopicPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 读取全部记录，跳过无法解析的行
    pub fn read_all(&self) -> Result<Vec<PublishedRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read {}", self.path.display()))?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl TopicPublisher for FileTopicPublisher {
    fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<String> {
        let ts = Utc::now();
        let message_id = message_id(&ts, topic, subject, message);
        let record = PublishedRecord {
            ts,
            message_id: message_id.clone(),
            topic: topic.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open {}", self.path.display()))?;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;

        debug!(path = %self.path.display(), "Publish record appended");
        Ok(message_id)
    }
}

/// 基于时间戳和内容生成 16 位十六进制消息 ID
fn message_id(ts: &DateTime<Utc>, topic: &str, subject: &str, message: &str) -> String {
    let mut hasher = DefaultHasher::new();
    ts.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
    topic.hash(&mut hasher);
    subject.hash(&mut hasher);
    message.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Pub/sub topic 渠道
pub struct TopicChannel {
    topic: String,
    publisher: Box<dyn TopicPublisher>,
}

impl TopicChannel {
    pub fn new(topic: impl Into<String>, publisher: Box<dyn TopicPublisher>) -> Self {
        Self {
            topic: topic.into(),
            publisher,
        }
    }
}

impl NotificationChannel for TopicChannel {
    fn name(&self) -> &str {
        "topic"
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        info!(channel = "topic", subject = %message.subject, "Publishing to topic");

        match self.publisher.publish(&self.topic, &message.subject, &message.body) {
            Ok(message_id) => {
                info!(channel = "topic", message_id = %message_id, "Topic message published successfully");
                Ok(SendResult::Sent)
            }
            Err(e) => {
                error!(channel = "topic", error = %e, "Failed to publish to topic");
                Err(e)
            }
        }
    }
}
