//! Slack Webhook 渠道 - 通过 incoming webhook 发送聊天消息

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

use crate::notification::channel::{NotificationChannel, NotificationMessage, SendResult};

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Slack Webhook 渠道
pub struct SlackWebhookChannel {
    client: reqwest::blocking::Client,
    /// Webhook 地址（敏感，不写入日志）
    webhook_url: String,
}

impl SlackWebhookChannel {
    pub fn new(webhook_url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| anyhow!("Cannot create HTTP client: {}", e))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

impl NotificationChannel for SlackWebhookChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult> {
        let text = message.chat_text();
        info!(channel = "slack", subject = %message.subject, "Sending Slack message");

        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .json(&WebhookPayload { text: &text })
            .send()
            .map_err(|e| {
                // reqwest 错误里带有 URL，去掉后再输出
                let e = e.without_url();
                error!(channel = "slack", error = %e, "Request failed");
                anyhow!("Slack request failed: {}", e)
            })?;

        let status = response.status();
        if status.is_success() {
            info!(channel = "slack", status = status.as_u16(), "Slack message sent successfully");
            Ok(SendResult::Sent)
        } else {
            let reason = status.canonical_reason().unwrap_or("unknown");
            error!(
                channel = "slack",
                status = status.as_u16(),
                reason = reason,
                "HTTP error sending Slack message"
            );
            Ok(SendResult::Failed(format!("HTTP {} - {}", status.as_u16(), reason)))
        }
    }
}
