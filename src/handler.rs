//! 事件处理入口
//!
//! 单次调用的流程：去重 → 读取投递目标 → 分类 → Slack → topic。
//! 三种结局：
//! - 重复事件：返回 200 "Duplicate event ignored"，不投递
//! - 处理成功：返回 200 "Event processed successfully"
//! - 失败：记录完整错误链，对调用方只返回不透明的 `ProcessingError`

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::classifier::classify;
use crate::config::{AlertConfig, DeliveryTargets, ParameterStore};
use crate::dedup::DedupGuard;
use crate::event::RawEvent;
use crate::notification::DispatcherFactory;

pub const DUPLICATE_BODY: &str = "Duplicate event ignored";
pub const PROCESSED_BODY: &str = "Event processed successfully";

/// 处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    fn ok(body: &str) -> Self {
        Self {
            status_code: 200,
            body: body.to_string(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.body == DUPLICATE_BODY
    }
}

/// 对调用方不透明的失败，详细原因只写入日志
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot process event")]
pub struct ProcessingError;

/// 事件处理器
pub struct EventHandler {
    guard: DedupGuard,
    parameters: Box<dyn ParameterStore>,
    dispatchers: Box<dyn DispatcherFactory>,
    config: AlertConfig,
}

impl EventHandler {
    pub fn new(
        guard: DedupGuard,
        parameters: Box<dyn ParameterStore>,
        dispatchers: Box<dyn DispatcherFactory>,
        config: AlertConfig,
    ) -> Self {
        Self {
            guard,
            parameters,
            dispatchers,
            config,
        }
    }

    /// 处理一个事件
    pub fn handle(&self, event: &RawEvent) -> Result<HandlerResponse, ProcessingError> {
        self.process(event).map_err(|e| {
            error!(error = ?e, "Exception hit in event handler");
            ProcessingError
        })
    }

    fn process(&self, event: &RawEvent) -> Result<HandlerResponse> {
        if !self.guard.should_process(event) {
            return Ok(HandlerResponse::ok(DUPLICATE_BODY));
        }

        let targets = DeliveryTargets::load(self.parameters.as_ref(), &self.config)
            .context("Failed to retrieve configuration parameters")?;
        info!("Retrieved configuration parameters successfully");

        let classified = classify(event);
        info!(event_name = %classified.event_name, "Processed event");

        let dispatcher = self
            .dispatchers
            .build(&targets)
            .context("Failed to configure notification channels")?;
        dispatcher
            .deliver(&classified)
            .context("Failed to deliver notification")?;

        Ok(HandlerResponse::ok(PROCESSED_BODY))
    }
}
