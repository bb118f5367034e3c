//! 通知抽象层 - 统一管理聊天与 pub/sub 两类投递渠道
//!
//! # 设计目标
//! 1. 统一接口：所有渠道实现 `NotificationChannel` trait
//! 2. 失败策略按渠道配置：聊天渠道失败只记录日志，topic 失败中止调用
//! 3. 同步阻塞发送，按注册顺序执行
//!
//! # 使用示例
//! ```ignore
//! use std::sync::Arc;
//! use trail_notifier::notification::{FailurePolicy, NotificationDispatcher, NotificationMessage};
//! use trail_notifier::notification::channels::SlackWebhookChannel;
//!
//! let mut dispatcher = NotificationDispatcher::new();
//! dispatcher.register_channel(
//!     Arc::new(SlackWebhookChannel::new(webhook_url, 10_000)?),
//!     FailurePolicy::Swallow,
//! );
//! dispatcher.send_sync(&NotificationMessage::new("CreateBucket", summary))?;
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod dispatcher;

pub use channel::{FailurePolicy, NotificationChannel, NotificationMessage, SendResult};
pub use dispatcher::NotificationDispatcher;
pub use builder::{DispatcherFactory, NotificationBuilder, TopicBackend};
