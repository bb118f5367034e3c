//! 具体渠道实现

pub mod slack;
pub mod topic;

pub use slack::SlackWebhookChannel;
pub use topic::{FileTopicPublisher, HttpTopicPublisher, PublishedRecord, TopicChannel, TopicPublisher};
