//! Trail Notifier - 把云审计事件转发到聊天 webhook 和 pub/sub topic

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod event;
pub mod handler;
pub mod notification;

pub use classifier::{classify, ClassifiedEvent, EventKind, UNKNOWN_EVENT};
pub use config::{
    AlertConfig, DeliveryTargets, EnvParameterStore, JsonFileParameterStore, LayeredParameterStore,
    ParameterStore,
};
pub use dedup::{DedupGuard, DedupKey, InMemorySeenEvents, SeenEventStore};
pub use event::RawEvent;
pub use handler::{EventHandler, HandlerResponse, ProcessingError};
pub use notification::{
    FailurePolicy, NotificationBuilder, NotificationChannel, NotificationDispatcher,
    NotificationMessage, SendResult, TopicBackend,
};
