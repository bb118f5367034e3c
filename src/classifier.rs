//! 事件分类器
//!
//! 把审计事件映射为 `(event_name, summary)`。已知事件名在固定的
//! [`EventKind`] 表中查找，每种事件知道自己读取哪些字段、输出什么句子；
//! 其它事件使用整个 `detail` 的紧凑 JSON。
//!
//! ## 降级规则
//! 分类从不失败：
//! - 字段缺失 → `Unknown`
//! - 引用的容器是数组（没有键可读）→ "Event X occurred but some details are missing"
//! - 引用的容器是字符串/数字/布尔值 → 整条原始事件的 JSON

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::event::{is_blank, lookup, Lookup, RawEvent};

/// 记录中没有可用 `detail.eventName` 时使用的事件名
pub const UNKNOWN_EVENT: &str = "UNKNOWN EVENT";

/// 缺失字段的替代值
pub const UNKNOWN_FIELD: &str = "Unknown";

const BUCKET_NAME: &[&str] = &["requestParameters", "bucketName"];
const USER_NAME: &[&str] = &["requestParameters", "userName"];
const ROLE_NAME: &[&str] = &["requestParameters", "roleName"];
const REQUEST_ACCESS_KEY_ID: &[&str] = &["requestParameters", "accessKeyId"];
const RESPONSE_ACCESS_KEY_ID: &[&str] = &["responseElements", "accessKey", "accessKeyId"];
const IDENTITY_TYPE: &[&str] = &["userIdentity", "type"];
const IDENTITY_ARN: &[&str] = &["userIdentity", "arn"];
const SOURCE_IP: &[&str] = &["sourceIPAddress"];

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEvent {
    pub event_name: String,
    pub summary: String,
}

impl ClassifiedEvent {
    pub fn new(event_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            summary: summary.into(),
        }
    }
}

/// 已知事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    DeleteBucket,
    PutBucketPolicy,
    DeleteBucketPolicy,
    CreateBucket,
    CreateAccessKey,
    DeleteAccessKey,
    UpdateRole,
    DeleteRole,
    ConsoleLogin,
}

/// 事件名 → 类型，精确匹配（区分大小写）
const EVENT_TABLE: &[(&str, EventKind)] = &[
    ("DeleteBucket", EventKind::DeleteBucket),
    ("PutBucketPolicy", EventKind::PutBucketPolicy),
    ("DeleteBucketPolicy", EventKind::DeleteBucketPolicy),
    ("CreateBucket", EventKind::CreateBucket),
    ("CreateAccessKey", EventKind::CreateAccessKey),
    ("DeleteAccessKey", EventKind::DeleteAccessKey),
    ("UpdateRole", EventKind::UpdateRole),
    ("DeleteRole", EventKind::DeleteRole),
    ("ConsoleLogin", EventKind::ConsoleLogin),
];

impl EventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        EVENT_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name(&self) -> &'static str {
        EVENT_TABLE
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(n, _)| *n)
            .unwrap_or(UNKNOWN_EVENT)
    }

    /// 所有已知类型（按表顺序）
    pub fn all() -> impl Iterator<Item = EventKind> {
        EVENT_TABLE.iter().map(|(_, kind)| *kind)
    }

    /// 读取的字段路径（按模板顺序）
    pub fn fields(&self) -> &'static [&'static [&'static str]] {
        match self {
            EventKind::DeleteBucket
            | EventKind::PutBucketPolicy
            | EventKind::DeleteBucketPolicy
            | EventKind::CreateBucket => &[BUCKET_NAME, IDENTITY_TYPE, IDENTITY_ARN],
            EventKind::CreateAccessKey => {
                &[RESPONSE_ACCESS_KEY_ID, USER_NAME, IDENTITY_TYPE, IDENTITY_ARN]
            }
            EventKind::DeleteAccessKey => {
                &[REQUEST_ACCESS_KEY_ID, USER_NAME, IDENTITY_TYPE, IDENTITY_ARN]
            }
            EventKind::UpdateRole | EventKind::DeleteRole => {
                &[ROLE_NAME, IDENTITY_TYPE, IDENTITY_ARN]
            }
            EventKind::ConsoleLogin => &[SOURCE_IP],
        }
    }

    /// 渲染摘要句子，`v` 与 [`EventKind::fields`] 一一对应
    fn render(&self, v: &[String]) -> String {
        match self {
            EventKind::DeleteBucket => {
                format!("Bucket \"{}\" was deleted by \"{}\" \"{}\"", v[0], v[1], v[2])
            }
            EventKind::PutBucketPolicy => {
                format!("Bucket \"{}\" policy added by \"{}\" \"{}\"", v[0], v[1], v[2])
            }
            EventKind::DeleteBucketPolicy => {
                format!("Bucket \"{}\" policy deleted by \"{}\" \"{}\"", v[0], v[1], v[2])
            }
            EventKind::CreateBucket => {
                format!("Bucket \"{}\" created by \"{}\" \"{}\"", v[0], v[1], v[2])
            }
            EventKind::CreateAccessKey => format!(
                "Access Key \"{}\" for user \"{}\" created by \"{}\" \"{}\"",
                v[0], v[1], v[2], v[3]
            ),
            EventKind::DeleteAccessKey => format!(
                "Access Key \"{}\" for user \"{}\" deleted by \"{}\" \"{}\"",
                v[0], v[1], v[2], v[3]
            ),
            EventKind::UpdateRole => {
                format!("Role \"{}\" updated by \"{}\" \"{}\"", v[0], v[1], v[2])
            }
            EventKind::DeleteRole => {
                format!("Role \"{}\" deleted by \"{}\" \"{}\"", v[0], v[1], v[2])
            }
            EventKind::ConsoleLogin => format!("Root user console login from IP: \"{}\"", v[0]),
        }
    }

    /// 从 `detail` 提取字段并渲染摘要
    pub fn summarize(&self, detail: &Value) -> Result<String, ClassifyError> {
        let mut values = Vec::with_capacity(self.fields().len());
        for path in self.fields() {
            let value = match lookup(detail, path) {
                Lookup::Found(s) => s,
                Lookup::Missing => UNKNOWN_FIELD.to_string(),
                Lookup::ListContainer { container } => {
                    return Err(ClassifyError::MissingDetails { container })
                }
                Lookup::ScalarContainer { container } => {
                    return Err(ClassifyError::Unexpected { container })
                }
            };
            values.push(value);
        }
        Ok(self.render(&values))
    }
}

/// 已知事件无法正常生成摘要的原因
#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    #[error("`{container}` is a list, expected keyed fields")]
    MissingDetails { container: String },
    #[error("`{container}` is a plain value, expected an object")]
    Unexpected { container: String },
}

/// 分类一个事件，从不失败
pub fn classify(event: &RawEvent) -> ClassifiedEvent {
    // 空 detail 与缺失等价
    let Some(detail) = event.detail.as_ref().filter(|d| !is_blank(d)) else {
        return ClassifiedEvent::new(UNKNOWN_EVENT, "");
    };

    let Some(event_name) = event.event_name() else {
        debug!("Event detail has no eventName, using generic summary");
        return ClassifiedEvent::new(UNKNOWN_EVENT, detail.to_string());
    };

    let Some(kind) = EventKind::from_name(event_name) else {
        return ClassifiedEvent::new(event_name, detail.to_string());
    };

    match kind.summarize(detail) {
        Ok(summary) => ClassifiedEvent::new(event_name, summary),
        Err(e @ ClassifyError::MissingDetails { .. }) => {
            warn!(event_name = %event_name, error = %e, "Missing expected field in event");
            ClassifiedEvent::new(
                event_name,
                format!("Event {} occurred but some details are missing", event_name),
            )
        }
        Err(e @ ClassifyError::Unexpected { .. }) => {
            error!(event_name = %event_name, error = %e, "Error parsing event");
            ClassifiedEvent::new(event_name, event.to_json_string())
        }
    }
}
