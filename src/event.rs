//! 审计事件数据结构
//!
//! `RawEvent` 是入站记录的 serde 模型。所有字段都可能缺失，
//! 嵌套字段通过 [`lookup`] 做容错读取。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 入站审计事件（云平台活动日志的一条记录）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// 事件 ID（不透明）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 事件时间戳
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// 事件详情（eventName、userIdentity、requestParameters 等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// 其它顶层字段，保留原样用于兜底输出
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawEvent {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// `detail.eventName`，仅当它是字符串时返回
    pub fn event_name(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.get("eventName"))
            .and_then(Value::as_str)
    }

    /// 整条记录的紧凑 JSON 文本
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// 嵌套字段读取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// 找到值（字符串原样，其它值为紧凑 JSON 文本）
    Found(String),
    /// 字段或其某个上层容器不存在（或为 null）
    Missing,
    /// 路径上的某个容器是数组，无法按键读取
    ListContainer { container: String },
    /// 路径上的某个容器是字符串、数字或布尔值
    ScalarContainer { container: String },
}

/// 沿 `path` 读取 `root` 中的嵌套字段
///
/// 中间层缺失或为 null 视为 `Missing`；中间层是数组或标量时分别返回
/// `ListContainer` / `ScalarContainer`。叶子为字符串时原样返回，
/// 其它值（包括对象和数组）使用紧凑 JSON 文本。
pub fn lookup(root: &Value, path: &[&str]) -> Lookup {
    let mut current = root;
    let mut walked: Vec<&str> = Vec::with_capacity(path.len());

    for &key in path {
        let map = match current {
            Value::Object(map) => map,
            Value::Null => return Lookup::Missing,
            Value::Array(_) => {
                return Lookup::ListContainer {
                    container: walked.join("."),
                }
            }
            _ => {
                return Lookup::ScalarContainer {
                    container: walked.join("."),
                }
            }
        };
        walked.push(key);
        current = match map.get(key) {
            Some(v) => v,
            None => return Lookup::Missing,
        };
    }

    match current {
        Value::Null => Lookup::Missing,
        Value::String(s) => Lookup::Found(s.clone()),
        other => Lookup::Found(other.to_string()),
    }
}

/// 与 `None` 等价的 detail：null、空对象、空数组、空字符串
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_event() {
        let event = RawEvent::from_json(
            r#"{"id":"e1","time":"t1","source":"aws.s3","detail":{"eventName":"CreateBucket"}}"#,
        )
        .unwrap();

        assert_eq!(event.id.as_deref(), Some("e1"));
        assert_eq!(event.time.as_deref(), Some("t1"));
        assert_eq!(event.event_name(), Some("CreateBucket"));
        assert_eq!(event.extra.get("source"), Some(&json!("aws.s3")));
    }

    #[test]
    fn test_parse_empty_object() {
        let event = RawEvent::from_json("{}").unwrap();
        assert!(event.id.is_none());
        assert!(event.detail.is_none());
        assert!(event.event_name().is_none());
    }

    #[test]
    fn test_non_string_event_name_is_ignored() {
        let event = RawEvent {
            detail: Some(json!({"eventName": 7})),
            ..Default::default()
        };
        assert!(event.event_name().is_none());
    }

    #[test]
    fn test_to_json_string_keeps_extra_fields() {
        let event = RawEvent::from_json(r#"{"id":"e1","region":"us-east-1"}"#).unwrap();
        let text = event.to_json_string();
        assert!(text.contains(r#""id":"e1""#));
        assert!(text.contains(r#""region":"us-east-1""#));
        assert!(!text.contains("detail"));
    }

    #[test]
    fn test_lookup_found() {
        let v = json!({"userIdentity": {"type": "IAMUser", "mfa": true, "n": 42}});
        assert_eq!(lookup(&v, &["userIdentity", "type"]), Lookup::Found("IAMUser".into()));
        assert_eq!(lookup(&v, &["userIdentity", "mfa"]), Lookup::Found("true".into()));
        assert_eq!(lookup(&v, &["userIdentity", "n"]), Lookup::Found("42".into()));
    }

    #[test]
    fn test_lookup_missing() {
        let v = json!({"userIdentity": {"type": null}, "requestParameters": null});
        assert_eq!(lookup(&v, &["userIdentity", "arn"]), Lookup::Missing);
        assert_eq!(lookup(&v, &["userIdentity", "type"]), Lookup::Missing);
        assert_eq!(lookup(&v, &["requestParameters", "bucketName"]), Lookup::Missing);
        assert_eq!(lookup(&v, &["responseElements", "accessKey", "accessKeyId"]), Lookup::Missing);
    }

    #[test]
    fn test_lookup_container_shapes() {
        let v = json!({"requestParameters": "oops", "responseElements": {"accessKey": [1]}});
        assert_eq!(
            lookup(&v, &["requestParameters", "bucketName"]),
            Lookup::ScalarContainer { container: "requestParameters".into() }
        );
        assert_eq!(
            lookup(&v, &["responseElements", "accessKey", "accessKeyId"]),
            Lookup::ListContainer { container: "responseElements.accessKey".into() }
        );
    }

    #[test]
    fn test_lookup_structured_leaf_renders_json() {
        let v = json!({"requestParameters": {"bucketName": {"n": "b"}, "tags": ["a", 1]}});
        assert_eq!(
            lookup(&v, &["requestParameters", "bucketName"]),
            Lookup::Found(r#"{"n":"b"}"#.into())
        );
        assert_eq!(
            lookup(&v, &["requestParameters", "tags"]),
            Lookup::Found(r#"["a",1]"#.into())
        );
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!({})));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&json!("")));
        assert!(!is_blank(&json!({"eventName": "x"})));
        assert!(!is_blank(&json!(0)));
    }
}
