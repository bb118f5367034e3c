//! 端到端测试：真实 HTTP 渠道（mockito）+ 文件参数存储

use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use trail_notifier::{
    AlertConfig, DedupGuard, EventHandler, JsonFileParameterStore, NotificationBuilder,
    ProcessingError, RawEvent, TopicBackend,
};

const SUMMARY: &str = "Bucket \"my-bucket\" created by \"IAMUser\" \"arn:aws:iam::123:user/alice\"";

fn parameter_file(webhook: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let content = json!({
        "/alerts/sns-topic-arn": "arn:aws:sns:us-east-1:123:alerts",
        "/alerts/slack-webhook": {"value": webhook, "secure": true}
    });
    file.write_all(content.to_string().as_bytes()).unwrap();
    file
}

fn handler(params: &NamedTempFile, backend: TopicBackend) -> EventHandler {
    let config = AlertConfig {
        timeout_ms: 2000,
        ..Default::default()
    };
    let builder = NotificationBuilder::from_config(&config).topic_backend(backend);
    EventHandler::new(
        DedupGuard::in_memory(),
        Box::new(JsonFileParameterStore::new(params.path())),
        Box::new(builder),
        config,
    )
}

fn create_bucket(id: &str) -> RawEvent {
    RawEvent::from_json(
        &json!({
            "id": id,
            "time": "t1",
            "detail": {
                "eventName": "CreateBucket",
                "requestParameters": {"bucketName": "my-bucket"},
                "userIdentity": {"type": "IAMUser", "arn": "arn:aws:iam::123:user/alice"}
            }
        })
        .to_string(),
    )
    .unwrap()
}

#[test]
fn test_create_bucket_delivered_to_both_channels() {
    let mut server = Server::new();
    let slack = server
        .mock("POST", "/slack")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "text": format!("CreateBucket: {}", SUMMARY) })))
        .with_status(200)
        .create();
    let topic = server
        .mock("POST", "/publish")
        .match_body(Matcher::Json(json!({
            "topic": "arn:aws:sns:us-east-1:123:alerts",
            "subject": "CreateBucket",
            "message": SUMMARY
        })))
        .with_status(200)
        .with_body(r#"{"message_id": "abc"}"#)
        .create();

    let params = parameter_file(&format!("{}/slack", server.url()));
    let handler = handler(
        &params,
        TopicBackend::Http {
            endpoint: format!("{}/publish", server.url()),
        },
    );

    let response = handler.handle(&create_bucket("e1")).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "Event processed successfully");

    slack.assert();
    topic.assert();
}

#[test]
fn test_duplicate_is_not_delivered_again() {
    let mut server = Server::new();
    let slack = server.mock("POST", "/slack").with_status(200).expect(2).create();
    let topic = server
        .mock("POST", "/publish")
        .with_status(200)
        .with_body(r#"{"message_id": "abc"}"#)
        .expect(2)
        .create();

    let params = parameter_file(&format!("{}/slack", server.url()));
    let handler = handler(
        &params,
        TopicBackend::Http {
            endpoint: format!("{}/publish", server.url()),
        },
    );

    assert_eq!(handler.handle(&create_bucket("e1")).unwrap().body, "Event processed successfully");
    assert_eq!(handler.handle(&create_bucket("e1")).unwrap().body, "Duplicate event ignored");
    assert_eq!(handler.handle(&create_bucket("e2")).unwrap().body, "Event processed successfully");

    slack.assert();
    topic.assert();
}

#[test]
fn test_slack_error_does_not_fail_invocation() {
    let mut server = Server::new();
    let slack = server.mock("POST", "/slack").with_status(500).create();

    let dir = tempfile::tempdir().unwrap();
    let topic_path = dir.path().join("topic.jsonl");
    let params = parameter_file(&format!("{}/slack", server.url()));
    let handler = handler(&params, TopicBackend::File { path: topic_path.clone() });

    let response = handler.handle(&create_bucket("e1")).unwrap();
    assert_eq!(response.body, "Event processed successfully");
    slack.assert();

    let published = std::fs::read_to_string(&topic_path).unwrap();
    let record: serde_json::Value = serde_json::from_str(published.lines().next().unwrap()).unwrap();
    assert_eq!(record["subject"], "CreateBucket");
    assert_eq!(record["message"], SUMMARY);
    assert_eq!(record["topic"], "arn:aws:sns:us-east-1:123:alerts");
}

#[test]
fn test_unreachable_slack_does_not_fail_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let params = parameter_file("http://127.0.0.1:1/slack");
    let handler = handler(
        &params,
        TopicBackend::File {
            path: dir.path().join("topic.jsonl"),
        },
    );

    assert!(handler.handle(&create_bucket("e1")).is_ok());
}

#[test]
fn test_publish_error_fails_invocation() {
    let mut server = Server::new();
    let slack = server.mock("POST", "/slack").with_status(200).create();
    server
        .mock("POST", "/publish")
        .with_status(500)
        .with_body("internal error")
        .create();

    let params = parameter_file(&format!("{}/slack", server.url()));
    let handler = handler(
        &params,
        TopicBackend::Http {
            endpoint: format!("{}/publish", server.url()),
        },
    );

    let err = handler.handle(&create_bucket("e1")).unwrap_err();
    assert_eq!(err, ProcessingError);
    assert_eq!(err.to_string(), "Cannot process event");
    // chat 消息已经发出，不回滚
    slack.assert();
}

#[test]
fn test_missing_parameters_fail_before_delivery() {
    let mut server = Server::new();
    let slack = server.mock("POST", "/slack").expect(0).create();

    let mut params = NamedTempFile::new().unwrap();
    params.write_all(b"{}").unwrap();
    let handler = handler(
        &params,
        TopicBackend::Http {
            endpoint: format!("{}/publish", server.url()),
        },
    );

    assert_eq!(handler.handle(&create_bucket("e1")), Err(ProcessingError));
    slack.assert();
}

#[test]
fn test_dry_run_sends_nothing() {
    let mut server = Server::new();
    let slack = server.mock("POST", "/slack").expect(0).create();
    let topic = server.mock("POST", "/publish").expect(0).create();

    let params = parameter_file(&format!("{}/slack", server.url()));
    let config = AlertConfig {
        dry_run: true,
        ..Default::default()
    };
    let builder = NotificationBuilder::from_config(&config).topic_backend(TopicBackend::Http {
        endpoint: format!("{}/publish", server.url()),
    });
    let handler = EventHandler::new(
        DedupGuard::in_memory(),
        Box::new(JsonFileParameterStore::new(params.path())),
        Box::new(builder),
        config,
    );

    assert_eq!(
        handler.handle(&create_bucket("e1")).unwrap().body,
        "Event processed successfully"
    );
    slack.assert();
    topic.assert();
}
