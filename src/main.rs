//! Trail Notifier CLI
//!
//! 读取一条审计事件（JSON 文件或 stdin），分类后转发到 Slack 和 topic。

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};
use trail_notifier::{
    classify, AlertConfig, DedupGuard, DedupKey, EventHandler, LayeredParameterStore,
    NotificationBuilder, ProcessingError, RawEvent, TopicBackend,
};

#[derive(Parser)]
#[command(name = "trail-notifier")]
#[command(about = "Forward cloud audit-trail events to Slack and a pub/sub topic")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 处理事件：去重、分类并投递
    Handle {
        /// 事件 JSON 文件（省略或为 "-" 时读取 stdin）
        file: Option<PathBuf>,
        /// 运行配置文件（默认 ~/.config/trail-notifier）
        #[arg(long, env = "TRAIL_NOTIFIER_CONFIG")]
        config: Option<PathBuf>,
        /// 参数文件，优先于环境变量
        #[arg(long, env = "TRAIL_NOTIFIER_PARAMETERS")]
        parameters: Option<PathBuf>,
        /// pub/sub 网关地址
        #[arg(long, env = "TRAIL_NOTIFIER_TOPIC_ENDPOINT", conflicts_with = "topic_file")]
        topic_endpoint: Option<String>,
        /// 本地 topic 文件（JSONL）
        #[arg(long, env = "TRAIL_NOTIFIER_TOPIC_FILE")]
        topic_file: Option<PathBuf>,
        /// Dry-run 模式（只打印不发送）
        #[arg(long)]
        dry_run: bool,
        /// 输入为 JSON Lines，每行一个事件，共用同一个去重集合
        #[arg(long)]
        jsonl: bool,
    },
    /// 只分类，输出 eventName 和摘要
    Classify {
        /// 事件 JSON 文件（省略或为 "-" 时读取 stdin）
        file: Option<PathBuf>,
    },
    /// 输出事件的去重键
    DedupKey {
        /// 事件 JSON 文件（省略或为 "-" 时读取 stdin）
        file: Option<PathBuf>,
    },
}

fn read_input(file: Option<&Path>) -> Result<String> {
    Ok(match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read event file {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Cannot read event from stdin")?;
            buf
        }
    })
}

fn read_event(file: Option<&Path>) -> Result<RawEvent> {
    let text = read_input(file)?;
    RawEvent::from_json(&text).context("Event is not a valid JSON object")
}

/// 逐行处理事件，返回失败的行数
fn handle_lines(handler: &EventHandler, text: &str) -> usize {
    let mut failures = 0;
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = RawEvent::from_json(line)
            .map_err(|e| {
                warn!(line = index + 1, error = %e, "Malformed event line");
            })
            .and_then(|event| handler.handle(&event).map_err(|_| ()));
        match outcome {
            Ok(response) => match serde_json::to_string(&response) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!(error = %e, "Cannot serialize response"),
            },
            Err(()) => {
                failures += 1;
                println!("{}", serde_json::json!({"error": ProcessingError.to_string()}));
            }
        }
    }
    failures
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trail_notifier=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Handle {
            file,
            config,
            parameters,
            topic_endpoint,
            topic_file,
            dry_run,
            jsonl,
        } => {
            let mut alert_config = match config {
                Some(path) => AlertConfig::from_file(&path)?,
                None => AlertConfig::auto_load()?,
            };
            alert_config.dry_run |= dry_run;

            let store = LayeredParameterStore::auto_detect_with(parameters);

            let mut builder = NotificationBuilder::from_config(&alert_config);
            if let Some(endpoint) = topic_endpoint {
                builder = builder.topic_backend(TopicBackend::Http { endpoint });
            } else if let Some(path) = topic_file {
                builder = builder.topic_backend(TopicBackend::File { path });
            }

            let handler = EventHandler::new(
                DedupGuard::in_memory(),
                Box::new(store),
                Box::new(builder),
                alert_config,
            );

            if jsonl {
                let text = read_input(file.as_deref())?;
                let failures = handle_lines(&handler, &text);
                if failures > 0 {
                    bail!("{} event(s) failed", failures);
                }
            } else {
                let event = read_event(file.as_deref())?;
                let response = handler.handle(&event)?;
                println!("{}", serde_json::to_string(&response)?);
            }
        }
        Commands::Classify { file } => {
            let event = read_event(file.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&classify(&event))?);
        }
        Commands::DedupKey { file } => {
            let event = read_event(file.as_deref())?;
            println!("{}", DedupKey::from_event(&event));
        }
    }

    Ok(())
}
