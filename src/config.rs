//! 配置加载
//!
//! 敏感配置（pub/sub topic 标识、chat webhook 地址）通过 `ParameterStore`
//! 按名称获取。内置实现：
//! 1. `JsonFileParameterStore` - JSON 文件（默认 `~/.config/trail-notifier-parameters.json`）
//! 2. `EnvParameterStore` - 环境变量（`/alerts/slack-webhook` → `ALERTS_SLACK_WEBHOOK`）
//! 3. `LayeredParameterStore` - 按顺序尝试多个来源
//!
//! 运行参数（参数名称、HTTP 超时、dry-run）由 `AlertConfig` 描述，
//! 可从 `~/.config/trail-notifier`（JSON）加载。

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 默认 topic 参数名
pub const DEFAULT_TOPIC_PARAMETER: &str = "/alerts/sns-topic-arn";

/// 默认 webhook 参数名
pub const DEFAULT_WEBHOOK_PARAMETER: &str = "/alerts/slack-webhook";

/// 默认 HTTP 超时（毫秒）
const DEFAULT_TIMEOUT_MS: u64 = 10000;

/// 参数存储
pub trait ParameterStore: Send + Sync {
    /// 按名称获取参数值。`decrypt` 为 true 时允许读取加密参数。
    fn get_parameter(&self, name: &str, decrypt: bool) -> Result<String>;
}

/// JSON 文件中的单个参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterEntry {
    Plain(String),
    Detailed {
        value: String,
        #[serde(default)]
        secure: bool,
    },
}

impl ParameterEntry {
    fn resolve(&self, name: &str, decrypt: bool) -> Result<String> {
        match self {
            ParameterEntry::Plain(value) => Ok(value.clone()),
            ParameterEntry::Detailed { value, secure } => {
                if *secure && !decrypt {
                    bail!("Parameter {} is encrypted and decryption was not requested", name);
                }
                Ok(value.clone())
            }
        }
    }
}

/// JSON 文件参数存储
///
/// 文件格式：
/// ```json
/// {
///   "/alerts/sns-topic-arn": "arn:aws:sns:us-east-1:123:alerts",
///   "/alerts/slack-webhook": { "value": "https://hooks.slack.com/...", "secure": true }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileParameterStore {
    path: PathBuf,
}

impl JsonFileParameterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 默认路径 `~/.config/trail-notifier-parameters.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/trail-notifier-parameters.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<serde_json::Map<String, Value>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read parameter file {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid parameter file {}", self.path.display()))
    }
}

impl ParameterStore for JsonFileParameterStore {
    fn get_parameter(&self, name: &str, decrypt: bool) -> Result<String> {
        let params = self.load()?;
        let raw = params
            .get(name)
            .ok_or_else(|| anyhow!("Parameter {} not found in {}", name, self.path.display()))?;
        let entry: ParameterEntry = serde_json::from_value(raw.clone())
            .with_context(|| format!("Parameter {} has an invalid format", name))?;
        debug!(parameter = %name, source = "file", "Parameter resolved");
        entry.resolve(name, decrypt)
    }
}

/// 环境变量参数存储
#[derive(Debug, Clone, Default)]
pub struct EnvParameterStore {
    prefix: String,
}

impl EnvParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置环境变量前缀（如 `TRAIL_` → `TRAIL_ALERTS_SLACK_WEBHOOK`）
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// 参数名 → 环境变量名
    pub fn var_name(&self, name: &str) -> String {
        let body: String = name
            .trim_start_matches('/')
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, body)
    }
}

impl ParameterStore for EnvParameterStore {
    fn get_parameter(&self, name: &str, _decrypt: bool) -> Result<String> {
        let var = self.var_name(name);
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => {
                debug!(parameter = %name, source = "env", "Parameter resolved");
                Ok(value)
            }
            _ => Err(anyhow!("Parameter {} not set (expected env var {})", name, var)),
        }
    }
}

/// 按顺序尝试多个参数来源，返回第一个成功的值
#[derive(Default)]
pub struct LayeredParameterStore {
    layers: Vec<Box<dyn ParameterStore>>,
}

impl LayeredParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: Box<dyn ParameterStore>) -> Self {
        self.layers.push(layer);
        self
    }

    /// 默认来源：参数文件优先，其次环境变量。
    /// 未显式指定参数文件时使用默认路径（存在时）
    pub fn auto_detect_with(parameters: Option<PathBuf>) -> Self {
        let mut store = Self::new();
        let file = parameters.or_else(|| JsonFileParameterStore::default_path().filter(|p| p.exists()));
        if let Some(path) = file {
            debug!(path = %path.display(), "Using parameter file");
            store = store.with_layer(Box::new(JsonFileParameterStore::new(path)));
        }
        store.with_layer(Box::new(EnvParameterStore::new()))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl ParameterStore for LayeredParameterStore {
    fn get_parameter(&self, name: &str, decrypt: bool) -> Result<String> {
        let mut errors = Vec::new();
        for layer in &self.layers {
            match layer.get_parameter(name, decrypt) {
                Ok(value) => return Ok(value),
                Err(e) => errors.push(format!("{:#}", e)),
            }
        }
        if errors.is_empty() {
            bail!("No parameter source configured for {}", name);
        }
        Err(anyhow!("Failed to get parameter {}: {}", name, errors.join("; ")))
    }
}

/// 运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// pub/sub topic 参数名（不需要解密）
    pub topic_parameter: String,
    /// chat webhook 参数名（需要解密）
    pub webhook_parameter: String,
    /// HTTP 请求超时（毫秒）
    pub timeout_ms: u64,
    /// dry-run：只打印不发送
    pub dry_run: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            topic_parameter: DEFAULT_TOPIC_PARAMETER.to_string(),
            webhook_parameter: DEFAULT_WEBHOOK_PARAMETER.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            dry_run: false,
        }
    }
}

impl AlertConfig {
    /// 从 `~/.config/trail-notifier` 加载，文件不存在时使用默认值
    pub fn auto_load() -> Result<Self> {
        match dirs::home_dir().map(|home| home.join(".config/trail-notifier")) {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

/// 一次调用所需的投递目标
#[derive(Clone, PartialEq)]
pub struct DeliveryTargets {
    /// pub/sub topic 标识
    pub topic: String,
    /// chat webhook 地址（敏感，不打印）
    pub webhook_url: String,
}

impl std::fmt::Debug for DeliveryTargets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTargets")
            .field("topic", &self.topic)
            .field("webhook_url", &"<redacted>")
            .finish()
    }
}

impl DeliveryTargets {
    /// 从参数存储读取两个投递目标，任一失败即返回错误
    pub fn load(store: &dyn ParameterStore, config: &AlertConfig) -> Result<Self> {
        let topic = store.get_parameter(&config.topic_parameter, false)?;
        let webhook_url = store.get_parameter(&config.webhook_parameter, true)?;
        Ok(Self { topic, webhook_url })
    }
}
