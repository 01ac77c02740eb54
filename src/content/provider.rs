use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::content::fallback::FallbackProvider;
use crate::content::limiter::RequestLimiter;
use crate::content::openai::OpenAiProvider;
use crate::foundation::error::{SynthError, SynthResult};
use crate::pipeline::cancel::CancelToken;
use crate::spec::hash::canonical_hash;
use crate::spec::ruleset::{BannedPattern, SchemaNode};

/// Name and model of a content source, recorded per sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Provider family (`openai`, `fallback`, `replay`).
    pub kind: String,
    pub model: String,
}

/// Chat role of a request message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    /// A previous (rejected) answer.
    Assistant,
}

/// One chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A structured-content request for one slot of one block.
#[derive(Clone, Debug)]
pub struct ContentRequest<'a> {
    pub slot: &'a str,
    pub block_id: &'a str,
    pub schema: &'a SchemaNode,
    pub banned: &'a [BannedPattern],
    /// Conversation so far (system instructions, request, repair turns).
    pub messages: Vec<Message>,
    pub seed: u64,
    pub attempt: u32,
    /// Batch cancellation. Providers stop retrying once it fires.
    pub cancel: Option<&'a CancelToken>,
}

impl ContentRequest<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}

/// Provider-side failure. Never escapes the enforcer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No response within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Transport failure.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },
    /// Response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// A replay source has nothing recorded for the block.
    #[error("no recorded content for `{0}`")]
    NotRecorded(String),
    /// The batch was cancelled before the call.
    #[error("cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Failures worth retrying at the transport level.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::NotRecorded(_) | Self::Cancelled => false,
        }
    }
}

/// A source of structured content. Implementations know nothing about layout.
pub trait ContentProvider: Send + Sync {
    /// Identity recorded in the manifest.
    fn identity(&self) -> ProviderIdentity;

    /// Produce a raw response: JSON text of the form `{"value": ...}`.
    fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError>;
}

/// Available provider kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat-completions endpoint.
    Openai,
    /// Deterministic local generator.
    #[default]
    Fallback,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    1.0
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_repair_attempts() -> u32 {
    2
}

fn default_max_concurrency() -> usize {
    4
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_owned()
}

/// Provider configuration (`provider.yaml`).
///
/// The API key is read from the environment variable named by `api_key_env` and is never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Nucleus sampling mass.
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-call timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Transport-level retries for transient failures.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Enforcer repair budget.
    #[serde(default = "default_repair_attempts")]
    pub repair_attempts: u32,
    /// Maximum in-flight requests across all workers.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Minimum spacing between request starts.
    #[serde(default)]
    pub min_interval_ms: u64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Fallback,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            repair_attempts: default_repair_attempts(),
            max_concurrency: default_max_concurrency(),
            min_interval_ms: 0,
            api_key_env: default_api_key_env(),
        }
    }
}

impl ProviderConfig {
    /// Parse and validate `provider.yaml` text.
    pub fn from_yaml_str(text: &str) -> SynthResult<Self> {
        let cfg: Self = serde_yaml::from_str(text)
            .map_err(|e| SynthError::serde(format!("provider config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range checks on numeric settings.
    pub fn validate(&self) -> SynthResult<()> {
        let bad = |msg: &str| Err(SynthError::serde(format!("provider config: {msg}")));
        if !(0.0..=2.0).contains(&self.temperature) {
            return bad("temperature must be in [0, 2]");
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return bad("top_p must be in (0, 1]");
        }
        if self.max_tokens == 0 {
            return bad("max_tokens must be >= 1");
        }
        if self.timeout_secs == 0 {
            return bad("timeout_secs must be >= 1");
        }
        if self.max_concurrency == 0 {
            return bad("max_concurrency must be >= 1");
        }
        Ok(())
    }

    /// Canonical hash of the resolved configuration.
    pub fn config_hash(&self) -> SynthResult<String> {
        let v = serde_yaml::to_value(self).map_err(|e| SynthError::serde(e.to_string()))?;
        Ok(canonical_hash(&v))
    }
}

/// Create a content provider from configuration.
///
/// - `ProviderKind::Fallback` never touches the network.
/// - `ProviderKind::Openai` reads its API key from the environment once, here.
pub fn create_provider(config: &ProviderConfig) -> SynthResult<Arc<dyn ContentProvider>> {
    match config.kind {
        ProviderKind::Fallback => Ok(Arc::new(FallbackProvider)),
        ProviderKind::Openai => {
            let key = std::env::var(&config.api_key_env).map_err(|_| {
                SynthError::Other(anyhow::anyhow!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
            let limiter = Arc::new(RequestLimiter::new(
                config.max_concurrency,
                std::time::Duration::from_millis(config.min_interval_ms),
            ));
            Ok(Arc::new(OpenAiProvider::new(config.clone(), key, limiter)?))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/content/provider.rs"]
mod tests;
