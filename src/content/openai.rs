//! Client for OpenAI-compatible chat-completion endpoints.
//!
//! Requests ask for a JSON-schema response format wrapping the slot schema in the `{"value": ...}`
//! envelope. Transient transport failures (timeouts, connection errors, 429, 5xx) are retried here
//! with exponential backoff; everything else is returned to the enforcer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::limiter::RequestLimiter;
use crate::content::provider::{
    ContentProvider, ContentRequest, Message, ProviderConfig, ProviderError, ProviderIdentity,
};
use crate::content::schema::envelope_schema;
use crate::foundation::error::{SynthError, SynthResult};
use crate::pipeline::cancel::CancelToken;

const BACKOFF_BASE_MS: u64 = 250;
const BACKOFF_CAP_MS: u64 = 4_000;
const BODY_EXCERPT: usize = 200;
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    seed: u64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    // Length keywords are not accepted by strict mode; the enforcer checks them instead.
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Provider backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenAiProvider {
    config: ProviderConfig,
    api_key: String,
    endpoint: String,
    client: reqwest::blocking::Client,
    limiter: Arc<RequestLimiter>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Build a provider. The HTTP client carries the per-call timeout.
    pub fn new(
        config: ProviderConfig,
        api_key: String,
        limiter: Arc<RequestLimiter>,
    ) -> SynthResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(|e| {
                SynthError::provider_transient(format!("failed to build HTTP client: {e}"))
            })?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            config,
            api_key,
            endpoint,
            client,
            limiter,
        })
    }

    pub(crate) fn build_body<'a>(&'a self, request: &'a ContentRequest<'_>) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
            seed: request.seed,
            response_format: ResponseFormat {
                r#type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema_name(request.slot),
                    strict: false,
                    schema: envelope_schema(request.schema),
                },
            },
        }
    }

    fn send_once(&self, body: &ChatRequest<'_>) -> Result<String, ProviderError> {
        let _permit = self.limiter.acquire();
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text.chars().take(BODY_EXCERPT).collect(),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| ProviderError::Malformed(format!("unexpected completion body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed("completion has no message content".to_owned()))
    }
}

impl ContentProvider for OpenAiProvider {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            kind: "openai".to_owned(),
            model: self.config.model.clone(),
        }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(slot = request.slot, block = request.block_id)
    )]
    fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError> {
        let body = self.build_body(request);
        let mut attempt = 0u32;
        loop {
            if request.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            match self.send_once(&body) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    let wait = backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = wait.as_millis() as u64,
                        "transient provider failure"
                    );
                    if !pause(wait, request.cancel) {
                        return Err(ProviderError::Cancelled);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Sleep for `wait`, waking early when `cancel` fires. Returns `false` if it did.
fn pause(wait: Duration, cancel: Option<&CancelToken>) -> bool {
    let deadline = Instant::now() + wait;
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}

fn classify(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if e.is_decode() || e.is_body() {
        ProviderError::Malformed(e.to_string())
    } else {
        ProviderError::Connection(e.to_string())
    }
}

pub(crate) fn backoff(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(ms.min(BACKOFF_CAP_MS))
}

/// Response-format names allow `[A-Za-z0-9_-]` only.
pub(crate) fn schema_name(slot: &str) -> String {
    let name: String = slot
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(64)
        .collect();
    if name.is_empty() { "slot".to_owned() } else { name }
}

#[cfg(test)]
#[path = "../../tests/unit/content/openai.rs"]
mod tests;
