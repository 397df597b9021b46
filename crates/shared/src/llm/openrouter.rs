use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::gateway::{
    FALLBACK_REPLY, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest,
    LlmGatewayResponse, LlmTokenUsage, ReplySource,
};
use crate::config::ConfigError;
use crate::config_env::{env_value, parsed_env};

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_TOKENS: u32 = 800;
const DEFAULT_PRIMARY_MODEL: &str = "openai/gpt-4o-mini";
const CHAT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct OpenRouterModelRoute {
    pub primary_model: String,
    pub fallback_model: Option<String>,
}

impl OpenRouterModelRoute {
    fn candidate_models(&self) -> Vec<&str> {
        let mut candidates = Vec::new();
        if !self.primary_model.is_empty() {
            candidates.push(self.primary_model.as_str());
        }

        if let Some(fallback_model) = self.fallback_model.as_deref()
            && !fallback_model.is_empty()
            && fallback_model != self.primary_model
        {
            candidates.push(fallback_model);
        }

        candidates
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouterGatewayConfig {
    pub chat_completions_url: String,
    /// `None` leaves the gateway constructed but unavailable.
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub model_route: OpenRouterModelRoute,
}

impl OpenRouterGatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chat_completions_url = env_value("OPENROUTER_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        if !chat_completions_url.starts_with("http://")
            && !chat_completions_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidConfiguration(
                "OPENROUTER_CHAT_COMPLETIONS_URL must start with http:// or https://".to_string(),
            ));
        }

        let timeout_ms = parsed_env("OPENROUTER_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "OPENROUTER_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            chat_completions_url,
            api_key: env_value("OPENROUTER_API_KEY"),
            timeout_ms,
            max_tokens: parsed_env("OPENROUTER_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            model_route: OpenRouterModelRoute {
                primary_model: env_value("OPENROUTER_MODEL_PRIMARY")
                    .unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string()),
                fallback_model: env_value("OPENROUTER_MODEL_FALLBACK"),
            },
        })
    }
}

#[derive(Debug, Error)]
pub enum OpenRouterConfigError {
    #[error("failed to build OpenRouter http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct OpenRouterGateway {
    client: reqwest::Client,
    config: OpenRouterGatewayConfig,
}

impl OpenRouterGateway {
    pub fn new(config: OpenRouterGatewayConfig) -> Result<Self, OpenRouterConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenRouterConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn generate_within_deadline(
        &self,
        request: LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, LlmGatewayError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(LlmGatewayError::Unavailable);
        };

        let cancel = CancellationToken::new();
        let watchdog = spawn_deadline_watchdog(
            cancel.clone(),
            Duration::from_millis(self.config.timeout_ms),
        );

        // Dropping the losing branch drops the in-flight reqwest future, which aborts the call.
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(
                    timeout_ms = self.config.timeout_ms,
                    "llm request cancelled at deadline"
                );
                Err(LlmGatewayError::Timeout)
            }
            result = self.generate_across_models(api_key, &request) => result,
        };

        watchdog.abort();
        result
    }

    async fn generate_across_models(
        &self,
        api_key: &str,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, LlmGatewayError> {
        let candidate_models = self.config.model_route.candidate_models();

        for (index, model) in candidate_models.iter().enumerate() {
            match self.send_once(api_key, model, request).await {
                Ok(response) => return Ok(response),
                Err(attempt_err) => {
                    let has_more_candidates = index + 1 < candidate_models.len();
                    if has_more_candidates && attempt_err.fallback_allowed {
                        debug!(model = %model, "llm model failed; trying fallback model");
                        continue;
                    }
                    return Err(attempt_err.error);
                }
            }
        }

        Err(LlmGatewayError::ProviderFailure(
            "no_openrouter_model_candidates".to_string(),
        ))
    }

    async fn send_once(
        &self,
        api_key: &str,
        model: &str,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, SendAttemptError> {
        let mut request_body = json!({
            "model": model,
            "messages": request.messages,
            "temperature": CHAT_TEMPERATURE,
            "max_tokens": self.config.max_tokens,
        });
        if let Some(requester_id) = request.requester_id.as_deref() {
            request_body["user"] = Value::String(requester_id.to_string());
        }

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SendAttemptError::terminal(LlmGatewayError::Timeout)
                } else {
                    SendAttemptError::with_fallback(LlmGatewayError::ProviderFailure(
                        "request_unavailable".to_string(),
                    ))
                }
            })?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                SendAttemptError::terminal(LlmGatewayError::Timeout)
            } else {
                SendAttemptError::with_fallback(LlmGatewayError::InvalidProviderPayload(
                    "response_body_read_failed".to_string(),
                ))
            }
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            let error = LlmGatewayError::ProviderFailure(format!(
                "status={} code={provider_code}",
                status.as_u16()
            ));
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(SendAttemptError::terminal(error));
            }
            return Err(SendAttemptError::with_fallback(error));
        }

        let parsed: OpenRouterSuccessResponse = serde_json::from_str(&body).map_err(|_| {
            SendAttemptError::with_fallback(LlmGatewayError::InvalidProviderPayload(
                "response_json_parse_failed".to_string(),
            ))
        })?;

        let (reply, reply_source) = match extract_reply_text(&parsed) {
            Some(reply) => (reply, ReplySource::Model),
            None => {
                warn!(model = %model, "llm reply was empty; substituting fallback reply");
                (FALLBACK_REPLY.to_string(), ReplySource::Fallback)
            }
        };

        Ok(LlmGatewayResponse {
            model: parsed.model.unwrap_or_else(|| model.to_string()),
            provider_request_id: header_request_id.or(parsed.id),
            reply,
            reply_source,
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
                completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for OpenRouterGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(self.generate_within_deadline(request))
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

fn spawn_deadline_watchdog(
    cancel: CancellationToken,
    deadline: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        cancel.cancel();
    })
}

#[derive(Debug)]
struct SendAttemptError {
    error: LlmGatewayError,
    fallback_allowed: bool,
}

impl SendAttemptError {
    fn with_fallback(error: LlmGatewayError) -> Self {
        Self {
            error,
            fallback_allowed: true,
        }
    }

    fn terminal(error: LlmGatewayError) -> Self {
        Self {
            error,
            fallback_allowed: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenRouterSuccessResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: Option<OpenRouterMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn extract_reply_text(response: &OpenRouterSuccessResponse) -> Option<String> {
    let content = response
        .choices
        .first()?
        .message
        .as_ref()?
        .content
        .as_ref()?;

    let text = match content {
        Value::String(raw) => raw.trim().to_string(),
        // Some providers return content parts: [{ "type": "text", "text": "..." }].
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string(),
        _ => String::new(),
    };

    (!text.is_empty()).then_some(text)
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
    }

    let parsed = serde_json::from_str::<ProviderErrorEnvelope>(body).ok();
    let Some(provider_error_code) = parsed
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.code)
    else {
        return "unknown".to_string();
    };

    match provider_error_code {
        Value::String(code) => code,
        Value::Number(code) => code.to_string(),
        _ => "unknown".to_string(),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
