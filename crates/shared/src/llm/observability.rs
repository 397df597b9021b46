use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayRequest, LlmGatewayResponse, ReplySource,
};

#[derive(Debug, Clone)]
pub struct LlmTelemetryEvent {
    pub outcome: &'static str,
    pub latency_ms: u64,
    pub provider: String,
    pub model: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub error_type: Option<&'static str>,
    pub reply_source: Option<ReplySource>,
}

impl LlmTelemetryEvent {
    pub fn log(&self, session_id: &str) {
        if self.outcome == "success" {
            info!(
                session_id,
                outcome = self.outcome,
                latency_ms = self.latency_ms,
                provider = %self.provider,
                model = self.model.as_deref().unwrap_or("unknown"),
                prompt_tokens = self.prompt_tokens,
                completion_tokens = self.completion_tokens,
                total_tokens = self.total_tokens,
                reply_source = ?self.reply_source,
                "llm telemetry"
            );
        } else {
            warn!(
                session_id,
                outcome = self.outcome,
                latency_ms = self.latency_ms,
                provider = %self.provider,
                error_type = self.error_type.unwrap_or("unknown"),
                "llm telemetry"
            );
        }
    }
}

pub async fn generate_with_telemetry(
    llm_gateway: &dyn LlmGateway,
    request: LlmGatewayRequest,
) -> (
    Result<LlmGatewayResponse, LlmGatewayError>,
    LlmTelemetryEvent,
) {
    let started_at = Instant::now();
    let result = llm_gateway.generate(request).await;
    let telemetry = telemetry_for_result(started_at.elapsed(), &result);
    (result, telemetry)
}

fn telemetry_for_result(
    latency: Duration,
    result: &Result<LlmGatewayResponse, LlmGatewayError>,
) -> LlmTelemetryEvent {
    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(response) => {
            let usage = response.usage.as_ref();
            LlmTelemetryEvent {
                outcome: "success",
                latency_ms,
                provider: provider_from_model(&response.model),
                model: Some(response.model.clone()),
                prompt_tokens: usage.map(|usage| usage.prompt_tokens),
                completion_tokens: usage.map(|usage| usage.completion_tokens),
                total_tokens: usage.map(|usage| usage.total_tokens),
                error_type: None,
                reply_source: Some(response.reply_source),
            }
        }
        Err(err) => LlmTelemetryEvent {
            outcome: "failure",
            latency_ms,
            provider: "openrouter".to_string(),
            model: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            error_type: Some(error_type(err)),
            reply_source: None,
        },
    }
}

fn provider_from_model(model: &str) -> String {
    model
        .split('/')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("openrouter")
        .to_string()
}

pub fn error_type(error: &LlmGatewayError) -> &'static str {
    match error {
        LlmGatewayError::Unavailable => "unavailable",
        LlmGatewayError::Timeout => "timeout",
        LlmGatewayError::ProviderFailure(_) => "provider_failure",
        LlmGatewayError::InvalidProviderPayload(_) => "invalid_provider_payload",
    }
}
