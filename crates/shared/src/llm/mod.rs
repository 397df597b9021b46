pub mod gateway;
pub mod observability;
pub mod openrouter;
pub mod prompts;

pub use gateway::{
    ChatMessage, ChatRole, FALLBACK_REPLY, LlmGateway, LlmGatewayError, LlmGatewayFuture,
    LlmGatewayRequest, LlmGatewayResponse, LlmTokenUsage, ReplySource,
};
pub use observability::{LlmTelemetryEvent, generate_with_telemetry};
pub use openrouter::{
    OpenRouterConfigError, OpenRouterGateway, OpenRouterGatewayConfig, OpenRouterModelRoute,
};
pub use prompts::{PORTFOLIO_PERSONA, PersonaPrompt, category_focus};
