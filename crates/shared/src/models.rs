use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic filter selected in the UI and the tag attached to every persisted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryLabel {
    All,
    Projects,
    Experience,
    Skills,
    Achievements,
    Education,
    Certificates,
    Testimonials,
    Contact,
}

impl CategoryLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Projects => "projects",
            Self::Experience => "experience",
            Self::Skills => "skills",
            Self::Achievements => "achievements",
            Self::Education => "education",
            Self::Certificates => "certificates",
            Self::Testimonials => "testimonials",
            Self::Contact => "contact",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "projects" => Some(Self::Projects),
            "experience" => Some(Self::Experience),
            "skills" => Some(Self::Skills),
            "achievements" => Some(Self::Achievements),
            "education" => Some(Self::Education),
            "certificates" => Some(Self::Certificates),
            "testimonials" => Some(Self::Testimonials),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }

    /// Missing or unrecognized filters behave like the `all` wildcard.
    pub fn from_request(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or(Self::All)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    pub session_id: String,
    pub message: String,
    pub is_user: bool,
    pub category: CategoryLabel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChatTurn {
    pub session_id: String,
    pub message: String,
    pub is_user: bool,
    pub category: CategoryLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_user: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatResponse {
    pub success: bool,
    pub user_message: ChatTurn,
    pub ai_message: ChatTurn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<CategoryLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChatResponse {
    pub success: bool,
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
