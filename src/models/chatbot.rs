//! Chatbot widget settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Singleton settings row (id = 1)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatbotSettings {
    pub enabled: bool,
    pub bot_name: String,
    pub welcome_message: String,
    pub fallback_message: String,
    pub primary_color: String,
    pub position: String,
    pub response_delay_ms: i32,
    pub show_on_mobile: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for ChatbotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_name: "Assistant".to_string(),
            welcome_message: "Hi! How can we help you today?".to_string(),
            fallback_message:
                "I'm not sure about that one. Leave us a message through the contact form and we'll get back to you."
                    .to_string(),
            primary_color: "#2563eb".to_string(),
            position: "bottom-right".to_string(),
            response_delay_ms: 600,
            show_on_mobile: true,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_position"))]
pub struct UpdateChatbotSettingsRequest {
    pub enabled: Option<bool>,
    #[validate(length(min = 1, max = 60, message = "bot_name must be 1-60 characters"))]
    pub bot_name: Option<String>,
    #[validate(length(min = 1, max = 500, message = "welcome_message must be 1-500 characters"))]
    pub welcome_message: Option<String>,
    #[validate(length(min = 1, max = 500, message = "fallback_message must be 1-500 characters"))]
    pub fallback_message: Option<String>,
    #[validate(length(equal = 7, message = "primary_color must be a #rrggbb hex color"))]
    pub primary_color: Option<String>,
    pub position: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "response_delay_ms must be 0-10000"))]
    pub response_delay_ms: Option<i32>,
    pub show_on_mobile: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

fn validate_position(req: &UpdateChatbotSettingsRequest) -> Result<(), validator::ValidationError> {
    if let Some(position) = &req.position {
        if !matches!(position.as_str(), "bottom-right" | "bottom-left") {
            let mut err = validator::ValidationError::new("position");
            err.message = Some("position must be bottom-right or bottom-left".into());
            return Err(err);
        }
    }
    if let Some(color) = &req.primary_color {
        let valid = color.starts_with('#') && color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            let mut err = validator::ValidationError::new("primary_color");
            err.message = Some("primary_color must be a #rrggbb hex color".into());
            return Err(err);
        }
    }
    Ok(())
}

impl UpdateChatbotSettingsRequest {
    /// Merge the provided fields over the current settings
    pub fn apply_to(&self, current: &ChatbotSettings) -> ChatbotSettings {
        ChatbotSettings {
            enabled: self.enabled.unwrap_or(current.enabled),
            bot_name: self.bot_name.clone().unwrap_or_else(|| current.bot_name.clone()),
            welcome_message: self
                .welcome_message
                .clone()
                .unwrap_or_else(|| current.welcome_message.clone()),
            fallback_message: self
                .fallback_message
                .clone()
                .unwrap_or_else(|| current.fallback_message.clone()),
            primary_color: self
                .primary_color
                .clone()
                .unwrap_or_else(|| current.primary_color.clone()),
            position: self.position.clone().unwrap_or_else(|| current.position.clone()),
            response_delay_ms: self.response_delay_ms.unwrap_or(current.response_delay_ms),
            show_on_mobile: self.show_on_mobile.unwrap_or(current.show_on_mobile),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatbotAskRequest {
    #[validate(length(min = 1, max = 1000, message = "message must be 1-1000 characters"))]
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatbotAnswer {
    pub answer: String,
    pub matched: bool,
    pub entry_id: Option<uuid::Uuid>,
    pub category: Option<String>,
}
