//! Pro Mode maintenance window

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Singleton configuration row (id = 1)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProModeConfig {
    pub enabled: bool,
    pub title: String,
    pub message: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            title: "Pro Mode".to_string(),
            message: "We're upgrading our premium experience. Please check back soon.".to_string(),
            start_time: None,
            end_time: None,
            updated_at: Utc::now(),
        }
    }
}

impl ProModeConfig {
    /// Whether the window is open at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.start_time.map_or(true, |start| start <= now)
            && self.end_time.map_or(true, |end| end > now)
    }
}

#[derive(Debug, Serialize)]
pub struct ProModeStatus {
    #[serde(flatten)]
    pub config: ProModeConfig,
    pub is_active_now: bool,
}

impl From<ProModeConfig> for ProModeStatus {
    fn from(config: ProModeConfig) -> Self {
        let is_active_now = config.is_active_at(Utc::now());
        Self {
            config,
            is_active_now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct UpdateProModeRequest {
    pub enabled: Option<bool>,
    #[validate(length(min = 1, max = 120, message = "title must be 1-120 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "message must be 1-2000 characters"))]
    pub message: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Clear both window bounds
    #[serde(default)]
    pub clear_window: bool,
    #[serde(default)]
    pub password: Option<String>,
}

fn validate_window(req: &UpdateProModeRequest) -> Result<(), validator::ValidationError> {
    if let (Some(start), Some(end)) = (req.start_time, req.end_time) {
        if end <= start {
            let mut err = validator::ValidationError::new("end_time");
            err.message = Some("end_time must be after start_time".into());
            return Err(err);
        }
    }
    Ok(())
}

impl UpdateProModeRequest {
    pub fn apply_to(&self, current: &ProModeConfig) -> ProModeConfig {
        let (start_time, end_time) = if self.clear_window {
            (None, None)
        } else {
            (
                self.start_time.or(current.start_time),
                self.end_time.or(current.end_time),
            )
        };

        ProModeConfig {
            enabled: self.enabled.unwrap_or(current.enabled),
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            message: self.message.clone().unwrap_or_else(|| current.message.clone()),
            start_time,
            end_time,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use validator::Validate;

    #[test]
    fn test_disabled_is_never_active() {
        let config = ProModeConfig::default();
        assert!(!config.is_active_at(Utc::now()));
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let config = ProModeConfig {
            enabled: true,
            start_time: Some(now - Duration::hours(1)),
            end_time: Some(now + Duration::hours(1)),
            ..ProModeConfig::default()
        };

        assert!(config.is_active_at(now));
        assert!(!config.is_active_at(now - Duration::hours(2)));
        assert!(!config.is_active_at(now + Duration::hours(1)));
    }

    #[test]
    fn test_open_ended_window() {
        let now = Utc::now();
        let config = ProModeConfig {
            enabled: true,
            start_time: Some(now - Duration::minutes(5)),
            ..ProModeConfig::default()
        };
        assert!(config.is_active_at(now + Duration::days(365)));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let now = Utc::now();
        let req = UpdateProModeRequest {
            enabled: Some(true),
            title: None,
            message: None,
            start_time: Some(now),
            end_time: Some(now - Duration::minutes(1)),
            clear_window: false,
            password: None,
        };
        assert!(req.validate().is_err());
    }
}
