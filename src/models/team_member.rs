//! Team member models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub twitter_url: Option<String>,
    pub skills: Vec<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamMemberRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    #[serde(default)]
    pub name: String,
    #[validate(length(min = 1, max = 120, message = "role is required"))]
    #[serde(default)]
    pub role: String,
    pub bio: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(url(message = "linkedin_url must be a valid URL"))]
    pub linkedin_url: Option<String>,
    #[validate(url(message = "github_url must be a valid URL"))]
    pub github_url: Option<String>,
    #[validate(url(message = "twitter_url must be a valid URL"))]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamMemberRequest {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120, message = "role must not be empty"))]
    pub role: Option<String>,
    pub bio: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(url(message = "linkedin_url must be a valid URL"))]
    pub linkedin_url: Option<String>,
    #[validate(url(message = "github_url must be a valid URL"))]
    pub github_url: Option<String>,
    #[validate(url(message = "twitter_url must be a valid URL"))]
    pub twitter_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}
