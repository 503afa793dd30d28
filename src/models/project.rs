//! Project showcase models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub technologies: Vec<String>,
    pub featured: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100, message = "category is required"))]
    #[serde(default)]
    pub category: String,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(url(message = "live_url must be a valid URL"))]
    pub live_url: Option<String>,
    #[validate(url(message = "github_url must be a valid URL"))]
    pub github_url: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub display_order: i32,
    /// Body password accepted as an admin credential
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "category must not be empty"))]
    pub category: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(url(message = "live_url must be a valid URL"))]
    pub live_url: Option<String>,
    #[validate(url(message = "github_url must be a valid URL"))]
    pub github_url: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub display_order: Option<i32>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public listing filters
#[derive(Debug, Default, Deserialize)]
pub struct ProjectFilters {
    pub featured: Option<bool>,
    pub category: Option<String>,
}
