//! Contact form models

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    #[serde(default)]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    #[serde(default)]
    pub email: String,
    #[validate(length(max = 200, message = "subject must be at most 200 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 10, max = 5000, message = "message must be 10-5000 characters"))]
    #[serde(default)]
    pub message: String,
    pub company: Option<String>,
    pub budget: Option<String>,
}

impl ContactRequest {
    pub fn subject_line(&self) -> String {
        match self.subject.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => format!("[Contact] {}", s),
            _ => format!("[Contact] New message from {}", self.name),
        }
    }

    pub fn render_body(&self) -> String {
        let mut body = format!("Name: {}\nEmail: {}\n", self.name, self.email);
        if let Some(company) = &self.company {
            body.push_str(&format!("Company: {}\n", company));
        }
        if let Some(budget) = &self.budget {
            body.push_str(&format!("Budget: {}\n", budget));
        }
        body.push('\n');
        body.push_str(&self.message);
        body
    }
}
