//! Chatbot knowledge base models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeEntry {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    /// Relevance of this entry for a visitor message; 0 means no match
    pub fn match_score(&self, message: &str) -> usize {
        let message = message.to_lowercase();
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty() && message.contains(&k.trim().to_lowercase()))
            .count();

        let question = self.question.to_lowercase();
        let word_hits = message
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 3 && question.contains(*w))
            .count();

        keyword_hits * 3 + word_hits
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateKnowledgeRequest {
    #[validate(length(min = 1, max = 500, message = "question is required"))]
    #[serde(default)]
    pub question: String,
    #[validate(length(min = 1, message = "answer is required"))]
    #[serde(default)]
    pub answer: String,
    #[serde(default = "default_category")]
    #[validate(length(min = 1, max = 100, message = "category must not be empty"))]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateKnowledgeRequest {
    #[validate(length(min = 1, max = 500, message = "question must not be empty"))]
    pub question: Option<String>,
    #[validate(length(min = 1, message = "answer must not be empty"))]
    pub answer: Option<String>,
    #[validate(length(min = 1, max = 100, message = "category must not be empty"))]
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str, keywords: &[&str]) -> KnowledgeEntry {
        KnowledgeEntry {
            id: Uuid::new_v4(),
            question: question.to_string(),
            answer: "answer".to_string(),
            category: "general".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_keyword_match_outweighs_word_overlap() {
        let pricing = entry("How much does a website cost?", &["price", "pricing"]);
        let contact = entry("How can I contact the team?", &["contact", "email"]);

        let message = "What is your pricing for a website?";
        assert!(pricing.match_score(message) > contact.match_score(message));
        assert_eq!(contact.match_score("unrelated words"), 0);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let e = entry("Do you build mobile apps?", &["Mobile"]);
        assert!(e.match_score("MOBILE development") > 0);
    }
}
