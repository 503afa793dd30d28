//! 聊天机器人设置与问答

use crate::{
    auth::AdminCredential,
    error::AppError,
    handlers::{success, success_with_message, ApiJson},
    middleware::AppState,
    models::{
        chatbot::{ChatbotAnswer, ChatbotAskRequest, ChatbotSettings, UpdateChatbotSettingsRequest},
        knowledge::KnowledgeEntry,
    },
    repository::{KnowledgeRepository, SettingsRepository},
};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use validator::Validate;

/// 公开读取；从未保存过时返回默认设置
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let settings = SettingsRepository::new(state.db.clone()).chatbot_settings().await?;
    Ok(success(settings))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    credential: AdminCredential,
    ApiJson(req): ApiJson<UpdateChatbotSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    credential.authorize(&state, req.password.as_deref()).await?;
    req.validate()?;

    let repo = SettingsRepository::new(state.db.clone());
    let current = repo.chatbot_settings().await?;
    let saved = repo.save_chatbot_settings(&req.apply_to(&current)).await?;
    tracing::info!(enabled = saved.enabled, "Chatbot settings updated");

    Ok(success_with_message("Chatbot settings updated", saved))
}

/// 访客提问：在启用的知识条目中按关键词匹配
pub async fn ask(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ChatbotAskRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let settings = SettingsRepository::new(state.db.clone()).chatbot_settings().await?;
    if !settings.enabled {
        return Err(AppError::not_found("chatbot"));
    }

    let entries = KnowledgeRepository::new(state.db.clone()).list(true).await?;
    Ok(success(answer_question(&entries, &settings, &req.message)))
}

/// 选出得分最高的条目；同分时取优先级更高者，无匹配时使用兜底回复
pub fn answer_question(entries: &[KnowledgeEntry], settings: &ChatbotSettings, message: &str) -> ChatbotAnswer {
    let best = entries
        .iter()
        .filter(|e| e.is_active)
        .map(|e| (e.match_score(message), e))
        .filter(|(score, _)| *score > 0)
        .max_by(|(a_score, a), (b_score, b)| a_score.cmp(b_score).then(a.priority.cmp(&b.priority)));

    match best {
        Some((_, entry)) => ChatbotAnswer {
            answer: entry.answer.clone(),
            matched: true,
            entry_id: Some(entry.id),
            category: Some(entry.category.clone()),
        },
        None => ChatbotAnswer {
            answer: settings.fallback_message.clone(),
            matched: false,
            entry_id: None,
            category: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(question: &str, answer: &str, keywords: &[&str], priority: i32, is_active: bool) -> KnowledgeEntry {
        KnowledgeEntry {
            id: Uuid::new_v4(),
            question: question.to_string(),
            answer: answer.to_string(),
            category: "general".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_best_match_wins() {
        let entries = vec![
            entry("How much does a website cost?", "From $2k", &["price", "cost"], 0, true),
            entry("Where are you located?", "Remote", &["location"], 0, true),
        ];
        let answer = answer_question(&entries, &ChatbotSettings::default(), "What's the price of a site?");
        assert!(answer.matched);
        assert_eq!(answer.answer, "From $2k");
    }

    #[test]
    fn test_priority_breaks_ties() {
        let entries = vec![
            entry("q1", "low", &["hosting"], 1, true),
            entry("q2", "high", &["hosting"], 5, true),
        ];
        let answer = answer_question(&entries, &ChatbotSettings::default(), "do you offer hosting");
        assert_eq!(answer.answer, "high");
    }

    #[test]
    fn test_fallback_and_inactive_entries() {
        let settings = ChatbotSettings::default();
        let entries = vec![entry("q", "hidden", &["hosting"], 0, false)];
        let answer = answer_question(&entries, &settings, "hosting?");
        assert!(!answer.matched);
        assert_eq!(answer.answer, settings.fallback_message);
        assert!(answer.entry_id.is_none());
    }
}
