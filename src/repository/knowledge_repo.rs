//! Knowledge base repository (聊天机器人知识库)

use crate::{error::AppError, models::knowledge::*};
use sqlx::PgPool;
use uuid::Uuid;

pub struct KnowledgeRepository {
    db: PgPool,
}

impl KnowledgeRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<KnowledgeEntry>, AppError> {
        let entries = sqlx::query_as::<_, KnowledgeEntry>(
            r#"
            SELECT * FROM knowledge_base
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn create(&self, req: &CreateKnowledgeRequest) -> Result<KnowledgeEntry, AppError> {
        let entry = sqlx::query_as::<_, KnowledgeEntry>(
            r#"
            INSERT INTO knowledge_base (question, answer, category, keywords, priority, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&req.question)
        .bind(&req.answer)
        .bind(&req.category)
        .bind(normalize_keywords(&req.keywords))
        .bind(req.priority)
        .bind(req.is_active)
        .fetch_one(&self.db)
        .await?;

        Ok(entry)
    }

    pub async fn update(&self, id: Uuid, req: &UpdateKnowledgeRequest) -> Result<Option<KnowledgeEntry>, AppError> {
        let entry = sqlx::query_as::<_, KnowledgeEntry>(
            r#"
            UPDATE knowledge_base
            SET
                question = COALESCE($2, question),
                answer = COALESCE($3, answer),
                category = COALESCE($4, category),
                keywords = COALESCE($5, keywords),
                priority = COALESCE($6, priority),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.question)
        .bind(&req.answer)
        .bind(&req.category)
        .bind(req.keywords.as_deref().map(normalize_keywords))
        .bind(req.priority)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(entry)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM knowledge_base WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// 关键词统一小写、去空白并去重
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keywords() {
        let keywords = vec![" Pricing ".to_string(), "price".to_string(), "PRICING".to_string(), "".to_string()];
        assert_eq!(normalize_keywords(&keywords), vec!["price", "pricing"]);
    }
}
