//! Singleton settings rows: chatbot widget and Pro Mode (id = 1)

use crate::{
    error::AppError,
    models::{chatbot::ChatbotSettings, pro_mode::ProModeConfig},
};
use sqlx::PgPool;

pub struct SettingsRepository {
    db: PgPool,
}

impl SettingsRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 读取聊天机器人设置，未保存过时返回默认值
    pub async fn chatbot_settings(&self) -> Result<ChatbotSettings, AppError> {
        let settings = sqlx::query_as::<_, ChatbotSettings>(
            r#"
            SELECT enabled, bot_name, welcome_message, fallback_message, primary_color,
                   position, response_delay_ms, show_on_mobile, updated_at
            FROM chatbot_settings WHERE id = 1
            "#,
        )
        .fetch_optional(&self.db)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    pub async fn save_chatbot_settings(&self, settings: &ChatbotSettings) -> Result<ChatbotSettings, AppError> {
        let saved = sqlx::query_as::<_, ChatbotSettings>(
            r#"
            INSERT INTO chatbot_settings (
                id, enabled, bot_name, welcome_message, fallback_message, primary_color,
                position, response_delay_ms, show_on_mobile, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                bot_name = EXCLUDED.bot_name,
                welcome_message = EXCLUDED.welcome_message,
                fallback_message = EXCLUDED.fallback_message,
                primary_color = EXCLUDED.primary_color,
                position = EXCLUDED.position,
                response_delay_ms = EXCLUDED.response_delay_ms,
                show_on_mobile = EXCLUDED.show_on_mobile,
                updated_at = NOW()
            RETURNING enabled, bot_name, welcome_message, fallback_message, primary_color,
                      position, response_delay_ms, show_on_mobile, updated_at
            "#,
        )
        .bind(settings.enabled)
        .bind(&settings.bot_name)
        .bind(&settings.welcome_message)
        .bind(&settings.fallback_message)
        .bind(&settings.primary_color)
        .bind(&settings.position)
        .bind(settings.response_delay_ms)
        .bind(settings.show_on_mobile)
        .fetch_one(&self.db)
        .await?;

        Ok(saved)
    }

    /// 读取 Pro Mode 配置，未保存过时返回默认值（关闭）
    pub async fn pro_mode(&self) -> Result<ProModeConfig, AppError> {
        let config = sqlx::query_as::<_, ProModeConfig>(
            r#"
            SELECT enabled, title, message, start_time, end_time, updated_at
            FROM pro_mode_config WHERE id = 1
            "#,
        )
        .fetch_optional(&self.db)
        .await?;

        Ok(config.unwrap_or_default())
    }

    pub async fn save_pro_mode(&self, config: &ProModeConfig) -> Result<ProModeConfig, AppError> {
        let saved = sqlx::query_as::<_, ProModeConfig>(
            r#"
            INSERT INTO pro_mode_config (id, enabled, title, message, start_time, end_time, updated_at)
            VALUES (1, $1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                title = EXCLUDED.title,
                message = EXCLUDED.message,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                updated_at = NOW()
            RETURNING enabled, title, message, start_time, end_time, updated_at
            "#,
        )
        .bind(config.enabled)
        .bind(&config.title)
        .bind(&config.message)
        .bind(config.start_time)
        .bind(config.end_time)
        .fetch_one(&self.db)
        .await?;

        Ok(saved)
    }
}
