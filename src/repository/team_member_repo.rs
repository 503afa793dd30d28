//! Team member repository (团队成员数据访问)

use crate::{error::AppError, models::team_member::*};
use sqlx::PgPool;
use uuid::Uuid;

pub struct TeamMemberRepository {
    db: PgPool,
}

impl TeamMemberRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 列出成员；`active_only` 为 true 时只返回在职成员
    pub async fn list(&self, active_only: bool) -> Result<Vec<TeamMember>, AppError> {
        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT * FROM team_members
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY display_order ASC, created_at ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    pub async fn create(&self, req: &CreateTeamMemberRequest) -> Result<TeamMember, AppError> {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (
                name, role, bio, image_url, email, linkedin_url, github_url,
                twitter_url, skills, display_order, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.role)
        .bind(&req.bio)
        .bind(&req.image_url)
        .bind(&req.email)
        .bind(&req.linkedin_url)
        .bind(&req.github_url)
        .bind(&req.twitter_url)
        .bind(&req.skills)
        .bind(req.display_order)
        .bind(req.is_active)
        .fetch_one(&self.db)
        .await?;

        Ok(member)
    }

    pub async fn update(&self, id: Uuid, req: &UpdateTeamMemberRequest) -> Result<Option<TeamMember>, AppError> {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            UPDATE team_members
            SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                bio = COALESCE($4, bio),
                image_url = COALESCE($5, image_url),
                email = COALESCE($6, email),
                linkedin_url = COALESCE($7, linkedin_url),
                github_url = COALESCE($8, github_url),
                twitter_url = COALESCE($9, twitter_url),
                skills = COALESCE($10, skills),
                display_order = COALESCE($11, display_order),
                is_active = COALESCE($12, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.role)
        .bind(&req.bio)
        .bind(&req.image_url)
        .bind(&req.email)
        .bind(&req.linkedin_url)
        .bind(&req.github_url)
        .bind(&req.twitter_url)
        .bind(&req.skills)
        .bind(req.display_order)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(member)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
