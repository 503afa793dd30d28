//! Project repository (作品数据访问)

use crate::{error::AppError, models::project::*};
use sqlx::PgPool;
use uuid::Uuid;

pub struct ProjectRepository {
    db: PgPool,
}

impl ProjectRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 按展示顺序列出作品，可按精选与分类过滤
    pub async fn list(&self, filters: &ProjectFilters) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE ($1::BOOLEAN IS NULL OR featured = $1)
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY display_order ASC, created_at DESC
            "#,
        )
        .bind(filters.featured)
        .bind(filters.category.as_deref().filter(|c| !c.is_empty()))
        .fetch_all(&self.db)
        .await?;

        Ok(projects)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(project)
    }

    pub async fn create(&self, req: &CreateProjectRequest) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                title, description, category, image_url, live_url, github_url,
                technologies, featured, display_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(&req.image_url)
        .bind(&req.live_url)
        .bind(&req.github_url)
        .bind(&req.technologies)
        .bind(req.featured)
        .bind(req.display_order)
        .fetch_one(&self.db)
        .await?;

        Ok(project)
    }

    /// 部分更新，未提供的字段保持不变
    pub async fn update(&self, id: Uuid, req: &UpdateProjectRequest) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                image_url = COALESCE($5, image_url),
                live_url = COALESCE($6, live_url),
                github_url = COALESCE($7, github_url),
                technologies = COALESCE($8, technologies),
                featured = COALESCE($9, featured),
                display_order = COALESCE($10, display_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(&req.image_url)
        .bind(&req.live_url)
        .bind(&req.github_url)
        .bind(&req.technologies)
        .bind(req.featured)
        .bind(req.display_order)
        .fetch_optional(&self.db)
        .await?;

        Ok(project)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
