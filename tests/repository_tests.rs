//! 仓库层集成测试（需要 TEST_DATABASE_URL 指向的 Postgres）

use serde_json::json;
use serial_test::serial;
use studio_backoffice::models::{
    chatbot::ChatbotSettings, knowledge::*, pro_mode::ProModeConfig, project::*, team_member::*,
};
use studio_backoffice::repository::{
    KnowledgeRepository, ProjectRepository, SettingsRepository, TeamMemberRepository,
};

mod common;
use common::{create_test_config, setup_test_db};

fn project_request(title: &str, category: &str, featured: bool) -> CreateProjectRequest {
    serde_json::from_value(json!({
        "title": title,
        "description": "A project",
        "category": category,
        "technologies": ["rust", "axum"],
        "featured": featured,
    }))
    .unwrap()
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_project_crud_and_filters() {
    let pool = setup_test_db(&create_test_config()).await;
    let repo = ProjectRepository::new(pool.clone());

    let web = repo.create(&project_request("Site", "web", true)).await.unwrap();
    repo.create(&project_request("App", "mobile", false)).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 2);

    let featured: ProjectFilters = serde_json::from_value(json!({ "featured": true })).unwrap();
    let found = repo.list(&featured).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, web.id);

    let mobile: ProjectFilters = serde_json::from_value(json!({ "category": "mobile" })).unwrap();
    assert_eq!(repo.list(&mobile).await.unwrap()[0].title, "App");

    // 部分更新只修改给出的字段
    let update: UpdateProjectRequest = serde_json::from_value(json!({ "title": "Site v2" })).unwrap();
    let updated = repo.update(web.id, &update).await.unwrap().unwrap();
    assert_eq!(updated.title, "Site v2");
    assert_eq!(updated.category, "web");
    assert!(updated.featured);

    assert!(repo.delete(web.id).await.unwrap());
    assert!(!repo.delete(web.id).await.unwrap());
    assert!(repo.get(web.id).await.unwrap().is_none());
    assert!(repo.update(web.id, &update).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_team_member_active_filter() {
    let pool = setup_test_db(&create_test_config()).await;
    let repo = TeamMemberRepository::new(pool.clone());

    let active: CreateTeamMemberRequest =
        serde_json::from_value(json!({ "name": "Ada", "role": "Engineer" })).unwrap();
    let inactive: CreateTeamMemberRequest =
        serde_json::from_value(json!({ "name": "Bob", "role": "Designer", "is_active": false })).unwrap();

    let ada = repo.create(&active).await.unwrap();
    repo.create(&inactive).await.unwrap();

    assert_eq!(repo.list(true).await.unwrap().len(), 1);
    assert_eq!(repo.list(false).await.unwrap().len(), 2);

    let update: UpdateTeamMemberRequest = serde_json::from_value(json!({ "is_active": false })).unwrap();
    let updated = repo.update(ada.id, &update).await.unwrap().unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.name, "Ada");
    assert!(repo.list(true).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_knowledge_keywords_normalized() {
    let pool = setup_test_db(&create_test_config()).await;
    let repo = KnowledgeRepository::new(pool.clone());

    let req: CreateKnowledgeRequest = serde_json::from_value(json!({
        "question": "What are your prices?",
        "answer": "Projects start at $1k.",
        "keywords": [" Pricing ", "cost", "pricing", ""],
        "priority": 5,
    }))
    .unwrap();
    let entry = repo.create(&req).await.unwrap();
    assert_eq!(entry.keywords, vec!["cost".to_string(), "pricing".to_string()]);
    assert_eq!(entry.category, "general");

    assert_eq!(repo.list(true).await.unwrap().len(), 1);
    assert!(repo.delete(entry.id).await.unwrap());
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_settings_singletons() {
    let pool = setup_test_db(&create_test_config()).await;
    let repo = SettingsRepository::new(pool.clone());

    // 无记录时返回默认值
    let defaults = repo.chatbot_settings().await.unwrap();
    assert_eq!(defaults.bot_name, ChatbotSettings::default().bot_name);

    let mut settings = defaults.clone();
    settings.bot_name = "Studio Bot".to_string();
    repo.save_chatbot_settings(&settings).await.unwrap();
    settings.enabled = false;
    repo.save_chatbot_settings(&settings).await.unwrap();

    let stored = repo.chatbot_settings().await.unwrap();
    assert_eq!(stored.bot_name, "Studio Bot");
    assert!(!stored.enabled);

    let mut pro = ProModeConfig::default();
    assert!(!repo.pro_mode().await.unwrap().enabled);
    pro.enabled = true;
    pro.title = "Booking".to_string();
    let saved = repo.save_pro_mode(&pro).await.unwrap();
    assert!(saved.enabled);
    assert_eq!(repo.pro_mode().await.unwrap().title, "Booking");
}
