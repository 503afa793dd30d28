//! Database repository layer

pub mod knowledge_repo;
pub mod project_repo;
pub mod settings_repo;
pub mod team_member_repo;

pub use knowledge_repo::KnowledgeRepository;
pub use project_repo::ProjectRepository;
pub use settings_repo::SettingsRepository;
pub use team_member_repo::TeamMemberRepository;
