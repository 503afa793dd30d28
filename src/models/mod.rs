//! 数据模型模块

pub mod chatbot;
pub mod contact;
pub mod knowledge;
pub mod pro_mode;
pub mod project;
pub mod security;
pub mod team_member;
