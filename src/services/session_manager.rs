//! 会话管理服务
//!
//! 按 (IP, 设备指纹) 跟踪会话并计算启发式安全分。
//! "活跃" 在每次读取时按最后活动时间重新判定；后台清理任务周期性地
//! 重新归类并删除超过 24 小时无活动的会话。

use crate::{
    models::security::{DeviceType, GeoLocation, RiskLevel, SessionInfo, SessionStats},
    services::device,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// 超过该时长无活动视为不活跃
pub const ACTIVE_WINDOW_MINUTES: i64 = 30;

/// 超过该时长无活动的会话被清除
pub const PURGE_AFTER_HOURS: i64 = 24;

const LONG_SESSION_HOURS: i64 = 4;
const HIGH_ACTIVITY_PER_MINUTE: f64 = 10.0;
const MAX_SESSIONS_PER_IP: usize = 3;

const PENALTY_LONG_SESSION: i32 = 10;
const PENALTY_HIGH_ACTIVITY: i32 = 15;
const PENALTY_UNKNOWN_DEVICE: i32 = 5;
const PENALTY_BOT_AGENT: i32 = 20;
const PENALTY_CONCURRENT_SESSIONS: i32 = 15;

fn is_recent(session: &SessionInfo, now: DateTime<Utc>) -> bool {
    now - session.last_activity <= Duration::minutes(ACTIVE_WINDOW_MINUTES)
}

/// 按会话当前属性重新计算安全分（0-100）
///
/// `concurrent_sessions` 为同一 IP 下的活跃会话数（含本会话）。
pub fn compute_security_score(session: &SessionInfo, concurrent_sessions: usize) -> u8 {
    let mut score: i32 = 100;

    let duration = session.last_activity - session.start_time;
    if duration > Duration::hours(LONG_SESSION_HOURS) {
        score -= PENALTY_LONG_SESSION;
    }

    let minutes = (duration.num_seconds() as f64 / 60.0).max(1.0);
    if session.activity_count as f64 / minutes > HIGH_ACTIVITY_PER_MINUTE {
        score -= PENALTY_HIGH_ACTIVITY;
    }

    if session.device_info.device_type == DeviceType::Unknown {
        score -= PENALTY_UNKNOWN_DEVICE;
    }

    if session.device_info.is_bot {
        score -= PENALTY_BOT_AGENT;
    }

    if concurrent_sessions > MAX_SESSIONS_PER_IP {
        score -= PENALTY_CONCURRENT_SESSIONS;
    }

    score.clamp(0, 100) as u8
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionInfo>>,
    /// 会话 ID -> 当前有效令牌的 jti
    tokens: RwLock<HashMap<String, String>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// 创建或更新会话
    pub async fn create_or_update_session(
        &self,
        ip: &str,
        user_agent: &str,
        fingerprint: &str,
    ) -> SessionInfo {
        self.create_or_update_session_at(ip, user_agent, fingerprint, Utc::now())
            .await
    }

    pub async fn create_or_update_session_at(
        &self,
        ip: &str,
        user_agent: &str,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> SessionInfo {
        let id = device::session_id(ip, fingerprint);
        let mut sessions = self.sessions.write().await;

        let concurrent = sessions
            .values()
            .filter(|s| s.ip == ip && s.id != id && s.is_active && is_recent(s, now))
            .count()
            + 1;

        let session = match sessions.get_mut(&id) {
            Some(existing) => {
                existing.last_activity = now;
                existing.activity_count = existing.activity_count.saturating_add(1);
                existing.duration = (now - existing.start_time).num_seconds();
                existing.is_active = true;
                if existing.user_agent != user_agent {
                    existing.user_agent = user_agent.to_string();
                    existing.device_info = device::parse_user_agent(user_agent);
                }
                existing.security_score = compute_security_score(existing, concurrent);
                existing.risk_level = RiskLevel::from_security_score(existing.security_score);
                existing.clone()
            }
            None => {
                let session = SessionInfo {
                    id: id.clone(),
                    ip: ip.to_string(),
                    user_agent: user_agent.to_string(),
                    device_fingerprint: fingerprint.to_string(),
                    start_time: now,
                    last_activity: now,
                    duration: 0,
                    is_active: true,
                    security_score: 100,
                    risk_level: RiskLevel::Low,
                    activity_count: 1,
                    device_info: device::parse_user_agent(user_agent),
                    location: None,
                };
                tracing::info!(
                    session_id = %session.id,
                    ip = %ip,
                    device = ?session.device_info.device_type,
                    "Session created"
                );
                sessions.insert(id, session.clone());
                session
            }
        };

        if session.risk_level >= RiskLevel::High {
            tracing::warn!(
                session_id = %session.id,
                score = session.security_score,
                risk = session.risk_level.as_str(),
                "High risk session"
            );
        }

        session
    }

    /// 附加地理位置信息
    pub async fn attach_location(&self, id: &str, location: GeoLocation) -> bool {
        match self.sessions.write().await.get_mut(id) {
            Some(session) => {
                session.location = Some(location);
                true
            }
            None => false,
        }
    }

    /// 绑定登录签发的令牌，覆盖该会话此前的令牌
    pub async fn bind_token(&self, id: &str, jti: &str) {
        self.tokens.write().await.insert(id.to_string(), jti.to_string());
    }

    pub async fn is_token_current(&self, id: &str, jti: &str) -> bool {
        self.is_token_current_at(id, jti, Utc::now()).await
    }

    /// 令牌仍有效：会话存在且活跃，并且绑定的 jti 一致
    pub async fn is_token_current_at(&self, id: &str, jti: &str, now: DateTime<Utc>) -> bool {
        let bound = self.tokens.read().await.get(id).is_some_and(|j| j == jti);
        if !bound {
            return false;
        }
        self.session_at(id, now).await.is_some_and(|s| s.is_active)
    }

    /// 结束会话（登出），同时吊销其令牌
    pub async fn end_session(&self, id: &str) -> bool {
        self.tokens.write().await.remove(id);
        match self.sessions.write().await.get_mut(id) {
            Some(session) => {
                session.is_active = false;
                tracing::info!(session_id = %id, "Session ended");
                true
            }
            None => false,
        }
    }

    pub async fn session(&self, id: &str) -> Option<SessionInfo> {
        self.session_at(id, Utc::now()).await
    }

    pub async fn session_at(&self, id: &str, now: DateTime<Utc>) -> Option<SessionInfo> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| Self::classified(s, now))
    }

    /// 当前活跃会话（最近活动在前）
    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        self.active_sessions_at(Utc::now()).await
    }

    pub async fn active_sessions_at(&self, now: DateTime<Utc>) -> Vec<SessionInfo> {
        let mut active: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| Self::classified(s, now))
            .filter(|s| s.is_active)
            .collect();
        active.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        active
    }

    pub async fn all_sessions(&self) -> Vec<SessionInfo> {
        let now = Utc::now();
        let mut all: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| Self::classified(s, now))
            .collect();
        all.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        all
    }

    /// 周期清理：重新归类活跃状态并删除过期会话，返回删除数量
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;

        for session in sessions.values_mut() {
            if session.is_active && !is_recent(session, now) {
                session.is_active = false;
            }
        }

        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_activity <= Duration::hours(PURGE_AFTER_HOURS));
        let purged = before - sessions.len();
        self.tokens.write().await.retain(|id, _| sessions.contains_key(id));

        if purged > 0 {
            tracing::debug!(purged, remaining = sessions.len(), "Expired sessions purged");
        }

        purged
    }

    pub async fn stats(&self) -> SessionStats {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> SessionStats {
        let sessions = self.sessions.read().await;

        let mut by_risk: BTreeMap<String, usize> = BTreeMap::new();
        let mut active = 0;
        let mut score_sum = 0u64;

        for session in sessions.values() {
            let view = Self::classified(session, now);
            if view.is_active {
                active += 1;
            }
            score_sum += view.security_score as u64;
            *by_risk.entry(view.risk_level.as_str().to_string()).or_default() += 1;
        }

        SessionStats {
            total: sessions.len(),
            active,
            by_risk,
            average_score: if sessions.is_empty() {
                0.0
            } else {
                score_sum as f64 / sessions.len() as f64
            },
        }
    }

    /// 读取视图：活跃 = is_active 且最近 30 分钟内有活动
    fn classified(session: &SessionInfo, now: DateTime<Utc>) -> SessionInfo {
        let mut view = session.clone();
        view.is_active = session.is_active && is_recent(session, now);
        view
    }
}
