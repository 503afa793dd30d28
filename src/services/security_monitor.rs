//! 安全事件监控服务
//!
//! 记录安全事件、派生风险等级、在阈值触发时生成告警，并维护服务端封禁表。
//! 所有状态仅存在于进程内存中，重启即丢失，多实例之间互不共享。

use crate::{
    models::security::{
        BlockedClient, RateLimitDecision, RiskLevel, SecurityAlert, SecurityEvent,
        SecurityEventType, SecurityStats,
    },
    services::{
        mail_service::AlertNotifier,
        rate_limiter::{RateLimitRules, RateLimitScope, RateLimiter},
    },
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 同类型、同 IP 事件达到该数量时生成告警
pub const ALERT_EVENT_THRESHOLD: usize = 3;

/// 告警聚合窗口
pub const ALERT_WINDOW_MINUTES: i64 = 5;

/// 风险等级统计窗口
pub const RISK_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub max_events: usize,
    pub max_alerts: usize,
    /// 失败登录计数的保留窗口，自最后一次失败起算
    pub failed_login_window: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_alerts: 100,
            failed_login_window: Duration::minutes(30),
        }
    }
}

/// 事件查询条件
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<SecurityEventType>,
    pub ip: Option<String>,
}

#[derive(Default)]
struct MonitorState {
    /// 最新的事件在最前
    events: VecDeque<SecurityEvent>,
    /// 最新的告警在最前
    alerts: VecDeque<SecurityAlert>,
    /// 以 "ip:<addr>" 或 "fp:<fingerprint>" 为键
    blocks: HashMap<String, BlockedClient>,
    /// 按 IP 统计的连续失败登录，不依赖客户端 Cookie
    failed_logins: HashMap<String, FailedLogins>,
}

#[derive(Debug, Clone, Copy)]
struct FailedLogins {
    count: u32,
    last_at: DateTime<Utc>,
}

pub struct SecurityMonitor {
    config: MonitorConfig,
    state: RwLock<MonitorState>,
    rate_limiter: RateLimiter,
    notifier: Option<Arc<dyn AlertNotifier>>,
}

fn ip_key(ip: &str) -> String {
    format!("ip:{}", ip)
}

fn fingerprint_key(fingerprint: &str) -> String {
    format!("fp:{}", fingerprint)
}

impl SecurityMonitor {
    pub fn new(config: MonitorConfig, rules: RateLimitRules) -> Self {
        Self {
            config,
            state: RwLock::new(MonitorState::default()),
            rate_limiter: RateLimiter::new(rules),
            notifier: None,
        }
    }

    /// 配置告警通知（邮件），发送失败只记录日志
    pub fn with_notifier(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// 记录安全事件
    pub async fn record_event(
        &self,
        event_type: SecurityEventType,
        ip: &str,
        user_agent: &str,
        details: impl Into<String>,
    ) -> SecurityEvent {
        self.record_event_at(event_type, ip, user_agent, details, Utc::now())
            .await
    }

    pub async fn record_event_at(
        &self,
        event_type: SecurityEventType,
        ip: &str,
        user_agent: &str,
        details: impl Into<String>,
        now: DateTime<Utc>,
    ) -> SecurityEvent {
        let details = details.into();

        let (event, alert) = {
            let mut state = self.state.write().await;

            let risk_window_start = now - Duration::minutes(RISK_WINDOW_MINUTES);
            let recent_for_ip = state
                .events
                .iter()
                .filter(|e| e.ip == ip && e.timestamp >= risk_window_start)
                .count();

            let event = SecurityEvent {
                id: Uuid::new_v4(),
                event_type,
                timestamp: now,
                ip: ip.to_string(),
                user_agent: user_agent.to_string(),
                details,
                risk_level: RiskLevel::from_event_count(recent_for_ip + 1),
            };

            state.events.push_front(event.clone());
            state.events.truncate(self.config.max_events);

            let alert = self.evaluate_alert(&mut state, &event, now);
            (event, alert)
        };

        metrics::counter!("security_events_total", "type" => event.event_type.as_str()).increment(1);
        tracing::warn!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            ip = %event.ip,
            risk = event.risk_level.as_str(),
            details = %event.details,
            "Security event recorded"
        );

        if let Some(alert) = alert {
            self.dispatch_alert(alert);
        }

        event
    }

    /// 同类型、同 IP 的事件在窗口内达到阈值时生成告警
    ///
    /// 窗口内已存在同 (ip, type) 的未确认告警时不重复生成。
    fn evaluate_alert(
        &self,
        state: &mut MonitorState,
        event: &SecurityEvent,
        now: DateTime<Utc>,
    ) -> Option<SecurityAlert> {
        let window_start = now - Duration::minutes(ALERT_WINDOW_MINUTES);

        let related: Vec<SecurityEvent> = state
            .events
            .iter()
            .filter(|e| {
                e.ip == event.ip && e.event_type == event.event_type && e.timestamp >= window_start
            })
            .cloned()
            .collect();

        if related.len() < ALERT_EVENT_THRESHOLD {
            return None;
        }

        let already_alerted = state.alerts.iter().any(|a| {
            !a.acknowledged
                && a.timestamp >= window_start
                && a.ip() == Some(event.ip.as_str())
                && a.event_type() == Some(event.event_type)
        });
        if already_alerted {
            return None;
        }

        let risk_level = related
            .iter()
            .map(|e| e.risk_level)
            .max()
            .unwrap_or(event.risk_level);

        let alert = SecurityAlert {
            id: Uuid::new_v4(),
            title: format!("Repeated {} from {}", event.event_type.as_str(), event.ip),
            message: format!(
                "{} {} events from {} within {} minutes",
                related.len(),
                event.event_type.as_str(),
                event.ip,
                ALERT_WINDOW_MINUTES
            ),
            events: related,
            timestamp: now,
            acknowledged: false,
            risk_level,
        };

        state.alerts.push_front(alert.clone());
        state.alerts.truncate(self.config.max_alerts);

        Some(alert)
    }

    fn dispatch_alert(&self, alert: SecurityAlert) {
        metrics::counter!("security_alerts_total").increment(1);
        tracing::error!(
            alert_id = %alert.id,
            title = %alert.title,
            risk = alert.risk_level.as_str(),
            "Security alert raised"
        );

        if let Some(notifier) = self.notifier.clone() {
            tokio::spawn(async move {
                if let Err(e) = notifier.notify(&alert).await {
                    tracing::warn!(alert_id = %alert.id, error = %e, "Failed to send security alert");
                }
            });
        }
    }

    /// 限流检查，超限时记录 rate_limit_exceeded 事件
    pub async fn check_rate_limit(
        &self,
        scope: RateLimitScope,
        ip: &str,
        user_agent: &str,
    ) -> RateLimitDecision {
        self.check_rate_limit_at(scope, ip, user_agent, Utc::now()).await
    }

    pub async fn check_rate_limit_at(
        &self,
        scope: RateLimitScope,
        ip: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let decision = self.rate_limiter.check_at(scope, ip, now).await;

        if !decision.allowed {
            self.record_event_at(
                SecurityEventType::RateLimitExceeded,
                ip,
                user_agent,
                format!(
                    "{} rate limit of {} requests exceeded",
                    scope.as_str(),
                    decision.limit
                ),
                now,
            )
            .await;
        }

        decision
    }

    /// 确认告警（幂等）
    pub async fn acknowledge_alert(&self, id: Uuid) -> Option<SecurityAlert> {
        let mut state = self.state.write().await;
        let alert = state.alerts.iter_mut().find(|a| a.id == id)?;

        if !alert.acknowledged {
            alert.acknowledged = true;
            tracing::info!(alert_id = %id, "Security alert acknowledged");
        }

        Some(alert.clone())
    }

    pub async fn events(&self, limit: usize, filter: &EventFilter) -> Vec<SecurityEvent> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .filter(|e| filter.event_type.map_or(true, |t| e.event_type == t))
            .filter(|e| filter.ip.as_deref().map_or(true, |ip| e.ip == ip))
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn events_for_ip(&self, ip: &str) -> Vec<SecurityEvent> {
        let filter = EventFilter {
            event_type: None,
            ip: Some(ip.to_string()),
        };
        self.events(usize::MAX, &filter).await
    }

    pub async fn alerts(&self, include_acknowledged: bool) -> Vec<SecurityAlert> {
        let state = self.state.read().await;
        state
            .alerts
            .iter()
            .filter(|a| include_acknowledged || !a.acknowledged)
            .cloned()
            .collect()
    }

    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    // ==================== 失败登录 ====================

    /// 记录一次失败登录，返回窗口内的累计次数
    pub async fn record_failed_login(&self, ip: &str) -> u32 {
        self.record_failed_login_at(ip, Utc::now()).await
    }

    pub async fn record_failed_login_at(&self, ip: &str, now: DateTime<Utc>) -> u32 {
        let window = self.config.failed_login_window;
        let mut state = self.state.write().await;
        let entry = state
            .failed_logins
            .entry(ip_key(ip))
            .or_insert(FailedLogins { count: 0, last_at: now });

        if now - entry.last_at >= window {
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        entry.last_at = now;
        entry.count
    }

    pub async fn failed_logins_at(&self, ip: &str, now: DateTime<Utc>) -> u32 {
        let window = self.config.failed_login_window;
        self.state
            .read()
            .await
            .failed_logins
            .get(&ip_key(ip))
            .filter(|f| now - f.last_at < window)
            .map_or(0, |f| f.count)
    }

    /// 登录成功或管理员解封后清零
    pub async fn clear_failed_logins(&self, ip: &str) {
        self.state.write().await.failed_logins.remove(&ip_key(ip));
    }

    // ==================== 封禁 ====================

    /// 在服务端封禁 IP 与设备指纹
    pub async fn block(&self, ip: &str, fingerprint: Option<&str>, duration: Duration, reason: &str) {
        self.block_at(ip, fingerprint, duration, reason, Utc::now()).await
    }

    pub async fn block_at(
        &self,
        ip: &str,
        fingerprint: Option<&str>,
        duration: Duration,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        let mut keys = vec![ip_key(ip)];
        if let Some(fp) = fingerprint.filter(|fp| !fp.is_empty()) {
            keys.push(fingerprint_key(fp));
        }

        let mut state = self.state.write().await;
        for key in keys {
            state.blocks.insert(
                key.clone(),
                BlockedClient {
                    key,
                    ip: ip.to_string(),
                    reason: reason.to_string(),
                    blocked_at: now,
                    expires_at: now + duration,
                },
            );
        }

        tracing::warn!(ip = %ip, reason = %reason, minutes = duration.num_minutes(), "Client blocked");
    }

    pub async fn is_blocked(&self, ip: &str, fingerprint: Option<&str>) -> bool {
        self.is_blocked_at(ip, fingerprint, Utc::now()).await
    }

    pub async fn is_blocked_at(&self, ip: &str, fingerprint: Option<&str>, now: DateTime<Utc>) -> bool {
        let state = self.state.read().await;
        let active = |key: String| state.blocks.get(&key).is_some_and(|b| b.expires_at > now);

        active(ip_key(ip)) || fingerprint.is_some_and(|fp| active(fingerprint_key(fp)))
    }

    /// 解除 IP 封禁（连同该 IP 触发的指纹封禁），返回是否存在该封禁
    pub async fn unblock(&self, ip: &str) -> bool {
        let removed = {
            let mut state = self.state.write().await;
            let before = state.blocks.len();
            state.blocks.retain(|_, b| b.ip != ip);
            state.failed_logins.remove(&ip_key(ip));
            state.blocks.len() < before
        };
        if removed {
            self.rate_limiter.reset(ip).await;
            tracing::info!(ip = %ip, "Client unblocked");
        }
        removed
    }

    pub async fn blocked_clients(&self) -> Vec<BlockedClient> {
        let now = Utc::now();
        let state = self.state.read().await;
        let mut blocked: Vec<BlockedClient> = state
            .blocks
            .values()
            .filter(|b| b.expires_at > now)
            .cloned()
            .collect();
        blocked.sort_by(|a, b| b.blocked_at.cmp(&a.blocked_at));
        blocked
    }

    // ==================== 维护 ====================

    /// 清理过期封禁与限流窗口
    pub async fn cleanup_at(&self, now: DateTime<Utc>) {
        let expired_blocks = {
            let mut state = self.state.write().await;
            let before = state.blocks.len();
            state.blocks.retain(|_, b| b.expires_at > now);
            let window = self.config.failed_login_window;
            state.failed_logins.retain(|_, f| now - f.last_at < window);
            before - state.blocks.len()
        };
        let expired_buckets = self.rate_limiter.cleanup_at(now).await;

        if expired_blocks > 0 || expired_buckets > 0 {
            tracing::debug!(expired_blocks, expired_buckets, "Security monitor cleanup");
        }
    }

    pub async fn stats(&self) -> SecurityStats {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> SecurityStats {
        let state = self.state.read().await;
        let hour_ago = now - Duration::minutes(RISK_WINDOW_MINUTES);

        let mut events_by_type: BTreeMap<String, usize> = SecurityEventType::all()
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        let mut events_by_risk: BTreeMap<String, usize> = BTreeMap::new();

        for event in &state.events {
            *events_by_type
                .entry(event.event_type.as_str().to_string())
                .or_default() += 1;
            *events_by_risk
                .entry(event.risk_level.as_str().to_string())
                .or_default() += 1;
        }

        SecurityStats {
            total_events: state.events.len(),
            events_last_hour: state.events.iter().filter(|e| e.timestamp >= hour_ago).count(),
            events_by_type,
            events_by_risk,
            total_alerts: state.alerts.len(),
            unacknowledged_alerts: state.alerts.iter().filter(|a| !a.acknowledged).count(),
            blocked_clients: state.blocks.values().filter(|b| b.expires_at > now).count(),
        }
    }
}
