//! 安全监控领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 事件、告警与会话共用的风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// 按 IP 最近一小时的事件数划分等级
    pub fn from_event_count(count: usize) -> Self {
        match count {
            c if c >= 10 => RiskLevel::Critical,
            c if c >= 5 => RiskLevel::High,
            c if c >= 2 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    /// 将 0-100 的会话安全分映射为等级
    pub fn from_security_score(score: u8) -> Self {
        match score {
            s if s >= 80 => RiskLevel::Low,
            s if s >= 60 => RiskLevel::Medium,
            s if s >= 40 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    UnauthorizedAccess,
    FailedLogin,
    SuspiciousActivity,
    RateLimitExceeded,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::UnauthorizedAccess => "unauthorized_access",
            SecurityEventType::FailedLogin => "failed_login",
            SecurityEventType::SuspiciousActivity => "suspicious_activity",
            SecurityEventType::RateLimitExceeded => "rate_limit_exceeded",
        }
    }

    pub fn all() -> [SecurityEventType; 4] {
        [
            SecurityEventType::UnauthorizedAccess,
            SecurityEventType::FailedLogin,
            SecurityEventType::SuspiciousActivity,
            SecurityEventType::RateLimitExceeded,
        ]
    }
}

impl std::str::FromStr for SecurityEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unauthorized_access" => Ok(SecurityEventType::UnauthorizedAccess),
            "failed_login" => Ok(SecurityEventType::FailedLogin),
            "suspicious_activity" => Ok(SecurityEventType::SuspiciousActivity),
            "rate_limit_exceeded" => Ok(SecurityEventType::RateLimitExceeded),
            other => Err(format!("unknown security event type: {}", other)),
        }
    }
}

/// 已记录的安全事件，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub details: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub events: Vec<SecurityEvent>,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub risk_level: RiskLevel,
}

impl SecurityAlert {
    /// 该组事件共同的 IP
    pub fn ip(&self) -> Option<&str> {
        self.events.first().map(|e| e.ip.as_str())
    }

    pub fn event_type(&self) -> Option<SecurityEventType> {
        self.events.first().map(|e| e.event_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

/// 从 UA 尽力解析出的设备信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub ip: String,
    pub country: String,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: Option<String>,
    pub timezone: Option<String>,
    /// 应答的服务商，内网地址为 "local"
    pub source: String,
}

impl GeoLocation {
    pub fn local(ip: &str) -> Self {
        Self {
            ip: ip.to_string(),
            country: "Local Network".to_string(),
            country_code: None,
            region: None,
            city: None,
            latitude: None,
            longitude: None,
            isp: None,
            timezone: None,
            source: "local".to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.city, &self.region) {
            (Some(city), Some(region)) => format!("{}, {}, {}", city, region, self.country),
            (Some(city), None) => format!("{}, {}", city, self.country),
            _ => self.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub ip: String,
    pub user_agent: String,
    pub device_fingerprint: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// 开始到最后活动之间的秒数
    pub duration: i64,
    pub is_active: bool,
    pub security_score: u8,
    pub risk_level: RiskLevel,
    pub activity_count: u32,
    pub device_info: DeviceInfo,
    pub location: Option<GeoLocation>,
}

/// 固定窗口限流的检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// 当前被服务端封禁的客户端
#[derive(Debug, Clone, Serialize)]
pub struct BlockedClient {
    pub key: String,
    /// 触发本条封禁的 IP
    pub ip: String,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SecurityStats {
    pub total_events: usize,
    pub events_last_hour: usize,
    pub events_by_type: std::collections::BTreeMap<String, usize>,
    pub events_by_risk: std::collections::BTreeMap<String, usize>,
    pub total_alerts: usize,
    pub unacknowledged_alerts: usize,
    pub blocked_clients: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub active: usize,
    pub by_risk: std::collections::BTreeMap<String, usize>,
    pub average_score: f64,
}
