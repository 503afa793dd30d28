//! 固定窗口限流器
//! 按 (作用域, 客户端) 计数，窗口到期后重置；仅保存在进程内存中

use crate::{config::RateLimitRule, models::security::RateLimitDecision};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// 限流作用域，每个作用域使用独立的规则和计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    Login,
    Contact,
    Api,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Login => "login",
            RateLimitScope::Contact => "contact",
            RateLimitScope::Api => "api",
        }
    }
}

/// 各作用域的限流规则
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRules {
    pub login: RateLimitRule,
    pub contact: RateLimitRule,
    pub api: RateLimitRule,
}

impl RateLimitRules {
    pub fn for_scope(&self, scope: RateLimitScope) -> RateLimitRule {
        match scope {
            RateLimitScope::Login => self.login,
            RateLimitScope::Contact => self.contact,
            RateLimitScope::Api => self.api,
        }
    }
}

impl From<&crate::config::SecurityConfig> for RateLimitRules {
    fn from(config: &crate::config::SecurityConfig) -> Self {
        Self {
            login: config.login_rate_limit,
            contact: config.contact_rate_limit,
            api: config.api_rate_limit,
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    count: u32,
    reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    rules: RateLimitRules,
    buckets: Mutex<HashMap<(RateLimitScope, String), Bucket>>,
}

impl RateLimiter {
    pub fn new(rules: RateLimitRules) -> Self {
        Self {
            rules,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> &RateLimitRules {
        &self.rules
    }

    /// 计数并判断是否放行
    pub async fn check(&self, scope: RateLimitScope, key: &str) -> RateLimitDecision {
        self.check_at(scope, key, Utc::now()).await
    }

    pub async fn check_at(&self, scope: RateLimitScope, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let rule = self.rules.for_scope(scope);
        let mut buckets = self.buckets.lock().await;

        let bucket = buckets
            .entry((scope, key.to_string()))
            .or_insert_with(|| Bucket {
                count: 0,
                reset_at: now + Duration::seconds(rule.window_secs as i64),
            });

        if now >= bucket.reset_at {
            bucket.count = 0;
            bucket.reset_at = now + Duration::seconds(rule.window_secs as i64);
        }

        bucket.count = bucket.count.saturating_add(1);

        RateLimitDecision {
            allowed: bucket.count <= rule.max_requests,
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(bucket.count),
            reset_at: bucket.reset_at,
        }
    }

    /// 清除某个客户端在所有作用域下的计数（例如登录成功后）
    pub async fn reset(&self, key: &str) {
        self.buckets.lock().await.retain(|(_, k), _| k != key);
    }

    /// 删除已过期的窗口，返回删除数量
    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.reset_at > now);
        before - buckets.len()
    }

    pub async fn tracked_keys(&self) -> usize {
        self.buckets.lock().await.len()
    }
}
