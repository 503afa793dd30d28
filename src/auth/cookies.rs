//! Cookie 解析与 Set-Cookie 构建
//!
//! 后台使用四个 Cookie：
//! - `admin-auth`: 签名的管理会话令牌
//! - `failed-attempts`: 连续失败登录次数
//! - `security-block` / `block-timestamp`: 客户端侧封禁标记与封禁时间（毫秒）

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub const ADMIN_AUTH: &str = "admin-auth";
pub const FAILED_ATTEMPTS: &str = "failed-attempts";
pub const SECURITY_BLOCK: &str = "security-block";
pub const BLOCK_TIMESTAMP: &str = "block-timestamp";

/// 解析请求中的所有 Cookie（同名时保留第一个）
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies
                        .entry(name.to_string())
                        .or_insert_with(|| value.trim().trim_matches('"').to_string());
                }
            }
        }
    }
    cookies
}

/// Set-Cookie 公共属性
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub max_age_secs: u64,
    pub secure: bool,
}

pub fn build_cookie(name: &str, value: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        name, value, options.max_age_secs
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expire_cookie(name: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict",
        name
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// 追加 Set-Cookie 头；无法编码的值会被跳过
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Skipping invalid Set-Cookie value"),
    }
}

/// 客户端携带的安全相关 Cookie
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityCookies {
    pub admin_token: Option<String>,
    pub failed_attempts: u32,
    pub security_block: bool,
    pub block_timestamp_ms: Option<i64>,
}

impl SecurityCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = parse_cookies(headers);
        Self {
            admin_token: cookies.get(ADMIN_AUTH).filter(|v| !v.is_empty()).cloned(),
            failed_attempts: cookies
                .get(FAILED_ATTEMPTS)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            security_block: cookies.get(SECURITY_BLOCK).map(|v| v == "true").unwrap_or(false),
            block_timestamp_ms: cookies.get(BLOCK_TIMESTAMP).and_then(|v| v.parse().ok()),
        }
    }

    /// 仅凭 Cookie 判断是否处于封禁状态
    ///
    /// `security-block=true` 即视为封禁，只有早于封禁时长的 `block-timestamp` 才能解除；
    /// 失败次数达到阈值时无论时间戳如何都视为封禁。
    pub fn is_blocked_at(&self, threshold: u32, block_duration: Duration, now: DateTime<Utc>) -> bool {
        if self.failed_attempts >= threshold {
            return true;
        }

        if !self.security_block {
            return false;
        }

        match self.block_timestamp_ms.and_then(DateTime::<Utc>::from_timestamp_millis) {
            Some(ts) => now - ts < block_duration,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie.parse().unwrap());
        headers
    }

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies(&headers("a=1; b = two ; c=\"quoted\"; empty="));
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("two"));
        assert_eq!(cookies.get("c").map(String::as_str), Some("quoted"));
        assert_eq!(cookies.get("empty").map(String::as_str), Some(""));
    }

    #[test]
    fn test_build_cookie_attributes() {
        let cookie = build_cookie(FAILED_ATTEMPTS, "2", CookieOptions { max_age_secs: 1800, secure: false });
        assert_eq!(cookie, "failed-attempts=2; Path=/; Max-Age=1800; HttpOnly; SameSite=Strict");

        let secure = build_cookie(ADMIN_AUTH, "tok", CookieOptions { max_age_secs: 1800, secure: true });
        assert!(secure.ends_with("; Secure"));

        assert!(expire_cookie(ADMIN_AUTH, false).contains("Max-Age=0"));
    }

    #[test]
    fn test_security_cookies_threshold() {
        let now = Utc::now();
        let duration = Duration::minutes(30);

        let clean = SecurityCookies::from_headers(&HeaderMap::new());
        assert!(!clean.is_blocked_at(2, duration, now));

        let once = SecurityCookies::from_headers(&headers("failed-attempts=1"));
        assert!(!once.is_blocked_at(2, duration, now));

        let twice = SecurityCookies::from_headers(&headers("failed-attempts=2"));
        assert!(twice.is_blocked_at(2, duration, now));
    }

    #[test]
    fn test_block_cookie_expires() {
        let now = Utc::now();
        let duration = Duration::minutes(30);
        let recent = (now - Duration::minutes(5)).timestamp_millis();
        let stale = (now - Duration::minutes(45)).timestamp_millis();

        let blocked = SecurityCookies::from_headers(&headers(&format!("security-block=true; block-timestamp={}", recent)));
        assert!(blocked.is_blocked_at(2, duration, now));

        let expired = SecurityCookies::from_headers(&headers(&format!("security-block=true; block-timestamp={}", stale)));
        assert!(!expired.is_blocked_at(2, duration, now));

        let no_timestamp = SecurityCookies::from_headers(&headers("security-block=true"));
        assert!(no_timestamp.is_blocked_at(2, duration, now));

        let bad_timestamp = SecurityCookies::from_headers(&headers("security-block=true; block-timestamp=soon"));
        assert!(bad_timestamp.is_blocked_at(2, duration, now));
    }
}
