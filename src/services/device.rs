//! 设备指纹与 User-Agent 解析
//!
//! 指纹由请求头和 IP 推导，只是弱身份标识：不保证唯一，也很容易伪造。

use crate::models::security::{DeviceInfo, DeviceType};
use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// 浏览器端可自行上报指纹的请求头
pub const FINGERPRINT_HEADER: &str = "x-device-fingerprint";

static BOT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(bot|crawler|spider|scraper|curl|wget|python-requests|python-urllib|httpclient|okhttp|go-http-client|headless|phantomjs|selenium|puppeteer|playwright|scrapy|java/)",
    )
    .expect("valid bot regex")
});

static MOBILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(mobile|iphone|ipod|android|blackberry|opera mini|iemobile|windows phone)")
        .expect("valid mobile regex")
});

static DESKTOP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(windows nt|macintosh|mac os x|x11|linux x86_64|cros)").expect("valid desktop regex")
});

/// UA 是否像自动化工具
pub fn is_bot_user_agent(user_agent: &str) -> bool {
    user_agent.trim().is_empty() || BOT_PATTERN.is_match(user_agent)
}

/// 从 UA 解析设备类型、浏览器与操作系统
pub fn parse_user_agent(user_agent: &str) -> DeviceInfo {
    let is_bot = is_bot_user_agent(user_agent);

    let device_type = if is_bot {
        DeviceType::Unknown
    } else if is_tablet(user_agent) {
        DeviceType::Tablet
    } else if MOBILE_PATTERN.is_match(user_agent) {
        DeviceType::Mobile
    } else if DESKTOP_PATTERN.is_match(user_agent) {
        DeviceType::Desktop
    } else {
        DeviceType::Unknown
    };

    DeviceInfo {
        device_type,
        browser: detect_browser(user_agent).to_string(),
        os: detect_os(user_agent).to_string(),
        is_bot,
    }
}

// regex 不支持前瞻断言，"android 且不含 mobile" 手动判断
fn is_tablet(user_agent: &str) -> bool {
    let lower = user_agent.to_lowercase();
    if lower.contains("android") && !lower.contains("mobile") {
        return true;
    }
    ["ipad", "tablet", "kindle", "silk/", "playbook"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn detect_browser(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();
    // 顺序很重要：Edge/Opera 的 UA 同样包含 chrome 和 safari
    if ua.contains("edg/") || ua.contains("edge/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("firefox/") || ua.contains("fxios") {
        "Firefox"
    } else if ua.contains("chrome/") || ua.contains("crios") {
        "Chrome"
    } else if ua.contains("safari/") {
        "Safari"
    } else if ua.contains("msie") || ua.contains("trident/") {
        "Internet Explorer"
    } else {
        "Unknown"
    }
}

fn detect_os(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();
    if ua.contains("windows") {
        "Windows"
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        "iOS"
    } else if ua.contains("mac os x") || ua.contains("macintosh") {
        "macOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("cros") {
        "ChromeOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

/// 根据请求头和客户端 IP 计算指纹
///
/// 客户端上报的 `x-device-fingerprint` 非空且长度合理时优先使用。
pub fn fingerprint_from_headers(headers: &HeaderMap, ip: &str) -> String {
    if let Some(supplied) = headers
        .get(FINGERPRINT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
    {
        return supplied.to_string();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    compute_fingerprint(
        &header("user-agent"),
        &header("accept-language"),
        &header("accept-encoding"),
        ip,
    )
}

/// 对识别属性做 SHA-256，截取前 32 个十六进制字符
pub fn compute_fingerprint(user_agent: &str, accept_language: &str, accept_encoding: &str, ip: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [user_agent, accept_language, accept_encoding, ip] {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

/// 生成会话 ID 用的 32 位非加密字符串哈希
pub fn string_hash(input: &str) -> u32 {
    input
        .chars()
        .fold(0i32, |hash, c| hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(c as i32))
        .unsigned_abs()
}

/// (IP, 指纹) 对应的会话 ID
pub fn session_id(ip: &str, fingerprint: &str) -> String {
    format!("session_{:08x}", string_hash(&format!("{}{}", ip, fingerprint)))
}
