//! IP 地理位置服务
//!
//! 依次尝试多个公共接口，首个成功的结果写入带 TTL 的内存缓存。
//! 私有、回环等地址直接在本地解析，不发起网络请求。

use crate::{config::GeoConfig, error::AppError, models::security::GeoLocation};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// 地理位置提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoProvider {
    IpApiCo,
    IpApiCom,
    IpWhoIs,
}

impl GeoProvider {
    pub const ALL: [GeoProvider; 3] = [GeoProvider::IpApiCo, GeoProvider::IpApiCom, GeoProvider::IpWhoIs];

    pub fn name(&self) -> &'static str {
        match self {
            GeoProvider::IpApiCo => "ipapi.co",
            GeoProvider::IpApiCom => "ip-api.com",
            GeoProvider::IpWhoIs => "ipwho.is",
        }
    }

    fn url(&self, ip: &str) -> String {
        match self {
            GeoProvider::IpApiCo => format!("https://ipapi.co/{}/json/", ip),
            GeoProvider::IpApiCom => format!("http://ip-api.com/json/{}", ip),
            GeoProvider::IpWhoIs => format!("https://ipwho.is/{}", ip),
        }
    }

    /// 解析提供方返回的 JSON；失败响应返回 None
    pub fn parse(&self, ip: &str, body: &Value) -> Option<GeoLocation> {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |key: &str| body.get(key).and_then(Value::as_f64);

        let location = match self {
            GeoProvider::IpApiCo => {
                if body.get("error").and_then(Value::as_bool).unwrap_or(false) {
                    return None;
                }
                GeoLocation {
                    ip: ip.to_string(),
                    country: text("country_name")?,
                    country_code: text("country_code"),
                    region: text("region"),
                    city: text("city"),
                    latitude: number("latitude"),
                    longitude: number("longitude"),
                    isp: text("org"),
                    timezone: text("timezone"),
                    source: self.name().to_string(),
                }
            }
            GeoProvider::IpApiCom => {
                if body.get("status").and_then(Value::as_str) != Some("success") {
                    return None;
                }
                GeoLocation {
                    ip: ip.to_string(),
                    country: text("country")?,
                    country_code: text("countryCode"),
                    region: text("regionName"),
                    city: text("city"),
                    latitude: number("lat"),
                    longitude: number("lon"),
                    isp: text("isp"),
                    timezone: text("timezone"),
                    source: self.name().to_string(),
                }
            }
            GeoProvider::IpWhoIs => {
                if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
                    return None;
                }
                GeoLocation {
                    ip: ip.to_string(),
                    country: text("country")?,
                    country_code: text("country_code"),
                    region: text("region"),
                    city: text("city"),
                    latitude: number("latitude"),
                    longitude: number("longitude"),
                    isp: body
                        .get("connection")
                        .and_then(|c| c.get("isp"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    timezone: body
                        .get("timezone")
                        .and_then(|t| t.get("id"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    source: self.name().to_string(),
                }
            }
        };

        Some(location)
    }
}

/// 是否为无需外部查询的本地地址
pub fn is_local_address(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast()
        }
        Ok(IpAddr::V6(v6)) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().map(|v4| v4.is_private() || v4.is_loopback()).unwrap_or(false)
        }
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
struct CachedLocation {
    location: GeoLocation,
    expires_at: DateTime<Utc>,
}

pub struct GeoService {
    client: Client,
    enabled: bool,
    cache_ttl: Duration,
    cache: RwLock<HashMap<String, CachedLocation>>,
}

impl GeoService {
    pub fn new(config: &GeoConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("studio-backoffice/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build geolocation client: {}", e)))?;

        Ok(Self {
            client,
            enabled: config.enabled,
            cache_ttl: Duration::seconds(config.cache_ttl_secs as i64),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// 查询 IP 地理位置
    pub async fn lookup(&self, ip: &str) -> Result<GeoLocation, AppError> {
        let ip = ip.trim();
        if ip.parse::<IpAddr>().is_err() {
            return Err(AppError::BadRequest(format!("Invalid IP address: {}", ip)));
        }

        if is_local_address(ip) {
            return Ok(GeoLocation::local(ip));
        }

        let now = Utc::now();
        if let Some(cached) = self.cached_at(ip, now).await {
            return Ok(cached);
        }

        if !self.enabled {
            return Err(AppError::upstream("Geolocation lookups are disabled"));
        }

        for provider in GeoProvider::ALL {
            match self.query(provider, ip).await {
                Ok(Some(location)) => {
                    tracing::debug!(ip = %ip, provider = provider.name(), "Geolocation resolved");
                    self.store_at(location.clone(), now).await;
                    return Ok(location);
                }
                Ok(None) => {
                    tracing::debug!(ip = %ip, provider = provider.name(), "Geolocation provider had no answer");
                }
                Err(e) => {
                    tracing::warn!(ip = %ip, provider = provider.name(), error = %e, "Geolocation provider failed");
                }
            }
        }

        Err(AppError::upstream(format!("No geolocation provider could resolve {}", ip)))
    }

    async fn query(&self, provider: GeoProvider, ip: &str) -> Result<Option<GeoLocation>, reqwest::Error> {
        let body: Value = self
            .client
            .get(provider.url(ip))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(provider.parse(ip, &body))
    }

    async fn cached_at(&self, ip: &str, now: DateTime<Utc>) -> Option<GeoLocation> {
        self.cache
            .read()
            .await
            .get(ip)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.location.clone())
    }

    async fn store_at(&self, location: GeoLocation, now: DateTime<Utc>) {
        let entry = CachedLocation {
            expires_at: now + self.cache_ttl,
            location,
        };
        self.cache.write().await.insert(entry.location.ip.clone(), entry);
    }

    /// 清除过期缓存，返回删除数量
    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|_, entry| entry.expires_at > now);
        before - cache.len()
    }
}
