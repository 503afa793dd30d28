//! 管理员会话令牌
//! `admin-auth` Cookie 保存绑定到受监控会话的 HS256 JWT

use crate::{config::SecurityConfig, error::AppError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ADMIN_SUBJECT: &str = "admin";
pub const TOKEN_TYPE: &str = "admin_session";

/// 管理员 Cookie 携带的声明
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    /// 固定为 "admin"
    pub sub: String,

    /// 受监控会话的 ID
    pub sid: String,

    pub token_type: String,

    pub iat: i64,

    pub exp: i64,

    /// 令牌唯一标识
    pub jti: String,
}

/// 编码后的令牌及其声明
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AdminClaims,
}

pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
}

impl SessionTokenService {
    /// 从配置构建；未配置密钥时生成仅在本进程有效的随机密钥
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        let secret = match &config.session_secret {
            Some(secret) => secret.expose_secret().clone(),
            None => {
                tracing::warn!("SESSION_SECRET not set, admin sessions will not survive a restart");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(64)
                    .map(char::from)
                    .collect()
            }
        };

        if secret.len() < 32 {
            return Err(AppError::Config("Session secret too short (min 32 chars)".to_string()));
        }

        Ok(Self::new(secret.as_bytes(), config.cookie_max_age_secs))
    }

    pub fn new(secret: &[u8], validity_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validity: Duration::seconds(validity_secs as i64),
        }
    }

    pub fn validity_secs(&self) -> i64 {
        self.validity.num_seconds()
    }

    /// 为指定会话签发令牌
    pub fn issue(&self, session_id: &str) -> Result<IssuedToken, AppError> {
        self.issue_at(session_id, Utc::now())
    }

    pub fn issue_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<IssuedToken, AppError> {
        let claims = AdminClaims {
            sub: ADMIN_SUBJECT.to_string(),
            sid: session_id.to_string(),
            token_type: TOKEN_TYPE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode admin token: {:?}", e);
            AppError::Internal(format!("Failed to encode admin token: {}", e))
        })?;

        Ok(IssuedToken { token, claims })
    }

    /// 校验签名、过期时间与令牌类型
    pub fn validate(&self, token: &str) -> Result<AdminClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Admin token validation failed: {:?}", e);
                AppError::Unauthorized
            })?
            .claims;

        if claims.sub != ADMIN_SUBJECT || claims.token_type != TOKEN_TYPE {
            tracing::debug!(sub = %claims.sub, token_type = %claims.token_type, "Admin token claims mismatch");
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_32_characters_long!";

    #[test]
    fn test_issue_and_validate() {
        let service = SessionTokenService::new(SECRET, 1800);
        let issued = service.issue("session_0000abcd").unwrap();

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.jti, issued.claims.jti);
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.sid, "session_0000abcd");
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = SessionTokenService::new(SECRET, 1800);
        let token = service
            .issue_at("session_1", Utc::now() - Duration::hours(1))
            .unwrap()
            .token;
        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = SessionTokenService::new(SECRET, 1800);
        let other = SessionTokenService::new(b"another_secret_key_with_32_chars!!", 1800);
        let token = issuer.issue("session_1").unwrap().token;
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_literal_true_is_not_a_token() {
        let service = SessionTokenService::new(SECRET, 1800);
        assert!(service.validate("true").is_err());
        assert!(service.validate("").is_err());
    }

    #[test]
    fn test_random_secret_when_unset() {
        let config = crate::config::SecurityConfig {
            admin_password: None,
            session_secret: None,
            admin_path: "/hasnaat".to_string(),
            legacy_paths: vec![],
            block_threshold: 2,
            block_duration_secs: 1800,
            cookie_max_age_secs: 1800,
            login_rate_limit: crate::config::RateLimitRule { max_requests: 5, window_secs: 900 },
            contact_rate_limit: crate::config::RateLimitRule { max_requests: 5, window_secs: 900 },
            api_rate_limit: crate::config::RateLimitRule { max_requests: 100, window_secs: 60 },
            max_events: 1000,
            max_alerts: 100,
            sweep_interval_secs: 10,
            trust_proxy: true,
            allowed_origins: vec![],
        };

        let a = SessionTokenService::from_config(&config).unwrap();
        let b = SessionTokenService::from_config(&config).unwrap();
        let token = a.issue("session_1").unwrap().token;
        assert!(a.validate(&token).is_ok());
        assert!(b.validate(&token).is_err());
    }
}
