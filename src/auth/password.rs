//! 管理员密码校验
//!
//! 只保存密码的 SHA-256 摘要，比较时对摘要做常量时间比较。
//! 未配置任何密码时拒绝所有请求。

use crate::config::SecurityConfig;
use sha2::{Digest, Sha256};

#[derive(Clone)]
pub struct AdminAuthenticator {
    digests: Vec<[u8; 32]>,
}

impl std::fmt::Debug for AdminAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuthenticator")
            .field("secrets", &self.digests.len())
            .finish()
    }
}

impl AdminAuthenticator {
    pub fn new<I, S>(passwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            digests: passwords
                .into_iter()
                .filter(|p| !p.as_ref().is_empty())
                .map(|p| digest(p.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.admin_passwords())
    }

    /// 是否配置了至少一个管理员密码
    pub fn is_configured(&self) -> bool {
        !self.digests.is_empty()
    }

    pub fn verify(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        let candidate = digest(candidate);
        // 遍历全部密钥，不提前返回
        self.digests
            .iter()
            .fold(false, |matched, expected| matched | constant_time_eq(expected, &candidate))
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// 常量时间比较
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_single_password() {
        let auth = AdminAuthenticator::new(["s3cret-pass"]);
        assert!(auth.is_configured());
        assert!(auth.verify("s3cret-pass"));
        assert!(!auth.verify("s3cret-pas"));
        assert!(!auth.verify(""));
    }

    #[test]
    fn test_multiple_passwords() {
        let auth = AdminAuthenticator::new(["first", "second"]);
        assert!(auth.verify("first"));
        assert!(auth.verify("second"));
        assert!(!auth.verify("third"));
    }

    #[test]
    fn test_unconfigured_rejects_everything() {
        let auth = AdminAuthenticator::new(Vec::<String>::new());
        assert!(!auth.is_configured());
        assert!(!auth.verify("admin"));
        assert!(!auth.verify("password"));
    }

    #[test]
    fn test_debug_does_not_leak() {
        let auth = AdminAuthenticator::new(["hunter2"]);
        assert!(!format!("{:?}", auth).contains("hunter2"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
