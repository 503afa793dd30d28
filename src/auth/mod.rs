//! 管理员认证：密码校验、签名会话 Cookie、凭据提取

pub mod cookies;
pub mod middleware;
pub mod password;
pub mod session_token;

pub use middleware::{extract_token, AdminCredential};
pub use password::AdminAuthenticator;
pub use session_token::{AdminClaims, SessionTokenService};
