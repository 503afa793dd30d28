//! Business logic services layer

pub mod device;
pub mod geo_service;
pub mod mail_service;
pub mod rate_limiter;
pub mod security_monitor;
pub mod session_manager;

pub use geo_service::GeoService;
pub use mail_service::{AlertNotifier, MailService, Mailer};
pub use rate_limiter::{RateLimitScope, RateLimiter};
pub use security_monitor::SecurityMonitor;
pub use session_manager::SessionManager;
