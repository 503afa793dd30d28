//! 邮件服务
//! 联系表单转发与安全告警通知，底层为 SMTP（lettre）

use crate::{
    config::EmailConfig,
    models::{contact::ContactRequest, security::SecurityAlert},
};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Email delivery is not configured")]
    Disabled,

    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// 待发送邮件
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// 邮件投递抽象，便于测试替换
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// 安全告警通知抽象
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, alert: &SecurityAlert) -> Result<(), MailError>;
}

/// SMTP 邮件投递
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self, MailError> {
        let password = config
            .password
            .as_ref()
            .map(|p| p.expose_secret().clone())
            .ok_or(MailError::Disabled)?;

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", config.from, e)))?;

        // 465 端口使用隐式 TLS，其余端口使用 STARTTLS
        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username.clone(), password))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", email.to, e)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject);

        if let Some(reply_to) = &email.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| MailError::Address(format!("{}: {}", reply_to, e)))?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// 未配置 SMTP 时使用，所有发送均失败
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<(), MailError> {
        Err(MailError::Disabled)
    }
}

/// 邮件业务服务
pub struct MailService {
    mailer: Arc<dyn Mailer>,
    contact_recipient: String,
    alert_recipient: Option<String>,
}

impl MailService {
    pub fn new(mailer: Arc<dyn Mailer>, config: &EmailConfig) -> Self {
        Self {
            mailer,
            contact_recipient: config.contact_recipient.clone(),
            alert_recipient: config.alert_recipient.clone().filter(|r| !r.trim().is_empty()),
        }
    }

    /// 根据配置构建：禁用或缺少密码时退化为 DisabledMailer
    pub fn from_config(config: &EmailConfig) -> Self {
        let mailer: Arc<dyn Mailer> = if !config.enabled {
            tracing::info!("Email delivery disabled by configuration");
            Arc::new(DisabledMailer)
        } else {
            match SmtpMailer::from_config(config) {
                Ok(mailer) => {
                    tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP mailer configured");
                    Arc::new(mailer)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SMTP mailer unavailable, email delivery disabled");
                    Arc::new(DisabledMailer)
                }
            }
        };

        Self::new(mailer, config)
    }

    pub fn alerts_enabled(&self) -> bool {
        self.alert_recipient.is_some()
    }

    /// 转发联系表单
    pub async fn send_contact(&self, contact: &ContactRequest) -> Result<(), MailError> {
        if self.contact_recipient.trim().is_empty() {
            return Err(MailError::Disabled);
        }

        self.mailer
            .send(OutgoingEmail {
                to: self.contact_recipient.clone(),
                reply_to: Some(contact.email.clone()),
                subject: contact.subject_line(),
                body: contact.render_body(),
            })
            .await
    }
}

#[async_trait]
impl AlertNotifier for MailService {
    async fn notify(&self, alert: &SecurityAlert) -> Result<(), MailError> {
        let recipient = self.alert_recipient.clone().ok_or(MailError::Disabled)?;
        self.mailer
            .send(OutgoingEmail {
                to: recipient,
                reply_to: None,
                subject: format!("[Security Alert][{}] {}", alert.risk_level.as_str(), alert.title),
                body: render_alert_body(alert),
            })
            .await
    }
}

fn render_alert_body(alert: &SecurityAlert) -> String {
    let mut body = format!(
        "{}\n\nRisk level: {}\nRaised at: {}\nAlert id: {}\n\nEvents:\n",
        alert.message,
        alert.risk_level.as_str(),
        alert.timestamp.to_rfc3339(),
        alert.id
    );
    for event in &alert.events {
        body.push_str(&format!(
            "- {} {} from {} ({}): {}\n",
            event.timestamp.to_rfc3339(),
            event.event_type.as_str(),
            event.ip,
            event.user_agent,
            event.details
        ));
    }
    body
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// 记录所有发送的邮件，可配置为失败
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("connection refused".to_string()));
            }
            self.sent.lock().await.push(email);
            Ok(())
        }
    }
}
