use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};

use crate::config::MailConfig;

/// 邮件发送错误
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Email build error: {0}")]
    Build(String),
}

/// 纯文本邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl OutgoingMail {
    pub fn otp(to: &str, code: &str, valid_for_secs: u64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your OTP Code".to_string(),
            text: format!(
                "Your OTP code is {}. It is valid for {} minutes.",
                code,
                valid_for_secs.div_ceil(60)
            ),
        }
    }

    pub fn welcome(to: &str, username: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Welcome to Syncup".to_string(),
            text: format!(
                "Hello {}, welcome to Syncup! Your account has been created successfully. \
                 Please verify your email to start using the platform.",
                username
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// 后台发送，不阻塞请求；失败只记录日志
pub fn dispatch(mailer: Arc<dyn Mailer>, mail: OutgoingMail) {
    tokio::spawn(async move {
        let to = mail.to.clone();
        tracing::info!("Sending mail to {}", to);
        if let Err(e) = mailer.send(mail).await {
            tracing::error!("Error sending email to {}: {}", to, e);
        }
    });
}

/// SMTP (STARTTLS) 发送
pub struct SmtpMailer {
    config: MailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(mail.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.text)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        tracing::info!(to = %mail.to, "Mail sent");
        Ok(())
    }
}

/// 未配置 SMTP 时使用，只打印日志
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::warn!(
            to = %mail.to,
            subject = %mail.subject,
            "MAIL_HOST not configured, mail not delivered"
        );
        Ok(())
    }
}
