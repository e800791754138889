// src/utils/mail.rs

use std::sync::{Arc, Mutex};

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::{
    config::MailConfig,
    error::AppError,
    templates::{ConfirmMailHtml, ConfirmMailText},
};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("no mail server configured")]
    NotConfigured,

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A rendered outgoing message with a plain-text and an HTML part.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Email {
    /// Account confirmation mail carrying the link built from `confirm_url`.
    pub fn confirmation(
        config: &MailConfig,
        to: &str,
        username: &str,
        confirm_url: &str,
    ) -> Result<Self, AppError> {
        let text = ConfirmMailText {
            username,
            confirm_url,
        }
        .render()?;
        let html = ConfirmMailHtml {
            username,
            confirm_url,
        }
        .render()?;

        Ok(Self {
            to: to.to_string(),
            subject: format!("{} Confirm Your Account", config.subject_prefix),
            text,
            html,
        })
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Sends mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let server = config.server.as_deref().ok_or(MailError::NotConfigured)?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };
        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender: config.sender.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(email.to.parse()?)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Mail not sent (no server configured)");
        tracing::debug!("{}", email.text);
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent().into_iter().rev().find(|e| e.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(email);
        }
        Ok(())
    }
}

/// Picks the SMTP mailer when a server is configured, the log mailer otherwise.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.server {
        Some(_) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

/// Sends `email` in the background. Failures are logged and never reach the caller.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        let to = email.to.clone();
        if let Err(e) = mailer.send(email).await {
            tracing::error!("Failed to send mail to {}: {}", to, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingMailer {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: Email) -> Result<(), MailError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(MailError::NotConfigured)
        }
    }

    fn email_to(to: &str) -> Email {
        Email {
            to: to.into(),
            subject: "hi".into(),
            text: "hello".into(),
            html: "<p>hello</p>".into(),
        }
    }

    async fn settle(done: impl Fn() -> bool) {
        for _ in 0..50 {
            if done() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn confirmation_mail_carries_link_and_prefix() {
        let config = Config::for_testing();
        let email = Email::confirmation(
            &config.mail,
            "john@example.com",
            "john",
            "http://localhost/auth/confirm/abc",
        )
        .unwrap();

        assert!(email.subject.starts_with(&config.mail.subject_prefix));
        assert!(email.text.contains("http://localhost/auth/confirm/abc"));
        assert!(email.html.contains("http://localhost/auth/confirm/abc"));
        assert!(email.text.contains("john"));
    }

    #[tokio::test]
    async fn dispatch_reaches_the_mailer() {
        let mailer = Arc::new(MemoryMailer::new());

        dispatch(mailer.clone(), email_to("a@example.com"));
        settle(|| mailer.last_to("a@example.com").is_some()).await;

        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_stays_in_the_background() {
        let failing = Arc::new(FailingMailer::default());

        dispatch(failing.clone(), email_to("a@example.com"));
        settle(|| failing.attempts.load(Ordering::SeqCst) > 0).await;
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 1);

        // The caller carries on and later mail still goes out.
        let mailer = Arc::new(MemoryMailer::new());
        dispatch(mailer.clone(), email_to("b@example.com"));
        settle(|| mailer.last_to("b@example.com").is_some()).await;
        assert!(mailer.last_to("b@example.com").is_some());
    }

    #[test]
    fn missing_server_falls_back_to_logging() {
        let config = Config::for_testing();
        assert!(from_config(&config.mail).is_ok());
        assert!(matches!(
            SmtpMailer::new(&config.mail),
            Err(MailError::NotConfigured)
        ));
    }
}
