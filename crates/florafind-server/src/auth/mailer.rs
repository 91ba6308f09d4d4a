//! Outgoing account e-mail

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMail {
    pub fn welcome(from: &str, to: &str, username: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Welcome to FloraFind!".to_string(),
            html_body: format!(
                "<h1>Welcome, {}!</h1><p>Your FloraFind account is ready. Start by creating your first garden.</p>",
                html_escape(username)
            ),
        }
    }

    pub fn password_reset(from: &str, to: &str, reset_url: &str, expires_minutes: i64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Password reset".to_string(),
            html_body: format!(
                "<p>We received a request to reset your password.</p>\
                 <p><a href=\"{url}\">Reset your password</a></p>\
                 <p>This link expires in {minutes} minutes. If you did not ask for it, ignore this message.</p>",
                url = html_escape(reset_url),
                minutes = expires_minutes
            ),
        }
    }
}

pub(crate) fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Delivery backend for account e-mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            body_len = mail.html_body.len(),
            "Outgoing mail"
        );
        Ok(())
    }
}

/// Keeps every message in memory; handy for development and tests
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|e| MailError::Delivery(e.to_string()))?
            .push(mail);
        Ok(())
    }
}
