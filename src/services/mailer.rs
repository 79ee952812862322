use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// A rendered outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail seam. Delivery providers are outside this service; the
/// shipped implementations log or capture messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes messages to the log. Bodies (which carry codes and links) are only
/// logged when `include_body` is set, i.e. in development.
pub struct LogMailer {
    include_body: bool,
}

impl LogMailer {
    pub fn new(include_body: bool) -> Self {
        Self { include_body }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.include_body {
            tracing::info!(to = %email.to, subject = %email.subject, "Outbound email:\n{}", email.body);
        } else {
            tracing::info!(to = %email.to, subject = %email.subject, "Outbound email rendered (delivery not configured)");
        }
        Ok(())
    }
}

/// Captures messages in memory; used by tests to read codes and links
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails
    pub fn failing() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent().into_iter().rev().find(|e| e.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("memory mailer configured to fail".into()));
        }
        self.outbox
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".into()))?
            .push(email);
        Ok(())
    }
}

fn sender(config: &MailConfig) -> String {
    format!("{} <{}>", config.from_name, config.from_address)
}

pub fn invitation_email(
    config: &MailConfig,
    to: &str,
    name: Option<&str>,
    organization: Option<&str>,
    code: &str,
    link: &str,
    expires_at: DateTime<Utc>,
) -> Email {
    let greeting = name.map(|n| format!("Hello {},", n)).unwrap_or_else(|| "Hello,".to_string());
    let joining = organization
        .map(|o| format!("You have been invited to join {} on ChurchFlow.", o))
        .unwrap_or_else(|| "You have been invited to join ChurchFlow.".to_string());

    Email {
        from: sender(config),
        to: to.to_string(),
        subject: "You're invited to ChurchFlow".to_string(),
        body: format!(
            "{greeting}\n\n{joining}\n\nSign in with this link:\n{link}\n\nOr enter this code: {code}\n\nThe invitation expires at {} UTC.\n",
            expires_at.format("%Y-%m-%d %H:%M")
        ),
    }
}

pub fn verification_email(config: &MailConfig, to: &str, name: &str, code: &str, minutes: u64) -> Email {
    Email {
        from: sender(config),
        to: to.to_string(),
        subject: "Verify your ChurchFlow email".to_string(),
        body: format!(
            "Hello {name},\n\nYour verification code is {code}. It expires in {minutes} minutes.\n"
        ),
    }
}

pub fn password_reset_email(config: &MailConfig, to: &str, name: &str, code: &str, minutes: u64) -> Email {
    Email {
        from: sender(config),
        to: to.to_string(),
        subject: "Reset your ChurchFlow password".to_string(),
        body: format!(
            "Hello {name},\n\nUse code {code} to reset your password. It expires in {minutes} minutes.\n\nIf you did not ask for a reset you can ignore this message.\n"
        ),
    }
}
