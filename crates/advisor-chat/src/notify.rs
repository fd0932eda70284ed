//! Outbound lead notifications.

use tracing::info;

use crate::records::Lead;

pub const CONFIRMATION_TEMPLATE: &str = "confirm";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Confirmation sent when a lead agrees to proceed.
    pub fn confirmation(lead: &Lead) -> Self {
        Self {
            to: lead.email.clone(),
            subject: "Thanks for your interest!".to_string(),
            body: format!(
                "Hi {},\n\nWe've received your request for a retirement/life plan. \
                 Our advisor will contact you soon.\n\n- Team",
                lead.full_name
            ),
        }
    }
}

pub trait Notifier: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the message could not be delivered.
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    from: Option<String>,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: Some(from.into()) }
    }
}

impl Notifier for LogNotifier {
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(
            from = self.from.as_deref().unwrap_or("Advisor <noreply@example.com>"),
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "email (log only)"
        );
        Ok(())
    }
}
