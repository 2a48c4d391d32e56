use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Clone)]
pub struct EmailReceipt {
    pub message_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid payload: {0}")]
    Payload(String),
}

/// Outbound mail collaborator. Implementations are constructed once in `main`
/// and shared through `AppState`.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<EmailReceipt, EmailError>;
}

/// Writes messages to the trace log instead of delivering them.
/// Used when no email API key is configured.
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<EmailReceipt, EmailError> {
        let message_id = format!("log-{}", Uuid::new_v4());
        tracing::info!(to = %email.to, subject = %email.subject, %message_id, "email not delivered (log sender)");
        tracing::debug!(body = %email.text_body, "log sender body");
        Ok(EmailReceipt { message_id })
    }
}
