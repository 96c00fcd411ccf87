use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::models::EmailTemplate;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Transient fault; the message should be redelivered.
    #[error("retryable delivery failure: {0}")]
    Retryable(String),
    /// The envelope can never be delivered; log and drop.
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait EmailRelay: Send + Sync {
    async fn deliver(&self, email: &EmailTemplate) -> Result<(), DeliveryError>;
}

/// Development relay: renders the email into the log instead of sending it.
pub struct LogEmailRelay;

#[async_trait]
impl EmailRelay for LogEmailRelay {
    async fn deliver(&self, email: &EmailTemplate) -> Result<(), DeliveryError> {
        info!("MOCK EMAIL SENT:");
        info!("   To: {}", email.to);
        info!("   Subject: {}", email.subject);
        info!("   Body:\n{}", email.body);
        Ok(())
    }
}
