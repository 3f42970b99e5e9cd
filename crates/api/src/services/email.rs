//! Email service for transactional notifications.
//!
//! Supported providers:
//! - `console`: logs emails instead of sending (development)
//! - `sendgrid`: sends via the SendGrid API
//!
//! Sends from this service are advisory. Callers treat failures as
//! log-and-continue; a failed notification never rolls back the state
//! change that triggered it.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Recipient name (optional)
    pub to_name: Option<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body_text: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Notify a vendor that their product was approved.
    pub async fn send_product_approved_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        product_title: &str,
        comments: Option<&str>,
    ) -> Result<(), EmailError> {
        let subject = format!("Your product \"{}\" has been approved", product_title);

        let comments_block = comments
            .map(|c| format!("\nReviewer notes:\n{}\n", c))
            .unwrap_or_default();

        let body_text = format!(
            r#"Hi{name},

Good news - your product "{title}" has been approved and is now visible to customers.
{comments}
Best regards,
The Storefront Team"#,
            name = to_name.map(|n| format!(" {}", n)).unwrap_or_default(),
            title = product_title,
            comments = comments_block,
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            to_name: to_name.map(|s| s.to_string()),
            subject,
            body_text,
        })
        .await
    }

    /// Notify a vendor that their product was rejected, with the reviewer's
    /// reason.
    pub async fn send_product_rejected_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        product_title: &str,
        comments: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("Your product \"{}\" was not approved", product_title);

        let body_text = format!(
            r#"Hi{name},

Unfortunately your product "{title}" was not approved.

Reason:
{comments}

You can update the listing and resubmit it for review.

Best regards,
The Storefront Team"#,
            name = to_name.map(|n| format!(" {}", n)).unwrap_or_default(),
            title = product_title,
            comments = comments,
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            to_name: to_name.map(|s| s.to_string()),
            subject,
            body_text,
        })
        .await
    }

    /// Send a password reset email carrying the (unhashed) reset token.
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        reset_token: &str,
    ) -> Result<(), EmailError> {
        let reset_url = format!(
            "{}/reset-password?token={}",
            self.config.base_url, reset_token
        );

        let body_text = format!(
            r#"Hi{name},

We received a request to reset your password. Open the link below to create a new password:

{url}

This link will expire in 1 hour.

If you didn't request a password reset, you can safely ignore this email.

Best regards,
The Storefront Team"#,
            name = to_name.map(|n| format!(" {}", n)).unwrap_or_default(),
            url = reset_url
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            to_name: to_name.map(|s| s.to_string()),
            subject: "Reset your password - Storefront".to_string(),
            body_text,
        })
        .await
    }

    /// Console provider - logs email instead of sending (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            body = %message.body_text,
            "Email (console provider)"
        );
        Ok(())
    }

    /// SendGrid provider.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut to = json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            to["name"] = json!(name);
        }

        let payload = json!({
            "personalizations": [{ "to": [to] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name,
            },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.body_text }],
        });

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, body
            )));
        }

        debug!(to = %message.to, "Email sent via SendGrid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_service() -> EmailService {
        EmailService::new(EmailConfig::default())
    }

    #[tokio::test]
    async fn test_disabled_service_skips_send() {
        let service = disabled_service();
        assert!(!service.is_enabled());

        let result = service
            .send(EmailMessage {
                to: "vendor@example.com".to_string(),
                to_name: None,
                subject: "subject".to_string(),
                body_text: "body".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_provider_errors() {
        let service = EmailService::new(EmailConfig {
            enabled: true,
            provider: "carrier-pigeon".to_string(),
            ..EmailConfig::default()
        });

        let result = service
            .send(EmailMessage {
                to: "vendor@example.com".to_string(),
                to_name: None,
                subject: "subject".to_string(),
                body_text: "body".to_string(),
            })
            .await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_sendgrid_without_key_errors() {
        let service = EmailService::new(EmailConfig {
            enabled: true,
            provider: "sendgrid".to_string(),
            ..EmailConfig::default()
        });

        let result = service
            .send(EmailMessage {
                to: "vendor@example.com".to_string(),
                to_name: None,
                subject: "subject".to_string(),
                body_text: "body".to_string(),
            })
            .await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_rejection_email_is_noop_when_disabled() {
        let service = disabled_service();
        let result = service
            .send_product_rejected_email(
                "vendor@example.com",
                Some("Acme"),
                "Walnut desk",
                "Photos do not match the description",
            )
            .await;
        assert!(result.is_ok());
    }
}
