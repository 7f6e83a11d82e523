//! Outbound e-mail delivery.
//!
//! Supports two providers:
//! - `console`: logs messages (development)
//! - `sendgrid`: SendGrid v3 mail-send API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::services::{EmailContent, EmailError, EmailSender};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::EmailConfig;

/// Logs messages instead of sending them.
#[derive(Debug, Clone)]
pub struct ConsoleEmailSender {
    sender_email: String,
}

impl ConsoleEmailSender {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            sender_email: config.sender_email.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for ConsoleEmailSender {
    async fn send(&self, email: &EmailContent) -> Result<(), EmailError> {
        info!(
            to = %email.to,
            from = %self.sender_email,
            subject = %email.subject,
            "Email (console provider)"
        );
        debug!(body = %email.text, "Email body");
        Ok(())
    }
}

/// Rejects every message; used when delivery is switched off.
#[derive(Debug, Clone, Default)]
pub struct DisabledEmailSender;

#[async_trait]
impl EmailSender for DisabledEmailSender {
    async fn send(&self, email: &EmailContent) -> Result<(), EmailError> {
        debug!(to = %email.to, subject = %email.subject, "Email disabled, skipping send");
        Err(EmailError::Disabled)
    }
}

/// Sends through the SendGrid mail-send endpoint.
#[derive(Clone)]
pub struct SendGridEmailSender {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    sender_email: String,
    sender_name: String,
}

impl SendGridEmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        if config.sendgrid_api_key.is_empty() {
            return Err(EmailError::Transport("SendGrid API key is not configured".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.sendgrid_api_key.clone(),
            base_url: config.sendgrid_base_url.trim_end_matches('/').to_string(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        })
    }

    fn body(&self, email: &EmailContent) -> serde_json::Value {
        let mut content = vec![json!({ "type": "text/plain", "value": email.text })];
        if let Some(html) = &email.html {
            content.push(json!({ "type": "text/html", "value": html }));
        }

        json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.sender_email, "name": self.sender_name },
            "subject": email.subject,
            "content": content,
        })
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    async fn send(&self, email: &EmailContent) -> Result<(), EmailError> {
        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(email))
            .send()
            .await
            .map_err(|e| EmailError::Transport(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(to = %email.to, subject = %email.subject, "Email sent via SendGrid");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, "SendGrid API error");
        Err(EmailError::Rejected(format!("SendGrid returned {}: {}", status, body)))
    }
}

/// Picks the sender for the configured provider.
pub fn build_email_sender(config: &EmailConfig) -> Result<Arc<dyn EmailSender>, EmailError> {
    if !config.enabled {
        return Ok(Arc::new(DisabledEmailSender));
    }

    match config.provider.as_str() {
        "sendgrid" => Ok(Arc::new(SendGridEmailSender::new(config)?)),
        "console" => Ok(Arc::new(ConsoleEmailSender::new(config))),
        other => {
            warn!(provider = %other, "Unknown email provider, falling back to console");
            Ok(Arc::new(ConsoleEmailSender::new(config)))
        }
    }
}
