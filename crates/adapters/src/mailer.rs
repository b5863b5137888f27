// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMTP mail transport.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use tracing::info;

use crate::component::{Component, ComponentError};

/// SMTP block from the orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub starttls: bool,
    #[serde(default)]
    pub tls: bool,
    pub from: String,
    #[serde(default = "default_max_error_attempts")]
    pub max_error_attempts: u32,
}

fn default_smtp_port() -> u16 {
    587
}

pub(crate) fn default_max_error_attempts() -> u32 {
    3
}

/// One outbound mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail delivery seam consumed by the `send_email` action.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, message: &EmailMessage) -> Result<(), ComponentError>;
}

/// Production mailer over lettre's async SMTP transport.
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, ComponentError> {
        let mut builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| ComponentError::Mail(e.to_string()))?
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| ComponentError::Mail(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }
        Ok(Self { transport: builder.build(), config })
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, ComponentError> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|_| ComponentError::Mail(format!("invalid from address {:?}", self.config.from)))?;
        let mut builder = Message::builder().from(from).subject(message.subject.clone());
        for recipient in &message.to {
            let to: Mailbox = recipient
                .parse()
                .map_err(|_| ComponentError::Mail(format!("invalid recipient {recipient:?}")))?;
            builder = builder.to(to);
        }
        builder
            .body(message.body.clone())
            .map_err(|e| ComponentError::Mail(e.to_string()))
    }
}

#[async_trait]
impl Component for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn initialize(&self) -> Result<(), ComponentError> {
        if self.config.host.is_empty() {
            return Err(ComponentError::Mail("smtp host is empty".to_string()));
        }
        Ok(())
    }

    async fn connect(&self) -> Result<(), ComponentError> {
        // The transport pools connections on demand.
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ComponentError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ComponentError::Mail("smtp connection test failed".to_string())),
            Err(e) => Err(ComponentError::Mail(e.to_string())),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ComponentError> {
        let mail = self.build_message(message)?;
        self.transport
            .send(mail)
            .await
            .map_err(|e| ComponentError::Mail(e.to_string()))?;
        info!(recipients = message.to.len(), subject = %message.subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mailer_tests.rs"]
mod tests;
