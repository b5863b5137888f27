// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP SMS gateway client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::component::{Component, ComponentError};
use crate::mailer::default_max_error_attempts;

/// SMS block from the orchestrator configuration. Field names follow
/// the gateway's API.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "serviceId", default)]
    pub service_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_max_error_attempts")]
    pub max_error_attempts: u32,
}

/// One outbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub text: String,
}

/// Delivery seam consumed by the `send_sms` action.
#[async_trait]
pub trait SmsGateway: Send + Sync + 'static {
    async fn send(&self, message: &SmsMessage) -> Result<(), ComponentError>;
}

/// Production gateway posting form-encoded requests.
pub struct HttpSmsGateway {
    config: SmsConfig,
    http: reqwest::Client,
}

impl HttpSmsGateway {
    pub fn new(config: SmsConfig) -> Self {
        Self { config, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl Component for HttpSmsGateway {
    fn name(&self) -> &str {
        "sms"
    }

    async fn initialize(&self) -> Result<(), ComponentError> {
        if self.config.enabled && self.config.url.is_empty() {
            return Err(ComponentError::Sms("sms gateway url is empty".to_string()));
        }
        Ok(())
    }

    async fn connect(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send(&self, message: &SmsMessage) -> Result<(), ComponentError> {
        if !self.config.enabled {
            info!(to = %message.to, "sms gateway disabled; message not sent");
            return Ok(());
        }
        let params = [
            ("login", self.config.login.as_str()),
            ("password", self.config.password.as_str()),
            ("serviceId", self.config.service_id.as_str()),
            ("source", self.config.source.as_str()),
            ("to", message.to.as_str()),
            ("text", message.text.as_str()),
        ];
        let response = self
            .http
            .post(&self.config.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ComponentError::Sms(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ComponentError::Sms(format!(
                "gateway returned http {}",
                response.status().as_u16()
            )));
        }
        info!(to = %message.to, "sms sent");
        Ok(())
    }
}

#[cfg(test)]
#[path = "sms_tests.rs"]
mod tests;
