// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component lifecycle contract and the named-resource registry.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::database::Database;
use crate::mailer::Mailer;
use crate::sms::SmsGateway;

/// Failures from external resources.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("component {name} failed to initialize: {message}")]
    Initialization { name: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mail transport error: {0}")]
    Mail(String),

    #[error("sms gateway error: {0}")]
    Sms(String),

    #[error("component {0} is not configured")]
    NotConfigured(String),
}

/// Lifecycle of a named external resource. All three stages are
/// idempotent: calling them again on a live component is a no-op.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Validate configuration and prepare internal state.
    async fn initialize(&self) -> Result<(), ComponentError>;

    /// Establish the external connection (pool, session).
    async fn connect(&self) -> Result<(), ComponentError>;

    /// Verify the resource answers.
    async fn health_check(&self) -> Result<(), ComponentError>;
}

/// Named resources available to scenario actions.
///
/// Health is tracked per component: a failed lifecycle stage or health
/// check marks it unhealthy until a later check passes. Scenarios that
/// depend on a component are expected to consult [`Components::healthy`].
#[derive(Default)]
pub struct Components {
    databases: HashMap<String, Arc<dyn Database>>,
    mailer: Option<Arc<dyn Mailer>>,
    sms: Option<Arc<dyn SmsGateway>>,
    health: Mutex<HashMap<String, bool>>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_database(&mut self, name: impl Into<String>, database: Arc<dyn Database>) {
        let name = name.into();
        self.health.lock().insert(name.clone(), true);
        self.databases.insert(name, database);
    }

    pub fn database(&self, name: &str) -> Result<Arc<dyn Database>, ComponentError> {
        self.databases
            .get(name)
            .cloned()
            .ok_or_else(|| ComponentError::NotConfigured(name.to_string()))
    }

    pub fn database_names(&self) -> Vec<&str> {
        self.databases.keys().map(String::as_str).collect()
    }

    pub fn set_mailer(&mut self, mailer: Arc<dyn Mailer>) {
        self.mailer = Some(mailer);
    }

    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, ComponentError> {
        self.mailer
            .clone()
            .ok_or_else(|| ComponentError::NotConfigured("smtp".to_string()))
    }

    pub fn set_sms_gateway(&mut self, gateway: Arc<dyn SmsGateway>) {
        self.sms = Some(gateway);
    }

    pub fn sms_gateway(&self) -> Result<Arc<dyn SmsGateway>, ComponentError> {
        self.sms
            .clone()
            .ok_or_else(|| ComponentError::NotConfigured("sms".to_string()))
    }

    pub fn set_health(&self, name: &str, healthy: bool) {
        self.health.lock().insert(name.to_string(), healthy);
    }

    /// True unless the component was explicitly marked unhealthy.
    pub fn healthy(&self, name: &str) -> bool {
        self.health.lock().get(name).copied().unwrap_or(false)
    }
}

/// Drive one component through its full lifecycle, recording health in
/// `components`.
pub async fn bring_up(
    components: &Components,
    component: &dyn Component,
) -> Result<(), ComponentError> {
    let name = component.name().to_string();
    let result = async {
        component.initialize().await?;
        component.connect().await?;
        component.health_check().await
    }
    .await;
    components.set_health(&name, result.is_ok());
    result
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod tests;
