// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for tests in this crate and downstream crates.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::component::{Component, ComponentError};
use crate::database::Database;
use crate::mailer::{EmailMessage, Mailer};
use crate::sms::{SmsGateway, SmsMessage};

/// In-memory database keyed by exact SQL text.
#[derive(Default)]
pub struct FakeDatabase {
    values: Mutex<HashMap<String, Value>>,
    rows: Mutex<HashMap<String, Vec<Value>>>,
    executed: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub_value(&self, sql: impl Into<String>, value: Value) {
        self.values.lock().insert(sql.into(), value);
    }

    pub fn stub_rows(&self, sql: impl Into<String>, rows: Vec<Value>) {
        self.rows.lock().insert(sql.into(), rows);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), ComponentError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ComponentError::Database(sqlx::Error::Protocol(
                "fake database failure".to_string(),
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn query_value(&self, sql: &str) -> Result<Option<Value>, ComponentError> {
        self.check_failing()?;
        Ok(self.values.lock().get(sql).cloned())
    }

    async fn query_rows(&self, sql: &str) -> Result<Vec<Value>, ComponentError> {
        self.check_failing()?;
        Ok(self.rows.lock().get(sql).cloned().unwrap_or_default())
    }

    async fn execute(&self, sql: &str) -> Result<u64, ComponentError> {
        self.check_failing()?;
        self.executed.lock().push(sql.to_string());
        Ok(1)
    }
}

/// Records sent mail; optionally fails every send.
#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ComponentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ComponentError::Mail("fake smtp unreachable".to_string()));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

/// Records sent texts; optionally fails every send.
#[derive(Default)]
pub struct FakeSmsGateway {
    sent: Mutex<Vec<SmsMessage>>,
    failing: AtomicBool,
}

impl FakeSmsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SmsMessage> {
        self.sent.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SmsGateway for FakeSmsGateway {
    async fn send(&self, message: &SmsMessage) -> Result<(), ComponentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ComponentError::Sms("fake gateway unreachable".to_string()));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

/// Component whose lifecycle stages can be made to fail, for registry
/// health tests.
pub struct FakeComponent {
    name: String,
    fail_connect: AtomicBool,
}

impl FakeComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fail_connect: AtomicBool::new(false) }
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Component for FakeComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn connect(&self) -> Result<(), ComponentError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ComponentError::Initialization {
                name: self.name.clone(),
                message: "connect refused".to_string(),
            });
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}
