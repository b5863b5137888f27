// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database component over a Postgres pool.
//!
//! Scenario conditions run ad-hoc SQL, so rows come back as JSON
//! objects keyed by column name rather than typed records.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::info;

use crate::component::{Component, ComponentError};

/// Query surface the scenario engine sees.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// First column of the first row, or None for an empty result.
    async fn query_value(&self, sql: &str) -> Result<Option<Value>, ComponentError>;

    /// Every row as a JSON object keyed by column name.
    async fn query_rows(&self, sql: &str) -> Result<Vec<Value>, ComponentError>;

    /// Rows affected.
    async fn execute(&self, sql: &str) -> Result<u64, ComponentError>;
}

/// Configuration for one named database component.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Postgres-backed [`Database`] with lazy pool setup.
pub struct DatabaseComponent {
    name: String,
    config: DatabaseConfig,
    pool: Mutex<Option<PgPool>>,
}

impl DatabaseComponent {
    pub fn new(name: impl Into<String>, config: DatabaseConfig) -> Self {
        Self { name: name.into(), config, pool: Mutex::new(None) }
    }

    fn pool(&self) -> Result<PgPool, ComponentError> {
        self.pool.lock().clone().ok_or_else(|| ComponentError::Initialization {
            name: self.name.clone(),
            message: "database is not connected".to_string(),
        })
    }
}

#[async_trait]
impl Component for DatabaseComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ComponentError> {
        if self.config.url.is_empty() {
            return Err(ComponentError::Initialization {
                name: self.name.clone(),
                message: "database url is empty".to_string(),
            });
        }
        Ok(())
    }

    async fn connect(&self) -> Result<(), ComponentError> {
        if self.pool.lock().is_some() {
            return Ok(());
        }
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .connect(&self.config.url)
            .await?;
        info!(component = %self.name, "database pool connected");
        *self.pool.lock() = Some(pool);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ComponentError> {
        let pool = self.pool()?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Database for DatabaseComponent {
    async fn query_value(&self, sql: &str) -> Result<Option<Value>, ComponentError> {
        let pool = self.pool()?;
        let row = sqlx::query(sql).fetch_optional(&pool).await?;
        Ok(row.as_ref().map(first_column_to_json))
    }

    async fn query_rows(&self, sql: &str) -> Result<Vec<Value>, ComponentError> {
        let pool = self.pool()?;
        let rows = sqlx::query(sql).fetch_all(&pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str) -> Result<u64, ComponentError> {
        let pool = self.pool()?;
        let done = sqlx::query(sql).execute(&pool).await?;
        Ok(done.rows_affected())
    }
}

fn row_to_json(row: &PgRow) -> Value {
    let mut object = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), column_to_json(row, index));
    }
    Value::Object(object)
}

fn first_column_to_json(row: &PgRow) -> Value {
    if row.columns().is_empty() {
        Value::Null
    } else {
        column_to_json(row, 0)
    }
}

/// Decode one column into JSON by its Postgres type name. Types the
/// mapping does not know fall back to their text form.
fn column_to_json(row: &PgRow, index: usize) -> Value {
    let type_name = row.columns()[index].type_info().name().to_string();
    match type_name.as_str() {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(index).ok().flatten().map(Value::Bool)),
        "INT2" => opt(row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))),
        "INT4" => opt(row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))),
        "INT8" => opt(row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Number(v.into()))),
        "FLOAT4" => opt(row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .and_then(|v| Number::from_f64(v as f64))
            .map(Value::Number)),
        "FLOAT8" => opt(row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(Number::from_f64)
            .map(Value::Number)),
        "JSON" | "JSONB" => opt(row.try_get::<Option<Value>, _>(index).ok().flatten()),
        _ => opt(row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)),
    }
}

fn opt(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}
