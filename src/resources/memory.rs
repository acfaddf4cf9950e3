//! In-memory JSON document store.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::http::error::ApiError;
use crate::resources::{Record, ViewSet};

/// A thread-safe record store for one resource collection.
///
/// Ids are assigned sequentially starting at 1 and never reused.
#[derive(Debug)]
pub struct MemoryViewSet {
    resource: String,
    records: DashMap<u64, Map<String, Value>>,
    next_id: AtomicU64,
}

impl MemoryViewSet {
    /// Create an empty store for the named resource.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            records: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn parse_id(id: &str) -> Result<u64, ApiError> {
        id.parse().map_err(|_| ApiError::NotFound)
    }
}

/// Require an object body and strip any client-supplied `id`.
fn into_fields(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(ApiError::BadRequest(format!(
            "Invalid data. Expected an object, but got {}.",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn with_id(id: u64, mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.insert("id".to_string(), Value::from(id));
    fields
}

#[async_trait]
impl ViewSet for MemoryViewSet {
    async fn list(&self) -> Result<Vec<Record>, ApiError> {
        let mut rows: Vec<(u64, Map<String, Value>)> = self
            .records
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        Ok(rows.into_iter().map(|(_, fields)| Value::Object(fields)).collect())
    }

    async fn create(&self, body: Value) -> Result<Record, ApiError> {
        let fields = into_fields(body)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = with_id(id, fields);
        self.records.insert(id, record.clone());

        tracing::debug!(resource = %self.resource, id, "Record created");
        Ok(Value::Object(record))
    }

    async fn retrieve(&self, id: &str) -> Result<Record, ApiError> {
        let key = Self::parse_id(id)?;
        self.records
            .get(&key)
            .map(|entry| Value::Object(entry.value().clone()))
            .ok_or(ApiError::NotFound)
    }

    async fn update(&self, id: &str, body: Value) -> Result<Record, ApiError> {
        let key = Self::parse_id(id)?;
        let fields = into_fields(body)?;
        let mut entry = self.records.get_mut(&key).ok_or(ApiError::NotFound)?;
        *entry = with_id(key, fields);
        Ok(Value::Object(entry.clone()))
    }

    async fn partial_update(&self, id: &str, body: Value) -> Result<Record, ApiError> {
        let key = Self::parse_id(id)?;
        let fields = into_fields(body)?;
        let mut entry = self.records.get_mut(&key).ok_or(ApiError::NotFound)?;
        entry.extend(fields);
        Ok(Value::Object(entry.clone()))
    }

    async fn destroy(&self, id: &str) -> Result<(), ApiError> {
        let key = Self::parse_id(id)?;
        self.records
            .remove(&key)
            .map(|_| {
                tracing::debug!(resource = %self.resource, id = key, "Record deleted");
            })
            .ok_or(ApiError::NotFound)
    }
}
