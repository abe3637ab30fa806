use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Opaque patient-profile document store.
///
/// Documents are JSON objects keyed by user id, supporting full writes,
/// partial-field merges, and array-union appends (the diagnoses list).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Option<Value>;

    async fn set(&self, user_id: &str, document: Value);

    /// Shallow partial-field update. Fields present in `fields` overwrite
    /// the stored ones; everything else is kept. Non-object inputs replace
    /// the document outright.
    async fn merge(&self, user_id: &str, fields: Value);

    /// Append each value missing from the named array field, preserving
    /// the order given. Creates the field (and document) as needed.
    async fn array_union(&self, user_id: &str, field: &str, values: Vec<Value>);
}

/// In-process document store backing the auth/profile boundary.
#[derive(Default)]
pub struct MemoryProfileStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &str) -> Option<Value> {
        self.documents.read().await.get(user_id).cloned()
    }

    async fn set(&self, user_id: &str, document: Value) {
        self.documents
            .write()
            .await
            .insert(user_id.to_string(), document);
    }

    async fn merge(&self, user_id: &str, fields: Value) {
        let mut documents = self.documents.write().await;

        let entry = documents
            .entry(user_id.to_string())
            .or_insert_with(|| Value::Object(Default::default()));

        match fields {
            Value::Object(incoming) => {
                if !entry.is_object() {
                    *entry = Value::Object(Default::default());
                }
                if let Some(existing) = entry.as_object_mut() {
                    for (key, value) in incoming {
                        existing.insert(key, value);
                    }
                }
            }
            other => *entry = other,
        }
    }

    async fn array_union(&self, user_id: &str, field: &str, values: Vec<Value>) {
        let mut documents = self.documents.write().await;

        let entry = documents
            .entry(user_id.to_string())
            .or_insert_with(|| Value::Object(Default::default()));

        let Some(document) = entry.as_object_mut() else {
            return;
        };

        let array = document
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        let Some(items) = array.as_array_mut() else {
            return;
        };

        for value in values {
            if !items.contains(&value) {
                items.push(value);
            }
        }
    }
}
