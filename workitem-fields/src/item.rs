//! The work item entity: identity, ownership and its bag of typed field values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::FieldValue;

/// A work item. Field shapes are dictated by the kinds declared in its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub space_id: Uuid,
    pub type_id: Uuid,
    /// Sequence number assigned at creation; never altered afterwards.
    pub number: u64,
    /// Optimistic concurrency token. `None` means no check was requested.
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl WorkItem {
    pub fn new(id: Uuid, space_id: Uuid, type_id: Uuid) -> Self {
        Self {
            id,
            space_id,
            type_id,
            number: 0,
            version: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn remove_field(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }
}
