//! Core schema types: the Kind taxonomy, field definitions and work item types.
//!
//! A work item type maps field keys to definitions. Each definition carries a
//! display label and a [`FieldType`], which is either a simple [`Kind`], a list
//! of a kind, or an enumeration over values of a base kind. All types
//! serialize to/from YAML via serde.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FieldsError, Result};
use crate::value::FieldValue;

/// The closed set of simple value kinds.
///
/// `User`, `Iteration`, `Area`, `Label` and `BoardColumn` are reference kinds:
/// the stored value is an identifier resolved against another store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    String,
    Integer,
    Float,
    Boolean,
    Instant,
    Duration,
    Url,
    Markup,
    Codebase,
    User,
    Iteration,
    Area,
    Label,
    BoardColumn,
}

impl Kind {
    /// Whether values of this kind are identifiers into another store.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            Kind::User | Kind::Iteration | Kind::Area | Kind::Label | Kind::BoardColumn
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Boolean => "boolean",
            Kind::Instant => "instant",
            Kind::Duration => "duration",
            Kind::Url => "url",
            Kind::Markup => "markup",
            Kind::Codebase => "codebase",
            Kind::User => "user",
            Kind::Iteration => "iteration",
            Kind::Area => "area",
            Kind::Label => "label",
            Kind::BoardColumn => "board-column",
        }
    }

    /// Convert a wire value into a field value of this kind.
    pub fn value_from_json(self, field: &str, value: &Value) -> Result<FieldValue> {
        FieldValue::from_json(self, field, value)
    }

    /// Render a single value of this kind as a string token.
    pub fn token(self, field: &str, value: &FieldValue) -> Result<String> {
        let token = match (self, value) {
            (Kind::String, FieldValue::String(s)) => s.clone(),
            (Kind::Url, FieldValue::Url(s)) => s.clone(),
            (Kind::Integer, FieldValue::Integer(i)) => i.to_string(),
            (Kind::Float, FieldValue::Float(f)) => f.to_string(),
            (Kind::Boolean, FieldValue::Boolean(b)) => b.to_string(),
            (Kind::Instant, FieldValue::Instant(t)) => FieldValue::format_instant(t),
            (Kind::Duration, FieldValue::Duration(nanos)) => nanos.to_string(),
            (Kind::Markup, FieldValue::Markup(m)) => m.content.clone(),
            (Kind::Codebase, FieldValue::Codebase(c)) => c.repository.clone(),
            (kind, FieldValue::Reference(id)) if kind.is_reference() => id.to_string(),
            (kind, other) => {
                return Err(FieldsError::bad_value(
                    field,
                    kind,
                    format!("expected a {kind} value, got {}", other.shape()),
                ))
            }
        };
        Ok(token)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type of a field. Determines what shape the value takes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldType {
    /// A single value of the given kind.
    Simple { kind: Kind },
    /// Zero or more values of the component kind.
    List { component: Kind },
    /// A single value of the base kind restricted to the allowed values.
    Enum { base: Kind, values: Vec<FieldValue> },
}

impl FieldType {
    pub fn simple(kind: Kind) -> Self {
        FieldType::Simple { kind }
    }

    pub fn list(component: Kind) -> Self {
        FieldType::List { component }
    }

    pub fn enumeration(base: Kind, values: Vec<FieldValue>) -> Self {
        FieldType::Enum { base, values }
    }

    /// The kind of the individual values: the simple kind, the list component
    /// or the enum base.
    pub fn kind(&self) -> Kind {
        match self {
            FieldType::Simple { kind } => *kind,
            FieldType::List { component } => *component,
            FieldType::Enum { base, .. } => *base,
        }
    }

    /// Convert a wire value into a stored value. `null` yields `None`.
    pub fn value_from_json(&self, field: &str, value: &Value) -> Result<Option<FieldValue>> {
        if value.is_null() {
            return Ok(None);
        }
        match self {
            FieldType::Simple { kind } => kind.value_from_json(field, value).map(Some),
            FieldType::List { component } => {
                let Value::Array(elements) = value else {
                    return Err(FieldsError::bad_value(
                        field,
                        self,
                        format!("expected a list, got {value}"),
                    ));
                };
                let converted = elements
                    .iter()
                    .map(|element| component.value_from_json(field, element))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(FieldValue::List(converted)))
            }
            FieldType::Enum { base, values } => {
                let converted = base.value_from_json(field, value)?;
                if !values.contains(&converted) {
                    return Err(FieldsError::bad_value(
                        field,
                        self,
                        format!("{value} is not an allowed value"),
                    ));
                }
                Ok(Some(converted))
            }
        }
    }

    /// Convert a stored value into its ordered string tokens.
    ///
    /// One token for a simple or enum value, one per element for a list and
    /// none for an absent value. A value whose shape does not match the type
    /// fails with [`FieldsError::BadValue`].
    pub fn convert_to_string_slice(
        &self,
        field: &str,
        value: Option<&FieldValue>,
    ) -> Result<Vec<String>> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        match self {
            FieldType::Simple { kind } | FieldType::Enum { base: kind, .. } => {
                if let FieldValue::List(_) = value {
                    return Err(FieldsError::bad_value(
                        field,
                        self,
                        "expected a single value, got a list",
                    ));
                }
                Ok(vec![kind.token(field, value)?])
            }
            FieldType::List { component } => {
                let FieldValue::List(elements) = value else {
                    return Err(FieldsError::bad_value(
                        field,
                        self,
                        format!("expected a list, got {}", value.shape()),
                    ));
                };
                elements
                    .iter()
                    .map(|element| component.token(field, element))
                    .collect()
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Simple { kind } => write!(f, "{kind}"),
            FieldType::List { component } => write!(f, "list<{component}>"),
            FieldType::Enum { base, .. } => write!(f, "enum<{base}>"),
        }
    }
}

/// A field definition: the schema for one slot of a work item type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A work item type: a named schema mapping field keys to definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItemType {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl WorkItemType {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            fields: BTreeMap::new(),
        }
    }

    /// Declare a field with the given label and type.
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        label: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        self.fields
            .insert(key.into(), FieldDefinition::new(label, field_type));
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.get(key)
    }

    /// Look up a field definition, failing when the type does not declare it.
    pub fn require_field(&self, key: &str) -> Result<&FieldDefinition> {
        self.fields.get(key).ok_or_else(|| FieldsError::FieldNotFound {
            name: key.to_string(),
        })
    }

    /// Parse a type definition from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }
}
