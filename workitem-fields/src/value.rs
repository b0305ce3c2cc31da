//! Stored field values and their wire (JSON) representation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::codebase::CodebaseContent;
use crate::error::{FieldsError, Result};
use crate::markup::MarkupContent;
use crate::types::Kind;

/// A value held in a work item field.
///
/// The variant is the runtime shape; the declared [`Kind`] of the field decides
/// which shapes are acceptable. Reference kinds all store a `Reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Instant(DateTime<Utc>),
    /// Nanoseconds.
    Duration(i64),
    Url(String),
    Markup(MarkupContent),
    Codebase(CodebaseContent),
    Reference(Uuid),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Short name of the runtime shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Instant(_) => "instant",
            FieldValue::Duration(_) => "duration",
            FieldValue::Url(_) => "url",
            FieldValue::Markup(_) => "markup",
            FieldValue::Codebase(_) => "codebase",
            FieldValue::Reference(_) => "reference",
            FieldValue::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Uuid> {
        match self {
            FieldValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Instant(t) => Some(*t),
            _ => None,
        }
    }

    /// Identifiers held by a reference or a list of references.
    pub fn references(&self) -> Vec<Uuid> {
        match self {
            FieldValue::Reference(id) => vec![*id],
            FieldValue::List(items) => items.iter().filter_map(FieldValue::as_reference).collect(),
            _ => Vec::new(),
        }
    }

    /// RFC 3339 rendering used for instants on the wire and in tokens.
    pub fn format_instant(instant: &DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Convert a non-null wire value into a value of the given kind.
    pub fn from_json(kind: Kind, field: &str, value: &Value) -> Result<Self> {
        let mismatch = || {
            FieldsError::bad_value(field, kind, format!("expected a {kind} value, got {value}"))
        };
        match kind {
            Kind::String => value
                .as_str()
                .map(|s| FieldValue::String(s.to_string()))
                .ok_or_else(mismatch),
            Kind::Integer => integral(value).map(FieldValue::Integer).ok_or_else(mismatch),
            Kind::Float => value.as_f64().map(FieldValue::Float).ok_or_else(mismatch),
            Kind::Boolean => value.as_bool().map(FieldValue::Boolean).ok_or_else(mismatch),
            Kind::Instant => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                    FieldsError::bad_value(field, kind, format!("invalid instant '{raw}': {e}"))
                })?;
                Ok(FieldValue::Instant(parsed.with_timezone(&Utc)))
            }
            Kind::Duration => integral(value).map(FieldValue::Duration).ok_or_else(mismatch),
            Kind::Url => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                url::Url::parse(raw).map_err(|e| {
                    FieldsError::bad_value(field, kind, format!("invalid url '{raw}': {e}"))
                })?;
                Ok(FieldValue::Url(raw.to_string()))
            }
            Kind::Markup => MarkupContent::from_json(field, value)?
                .map(FieldValue::Markup)
                .ok_or_else(mismatch),
            Kind::Codebase => CodebaseContent::from_json(field, value).map(FieldValue::Codebase),
            Kind::User | Kind::Iteration | Kind::Area | Kind::Label | Kind::BoardColumn => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                Uuid::parse_str(raw).map(FieldValue::Reference).map_err(|e| {
                    FieldsError::bad_value(field, kind, format!("invalid identifier '{raw}': {e}"))
                })
            }
        }
    }

    /// The wire representation of this value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) | FieldValue::Url(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Instant(t) => Value::String(Self::format_instant(t)),
            FieldValue::Duration(nanos) => Value::from(*nanos),
            FieldValue::Markup(m) => m.to_json(),
            FieldValue::Codebase(c) => c.to_json(),
            FieldValue::Reference(id) => Value::String(id.to_string()),
            FieldValue::List(items) => {
                Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
        }
    }
}

fn integral(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Some(f as i64)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn instant_round_trips_through_rfc3339() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let wire = FieldValue::Instant(t).to_json();
        assert_eq!(wire, json!("2024-03-01T12:30:00Z"));
        assert_eq!(
            FieldValue::from_json(Kind::Instant, "due", &wire).unwrap(),
            FieldValue::Instant(t)
        );
    }

    #[test]
    fn integral_float_is_accepted_as_integer() {
        assert_eq!(
            FieldValue::from_json(Kind::Integer, "points", &json!(3.0)).unwrap(),
            FieldValue::Integer(3)
        );
        assert!(FieldValue::from_json(Kind::Integer, "points", &json!(3.5)).is_err());
    }

    #[test]
    fn url_must_parse() {
        assert!(FieldValue::from_json(Kind::Url, "link", &json!("https://example.com")).is_ok());
        let err = FieldValue::from_json(Kind::Url, "link", &json!("not a url")).unwrap_err();
        assert!(err.to_string().contains("invalid url"));
    }

    #[test]
    fn reference_requires_uuid_string() {
        let id = Uuid::new_v4();
        assert_eq!(
            FieldValue::from_json(Kind::User, "owner", &json!(id.to_string())).unwrap(),
            FieldValue::Reference(id)
        );
        assert!(FieldValue::from_json(Kind::Label, "tag", &json!("bogus")).is_err());
        assert!(FieldValue::from_json(Kind::Label, "tag", &json!(7)).is_err());
    }

    #[test]
    fn duration_is_nanoseconds() {
        let v = FieldValue::from_json(Kind::Duration, "spent", &json!(1_500_000_000i64)).unwrap();
        assert_eq!(v, FieldValue::Duration(1_500_000_000));
        assert_eq!(Kind::Duration.token("spent", &v).unwrap(), "1500000000");
    }

    #[test]
    fn references_of_list() {
        let a = Uuid::new_v4();
        let v = FieldValue::List(vec![FieldValue::Reference(a), FieldValue::String("x".into())]);
        assert_eq!(v.references(), vec![a]);
    }

    #[test]
    fn serde_is_tagged_by_kind() {
        let v = FieldValue::String("open".into());
        let yaml = serde_yaml_ng::to_string(&v).unwrap();
        assert!(yaml.contains("kind: string"));
        let parsed: FieldValue = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, v);
    }
}
