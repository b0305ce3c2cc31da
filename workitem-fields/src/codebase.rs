//! Codebase content: a pointer into a source repository attached to a work item.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{FieldsError, Result};

const REPOSITORY_KEY: &str = "repository";
const BRANCH_KEY: &str = "branch";
const FILE_NAME_KEY: &str = "filename";
const LINE_NUMBER_KEY: &str = "linenumber";
const CODEBASE_ID_KEY: &str = "codebaseid";

/// Repository location referenced from a work item.
///
/// `codebase_id` is stamped by the projector once the repository has been
/// matched to (or registered as) a codebase of the owning space.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodebaseContent {
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebase_id: Option<Uuid>,
}

impl CodebaseContent {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_file(mut self, file_name: impl Into<String>, line_number: i64) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = Some(line_number);
        self
    }

    pub fn with_codebase_id(mut self, id: Uuid) -> Self {
        self.codebase_id = Some(id);
        self
    }

    /// Parse codebase content from its wire object. The repository is mandatory.
    pub fn from_json(field: &str, value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(FieldsError::bad_value(
                field,
                "codebase",
                format!("expected an object, got {value}"),
            ));
        };

        let repository = optional_string(field, map, REPOSITORY_KEY)?.unwrap_or_default();
        if repository.trim().is_empty() {
            return Err(FieldsError::bad_value(
                field,
                "codebase",
                "repository is mandatory",
            ));
        }

        let line_number = match map.get(LINE_NUMBER_KEY) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| {
                FieldsError::bad_value(
                    field,
                    "codebase",
                    format!("linenumber must be an integer, got {v}"),
                )
            })?),
        };

        let codebase_id = match optional_string(field, map, CODEBASE_ID_KEY)? {
            None => None,
            Some(s) if s.is_empty() => None,
            Some(s) => Some(Uuid::parse_str(&s).map_err(|e| {
                FieldsError::bad_value(
                    field,
                    "codebase",
                    format!("invalid codebaseid '{s}': {e}"),
                )
            })?),
        };

        Ok(Self {
            repository,
            branch: optional_string(field, map, BRANCH_KEY)?,
            file_name: optional_string(field, map, FILE_NAME_KEY)?,
            line_number,
            codebase_id,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(REPOSITORY_KEY.into(), Value::String(self.repository.clone()));
        if let Some(branch) = &self.branch {
            map.insert(BRANCH_KEY.into(), Value::String(branch.clone()));
        }
        if let Some(file_name) = &self.file_name {
            map.insert(FILE_NAME_KEY.into(), Value::String(file_name.clone()));
        }
        if let Some(line) = self.line_number {
            map.insert(LINE_NUMBER_KEY.into(), Value::from(line));
        }
        if let Some(id) = self.codebase_id {
            map.insert(CODEBASE_ID_KEY.into(), Value::String(id.to_string()));
        }
        Value::Object(map)
    }
}

fn optional_string(field: &str, map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FieldsError::bad_value(
            field,
            "codebase",
            format!("{key} must be a string, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_object() {
        let id = Uuid::new_v4();
        let cb = CodebaseContent::from_json(
            "system.codebase",
            &json!({
                "repository": "git@github.com:acme/widgets.git",
                "branch": "main",
                "filename": "src/lib.rs",
                "linenumber": 42,
                "codebaseid": id.to_string(),
            }),
        )
        .unwrap();
        assert_eq!(cb.repository, "git@github.com:acme/widgets.git");
        assert_eq!(cb.branch.as_deref(), Some("main"));
        assert_eq!(cb.file_name.as_deref(), Some("src/lib.rs"));
        assert_eq!(cb.line_number, Some(42));
        assert_eq!(cb.codebase_id, Some(id));
        assert_eq!(CodebaseContent::from_json("c", &cb.to_json()).unwrap(), cb);
    }

    #[test]
    fn repository_is_mandatory() {
        let err = CodebaseContent::from_json("system.codebase", &json!({"branch": "main"}))
            .unwrap_err();
        assert!(err.to_string().contains("repository is mandatory"));
    }

    #[test]
    fn rejects_non_object() {
        assert!(CodebaseContent::from_json("c", &json!("repo")).is_err());
    }

    #[test]
    fn rejects_malformed_codebase_id() {
        let err = CodebaseContent::from_json(
            "c",
            &json!({"repository": "https://example.com/r.git", "codebaseid": "nope"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("codebaseid"));
    }
}
