//! Applying an inbound JSON:API resource onto a work item.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use uuid::Uuid;
use workitem_fields::system::{
    SYSTEM_ASSIGNEES, SYSTEM_AREA, SYSTEM_BOARDCOLUMNS, SYSTEM_CODEBASE, SYSTEM_DESCRIPTION,
    SYSTEM_ITERATION, SYSTEM_LABELS, SYSTEM_TITLE, SYSTEM_VERSION,
};
use workitem_fields::{
    is_markup_supported, CodebaseContent, FieldType, FieldValue, Kind, MarkupContent,
    SystemField, WorkItem, WorkItemType,
};

use crate::error::{ConvertError, Result, ResultExt};
use crate::jsonapi::resource::{Relation, RelationList, WorkItemRelationships, WorkItemResource};
use crate::jsonapi::{OperationKind, Projector};
use crate::store::Codebase;

const VERSION_PARAMETER: &str = "data.attributes.version";
const BASE_TYPE_PARAMETER: &str = "data.relationships.baseType.data.id";
const ASSIGNEES_PARAMETER: &str = "data.relationships.assignees.data.id";
const LABELS_PARAMETER: &str = "data.relationships.labels.data";
const LABEL_IDS_PARAMETER: &str = "data.relationships.labels.data.id";
const BOARDCOLUMNS_PARAMETER: &str = "data.relationships.boardcolumns.data";
const BOARDCOLUMN_IDS_PARAMETER: &str = "data.relationships.boardcolumns.data.id";
const ITERATION_PARAMETER: &str = "data.relationships.iteration.data.id";
const AREA_PARAMETER: &str = "data.relationships.area.data.id";
const DESCRIPTION_MARKUP_PARAMETER: &str =
    "data.relationships.attributes[system.description].markup";

/// Parse the optimistic concurrency version of a payload.
///
/// Integers, integral floats and decimal strings are accepted. `null` or an
/// absent value means no version was given; negative values are rejected.
pub fn parse_version(value: Option<&Value>) -> Result<Option<u64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let bad = || ConvertError::bad_parameter(VERSION_PARAMETER, value);
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(Some(v));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => {
                    Ok(Some(f as u64))
                }
                _ => Err(bad()),
            }
        }
        Value::String(s) => s.trim().parse::<u64>().map(Some).map_err(|_| bad()),
        _ => Err(bad()),
    }
}

fn stub_ids(list: &RelationList) -> Option<Vec<String>> {
    list.data
        .as_ref()
        .map(|stubs| stubs.iter().map(|stub| stub.id.clone()).collect())
}

fn references(ids: Vec<Uuid>) -> FieldValue {
    FieldValue::List(ids.into_iter().map(FieldValue::Reference).collect())
}

fn attribute_parameter(key: &str) -> String {
    format!("data.attributes[{key}]")
}

impl Projector {
    /// Apply `payload` onto `target`.
    ///
    /// All validation and collaborator lookups run against a scratch copy
    /// which replaces `target` only when everything succeeded, so a failed
    /// patch leaves `target` untouched. The item number is never changed.
    pub async fn apply_patch(
        &self,
        payload: &WorkItemResource,
        target: &mut WorkItem,
        operation: OperationKind,
        space_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let version = parse_version(payload.attributes.get(SYSTEM_VERSION))?;
        let relationships = payload.relationships.as_ref();

        let requested_type = match relationships
            .and_then(|r| r.base_type.as_ref())
            .and_then(|r| r.data.as_ref())
        {
            Some(stub) => Some(
                Uuid::parse_str(&stub.id)
                    .map_err(|_| ConvertError::bad_parameter(BASE_TYPE_PARAMETER, &stub.id))?,
            ),
            None => None,
        };

        if operation == OperationKind::Update {
            if let Some(new_type) = requested_type.filter(|id| *id != target.type_id) {
                ensure_type_change_only(payload)?;
                info!(
                    wi_id = %target.id,
                    old_type = %target.type_id,
                    new_type = %new_type,
                    "changing work item type"
                );
                target.type_id = new_type;
                target.version = version;
                return Ok(());
            }
        }

        let mut draft = target.clone();
        draft.version = version;
        if let Some(type_id) = requested_type {
            draft.type_id = type_id;
        }

        let resolver = self.resolver();
        let empty = WorkItemRelationships::default();
        let rels = relationships.unwrap_or(&empty);

        if let Some(assignees) = &rels.assignees {
            match stub_ids(assignees) {
                None => {
                    draft.remove_field(SYSTEM_ASSIGNEES);
                }
                Some(tokens) => {
                    let ids = resolver
                        .validate_ids(Kind::User, ASSIGNEES_PARAMETER, &tokens, false, cancel)
                        .await?;
                    draft.set_field(SYSTEM_ASSIGNEES, references(ids));
                }
            }
        }

        if let Some(labels) = &rels.labels {
            let tokens = stub_ids(labels)
                .ok_or_else(|| ConvertError::bad_parameter(LABELS_PARAMETER, "null"))?;
            let ids = resolver
                .validate_ids(Kind::Label, LABEL_IDS_PARAMETER, &tokens, true, cancel)
                .await?;
            draft.set_field(SYSTEM_LABELS, references(ids));
        }

        if let Some(columns) = &rels.boardcolumns {
            let tokens = stub_ids(columns)
                .ok_or_else(|| ConvertError::bad_parameter(BOARDCOLUMNS_PARAMETER, "null"))?;
            let ids = resolver
                .validate_ids(
                    Kind::BoardColumn,
                    BOARDCOLUMN_IDS_PARAMETER,
                    &tokens,
                    true,
                    cancel,
                )
                .await?;
            draft.set_field(SYSTEM_BOARDCOLUMNS, references(ids));
        }

        let iteration = self
            .single_reference(
                Kind::Iteration,
                ITERATION_PARAMETER,
                rels.iteration.as_ref(),
                operation,
                space_id,
                cancel,
            )
            .await?;
        if let Some(id) = iteration {
            draft.set_field(SYSTEM_ITERATION, FieldValue::Reference(id));
        }

        let area = self
            .single_reference(
                Kind::Area,
                AREA_PARAMETER,
                rels.area.as_ref(),
                operation,
                space_id,
                cancel,
            )
            .await?;
        if let Some(id) = area {
            draft.set_field(SYSTEM_AREA, FieldValue::Reference(id));
        }

        let mut work_item_type: Option<WorkItemType> = None;
        let mut pending_codebase: Option<CodebaseContent> = None;
        for (key, value) in &payload.attributes {
            match SystemField::from_key(key) {
                Some(SystemField::Version) => {}
                Some(
                    SystemField::Number
                    | SystemField::DescriptionRendered
                    | SystemField::CreatedAt
                    | SystemField::UpdatedAt,
                ) => {
                    trace!(key = %key, "ignoring read-only attribute");
                }
                Some(SystemField::Description) => merge_description_content(&mut draft, value)?,
                Some(SystemField::DescriptionMarkup) => {
                    merge_description_markup(&mut draft, value)?
                }
                Some(SystemField::Codebase) => {
                    if value.is_null() {
                        draft.remove_field(SYSTEM_CODEBASE);
                        pending_codebase = None;
                    } else {
                        let content = CodebaseContent::from_json(key, value).map_err(|e| {
                            ConvertError::from(e).with_context(attribute_parameter(key))
                        })?;
                        pending_codebase = Some(content);
                    }
                }
                Some(
                    SystemField::Assignees
                    | SystemField::Labels
                    | SystemField::BoardColumns
                    | SystemField::Creator
                    | SystemField::Iteration
                    | SystemField::Area,
                ) => {
                    return Err(ConvertError::bad_parameter(
                        attribute_parameter(key),
                        "reference fields are set through relationships",
                    ));
                }
                Some(SystemField::Title) | None => {
                    if work_item_type.is_none() {
                        let loaded = self
                            .stores
                            .work_item_types
                            .load(draft.type_id, cancel)
                            .await
                            .context(|| {
                                format!("failed to load the work item type {}", draft.type_id)
                            })?;
                        work_item_type = Some(loaded);
                    }
                    let declared = work_item_type
                        .as_ref()
                        .and_then(|wit| wit.field(key))
                        .map(|definition| definition.field_type.clone());
                    let field_type = match declared {
                        Some(field_type) => field_type,
                        None if key == SYSTEM_TITLE => FieldType::simple(Kind::String),
                        None => return Err(ConvertError::bad_parameter("data.attributes", key)),
                    };
                    let converted = field_type.value_from_json(key, value).map_err(|e| {
                        ConvertError::from(e).with_context(attribute_parameter(key))
                    })?;
                    match converted {
                        Some(converted) => draft.set_field(key.clone(), converted),
                        None => {
                            draft.remove_field(key);
                        }
                    }
                }
            }
        }

        if let Some(FieldValue::Markup(description)) = draft.field(SYSTEM_DESCRIPTION) {
            if !is_markup_supported(&description.markup) {
                return Err(ConvertError::bad_parameter(
                    DESCRIPTION_MARKUP_PARAMETER,
                    &description.markup,
                ));
            }
        }

        if let Some(mut content) = pending_codebase {
            self.setup_codebase(&mut content, space_id, cancel).await?;
            draft.set_field(SYSTEM_CODEBASE, FieldValue::Codebase(content));
        }

        draft.number = target.number;
        *target = draft;
        Ok(())
    }

    /// Resolve the iteration or area to store, if any.
    ///
    /// An absent relationship defaults to the space root on create and leaves
    /// the field alone on update. Explicit null data always defaults to root.
    async fn single_reference(
        &self,
        kind: Kind,
        parameter: &str,
        relation: Option<&Relation>,
        operation: OperationKind,
        space_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<Uuid>> {
        let resolver = self.resolver();
        let data = match relation {
            None if operation == OperationKind::Update => return Ok(None),
            None => None,
            Some(relation) => relation.data.as_ref(),
        };
        let id = match data {
            Some(stub) => resolver.check_exists(kind, parameter, &stub.id, cancel).await?,
            None if kind == Kind::Iteration => resolver.root_iteration(space_id, cancel).await?,
            None => resolver.root_area(space_id, cancel).await?,
        };
        Ok(Some(id))
    }

    /// Stamp the codebase id, reusing the space's codebase for the repository
    /// or registering a new one.
    async fn setup_codebase(
        &self,
        content: &mut CodebaseContent,
        space_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if content.codebase_id.is_some() {
            return Ok(());
        }
        let existing = self
            .stores
            .codebases
            .load_by_repo(space_id, &content.repository, cancel)
            .await
            .context(|| format!("failed to look up codebase for {}", content.repository))?;
        if let Some(existing) = existing {
            debug!(space_id = %space_id, codebase_id = %existing.id, "reusing existing codebase");
            content.codebase_id = Some(existing.id);
            return Ok(());
        }

        let created = self
            .stores
            .codebases
            .create(
                Codebase {
                    id: Uuid::new_v4(),
                    space_id,
                    kind: self.config.codebase.kind.clone(),
                    url: content.repository.clone(),
                    stack_id: Some(self.config.codebase.stack_id.clone()),
                },
                cancel,
            )
            .await
            .context(|| format!("failed to create codebase for {}", content.repository))?;
        info!(space_id = %space_id, codebase_id = %created.id, "created codebase");
        content.codebase_id = Some(created.id);
        Ok(())
    }
}

/// A type change may carry nothing but the new type and a version.
fn ensure_type_change_only(payload: &WorkItemResource) -> Result<()> {
    let other_attributes = payload.attributes.keys().any(|key| key != SYSTEM_VERSION);
    let mut relationships = payload.relationships.clone().unwrap_or_default();
    relationships.base_type = None;
    if other_attributes || relationships != WorkItemRelationships::default() {
        return Err(ConvertError::bad_parameter(
            "data",
            "cannot update type along with other fields",
        ));
    }
    Ok(())
}

/// Overwrite only the content of an existing description.
fn merge_description_content(draft: &mut WorkItem, value: &Value) -> Result<()> {
    let incoming = MarkupContent::from_json(SYSTEM_DESCRIPTION, value)
        .map_err(|e| ConvertError::from(e).with_context(attribute_parameter(SYSTEM_DESCRIPTION)))?;
    let Some(incoming) = incoming else {
        return Ok(());
    };
    match draft.fields.get_mut(SYSTEM_DESCRIPTION) {
        Some(FieldValue::Markup(existing)) => existing.content = incoming.content,
        _ => draft.set_field(SYSTEM_DESCRIPTION, FieldValue::Markup(incoming)),
    }
    Ok(())
}

/// Overwrite only the markup of an existing description.
fn merge_description_markup(draft: &mut WorkItem, value: &Value) -> Result<()> {
    let markup = match value {
        Value::Null => return Ok(()),
        Value::String(markup) => markup.clone(),
        other => {
            return Err(ConvertError::bad_parameter(
                attribute_parameter(SystemField::DescriptionMarkup.key()),
                other,
            ))
        }
    };
    match draft.fields.get_mut(SYSTEM_DESCRIPTION) {
        Some(FieldValue::Markup(existing)) => existing.markup = markup,
        _ => draft.set_field(
            SYSTEM_DESCRIPTION,
            FieldValue::Markup(MarkupContent::new("", markup)),
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_accepts_integer_like_values() {
        assert_eq!(parse_version(None).unwrap(), None);
        assert_eq!(parse_version(Some(&Value::Null)).unwrap(), None);
        assert_eq!(parse_version(Some(&json!(3))).unwrap(), Some(3));
        assert_eq!(parse_version(Some(&json!(4.0))).unwrap(), Some(4));
        assert_eq!(parse_version(Some(&json!("5"))).unwrap(), Some(5));
    }

    #[test]
    fn version_rejects_non_numeric_and_negative() {
        for bad in [json!("abc"), json!(-1), json!("-2"), json!(1.5), json!(true)] {
            let err = parse_version(Some(&bad)).unwrap_err();
            assert!(
                matches!(
                    err,
                    ConvertError::BadParameter { ref parameter, .. }
                        if parameter == VERSION_PARAMETER
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn type_change_with_other_fields_is_rejected() {
        let payload = WorkItemResource::new().with_attribute("system.title", json!("x"));
        assert!(ensure_type_change_only(&payload).is_err());

        let payload = WorkItemResource::new().with_attribute("version", json!(1));
        assert!(ensure_type_change_only(&payload).is_ok());
    }

    #[test]
    fn description_markup_without_content_creates_description() {
        let mut item = WorkItem::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        merge_description_markup(&mut item, &json!("Markdown")).unwrap();
        assert_eq!(
            item.field(SYSTEM_DESCRIPTION),
            Some(&FieldValue::Markup(MarkupContent::new("", "Markdown")))
        );
        merge_description_content(&mut item, &json!("# hi")).unwrap();
        assert_eq!(
            item.field(SYSTEM_DESCRIPTION),
            Some(&FieldValue::Markup(MarkupContent::new("# hi", "Markdown")))
        );
    }
}
