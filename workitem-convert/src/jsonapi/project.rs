//! Projecting stored work items into wire resources.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;
use workitem_fields::system::{
    SYSTEM_DESCRIPTION_MARKUP, SYSTEM_DESCRIPTION_RENDERED, SYSTEM_VERSION,
};
use workitem_fields::{FieldValue, MarkupContent, SystemField, WorkItem, WorkItemType};

use crate::error::{ConvertError, Result, ResultExt};
use crate::jsonapi::include::{HasChildren, Include};
use crate::jsonapi::resource::{
    Relation, RelationGeneric, RelationLinks, RelationList, ResourceLinks, ResourceStub,
    WorkItemRelationships, WorkItemResource, TYPE_AREAS, TYPE_BOARD_COLUMNS, TYPE_IDENTITIES,
    TYPE_ITERATIONS, TYPE_LABELS, TYPE_SPACES, TYPE_WORK_ITEMS, TYPE_WORK_ITEM_TYPES,
};
use crate::jsonapi::Projector;

/// One page of projected children plus the total number of children.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildrenPage {
    pub items: Vec<WorkItemResource>,
    pub total: usize,
}

fn reference_ids(item: &WorkItem, key: &str, value: &FieldValue) -> Result<Vec<Uuid>> {
    let malformed = || {
        ConvertError::internal(format!(
            "field {key} of work item {} holds a {} instead of identifiers",
            item.id,
            value.shape()
        ))
    };
    match value {
        FieldValue::Reference(id) => Ok(vec![*id]),
        FieldValue::List(elements) => elements
            .iter()
            .map(|element| element.as_reference().ok_or_else(malformed))
            .collect(),
        _ => Err(malformed()),
    }
}

fn single_reference(item: &WorkItem, key: &str, value: &FieldValue) -> Result<Uuid> {
    value.as_reference().ok_or_else(|| {
        ConvertError::internal(format!(
            "field {key} of work item {} holds a {} instead of an identifier",
            item.id,
            value.shape()
        ))
    })
}

impl Projector {
    /// Build the wire resource of `item`, then run `includes` in order.
    ///
    /// The first failing hook aborts the projection with its error.
    pub async fn to_wire(
        &self,
        work_item_type: &WorkItemType,
        item: &WorkItem,
        includes: &[&dyn Include],
        cancel: &CancellationToken,
    ) -> Result<WorkItemResource> {
        if work_item_type.id != item.type_id {
            return Err(ConvertError::internal(format!(
                "work item {} has type {} but was projected with type {}",
                item.id, item.type_id, work_item_type.id
            )));
        }

        let links = &self.links;
        let self_link = links.work_item(item.id);

        let mut attributes = Map::new();
        attributes.insert(
            SYSTEM_VERSION.to_string(),
            item.version.map(Value::from).unwrap_or(Value::Null),
        );
        attributes.insert(
            SystemField::Number.key().to_string(),
            Value::from(item.number),
        );

        let mut relationships = WorkItemRelationships {
            base_type: Some(Relation {
                data: Some(ResourceStub::new(item.type_id, TYPE_WORK_ITEM_TYPES)),
                links: Some(RelationLinks {
                    self_link: Some(links.work_item_type(item.type_id)),
                    related: None,
                }),
            }),
            space: Some(Relation {
                data: Some(ResourceStub::new(item.space_id, TYPE_SPACES)),
                links: Some(RelationLinks::both(links.space(item.space_id))),
            }),
            work_item_links: Some(RelationGeneric::related(links.work_item_links(item.id))),
            children: Some(RelationGeneric::related(links.work_item_children(item.id))),
            events: Some(RelationGeneric::related(links.work_item_events(item.id))),
            comments: Some(RelationGeneric::related(links.work_item_comments(item.id))),
            ..Default::default()
        };
        let mut resource_links = ResourceLinks {
            self_link: Some(self_link.clone()),
            related: Some(self_link),
            edit_codebase: None,
        };

        for (key, value) in &item.fields {
            match SystemField::from_key(key) {
                Some(SystemField::Assignees) => {
                    let stubs = reference_ids(item, key, value)?
                        .into_iter()
                        .map(|id| ResourceStub::new(id, TYPE_IDENTITIES))
                        .collect();
                    relationships.assignees = Some(RelationList::of(stubs));
                }
                Some(SystemField::Labels) => {
                    let stubs = reference_ids(item, key, value)?
                        .into_iter()
                        .map(|id| {
                            ResourceStub::new(id, TYPE_LABELS)
                                .with_links(RelationLinks::both(links.label(id)))
                        })
                        .collect();
                    relationships.labels = Some(RelationList {
                        links: Some(RelationLinks::related(links.work_item_labels(item.id))),
                        ..RelationList::of(stubs)
                    });
                }
                Some(SystemField::BoardColumns) => {
                    let stubs = reference_ids(item, key, value)?
                        .into_iter()
                        .map(|id| ResourceStub::new(id, TYPE_BOARD_COLUMNS))
                        .collect();
                    relationships.boardcolumns = Some(RelationList::of(stubs));
                }
                Some(SystemField::Creator) => {
                    let id = single_reference(item, key, value)?;
                    relationships.creator = Some(Relation {
                        data: Some(ResourceStub::new(id, TYPE_IDENTITIES)),
                        links: Some(RelationLinks::both(links.user(id))),
                    });
                }
                Some(SystemField::Iteration) => {
                    let id = single_reference(item, key, value)?;
                    relationships.iteration = Some(Relation {
                        data: Some(ResourceStub::new(id, TYPE_ITERATIONS)),
                        links: Some(RelationLinks::both(links.iteration(id))),
                    });
                }
                Some(SystemField::Area) => {
                    let id = single_reference(item, key, value)?;
                    relationships.area = Some(Relation {
                        data: Some(ResourceStub::new(id, TYPE_AREAS)),
                        links: Some(RelationLinks::both(links.area(id))),
                    });
                }
                Some(SystemField::Title) => {
                    let title = value.as_str().ok_or_else(|| {
                        ConvertError::internal(format!(
                            "title of work item {} is a {}",
                            item.id,
                            value.shape()
                        ))
                    })?;
                    attributes.insert(
                        key.clone(),
                        Value::String(html_escape::encode_quoted_attribute(title).into_owned()),
                    );
                }
                Some(SystemField::Description) => {
                    let description = match value {
                        FieldValue::Markup(markup) => markup.clone(),
                        FieldValue::String(legacy) => MarkupContent::from_legacy(legacy.as_str()),
                        other => {
                            return Err(ConvertError::internal(format!(
                                "description of work item {} is a {}",
                                item.id,
                                other.shape()
                            )))
                        }
                    };
                    attributes.insert(
                        SYSTEM_DESCRIPTION_RENDERED.to_string(),
                        Value::String(description.render_html()),
                    );
                    attributes.insert(
                        SYSTEM_DESCRIPTION_MARKUP.to_string(),
                        Value::String(description.markup),
                    );
                    attributes.insert(key.clone(), Value::String(description.content));
                }
                Some(SystemField::Codebase) => {
                    if let FieldValue::Codebase(codebase) = value {
                        if let Some(codebase_id) = codebase.codebase_id {
                            resource_links.edit_codebase = Some(links.codebase_edit(codebase_id));
                        }
                    }
                    attributes.insert(key.clone(), value.to_json());
                }
                Some(
                    SystemField::Number
                    | SystemField::Version
                    | SystemField::DescriptionMarkup
                    | SystemField::DescriptionRendered,
                ) => {}
                Some(SystemField::CreatedAt | SystemField::UpdatedAt) | None => {
                    attributes.insert(key.clone(), value.to_json());
                }
            }
        }

        relationships.assignees.get_or_insert_with(RelationList::null);
        relationships.labels.get_or_insert_with(|| RelationList {
            links: Some(RelationLinks::related(links.work_item_labels(item.id))),
            ..RelationList::of(Vec::new())
        });
        relationships
            .boardcolumns
            .get_or_insert_with(|| RelationList::of(Vec::new()));
        relationships.creator.get_or_insert_with(Relation::null);
        relationships.iteration.get_or_insert_with(Relation::null);
        relationships.area.get_or_insert_with(Relation::null);

        let mut resource = WorkItemResource {
            id: Some(item.id),
            resource_type: TYPE_WORK_ITEMS.to_string(),
            attributes,
            relationships: Some(relationships),
            links: Some(resource_links),
        };

        for include in includes {
            include.apply(item, &mut resource, cancel).await.context(|| {
                format!("failed to run additional conversion for work item {}", item.id)
            })?;
        }
        Ok(resource)
    }

    /// Project a list of work items, pairing `types[i]` with `items[i]`.
    pub async fn to_wire_many(
        &self,
        types: &[WorkItemType],
        items: &[WorkItem],
        includes: &[&dyn Include],
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItemResource>> {
        if types.len() != items.len() {
            return Err(ConvertError::internal(format!(
                "length mismatch of work items ({}) and work item types ({})",
                items.len(),
                types.len()
            )));
        }
        let mut resources = Vec::with_capacity(items.len());
        for (work_item_type, item) in types.iter().zip(items) {
            let resource = self
                .to_wire(work_item_type, item, includes, cancel)
                .await
                .context(|| format!("failed to convert work item {}", item.id))?;
            resources.push(resource);
        }
        Ok(resources)
    }

    /// Load the type of every item, in item order.
    pub async fn load_types_for(
        &self,
        items: &[WorkItem],
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItemType>> {
        let mut types = Vec::with_capacity(items.len());
        for item in items {
            let work_item_type = self
                .stores
                .work_item_types
                .load(item.type_id, cancel)
                .await
                .context(|| format!("failed to load the work item type {}", item.type_id))?;
            types.push(work_item_type);
        }
        Ok(types)
    }

    /// Project one page of the children of `parent_id`, each carrying
    /// `meta.hasChildren`.
    pub async fn list_children(
        &self,
        parent_id: Uuid,
        offset: usize,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<ChildrenPage> {
        let (children, total) = self
            .stores
            .work_item_links
            .list_children(parent_id, offset, limit, cancel)
            .await
            .context(|| format!("unable to list children of work item {parent_id}"))?;
        debug!(wi_id = %parent_id, page = children.len(), total, "listed work item children");

        let types = self.load_types_for(&children, cancel).await?;
        let has_children = HasChildren::new(self.stores.work_item_links.clone());
        let includes: [&dyn Include; 1] = [&has_children];
        let items = self
            .to_wire_many(&types, &children, &includes, cancel)
            .await?;
        Ok(ChildrenPage { items, total })
    }
}
