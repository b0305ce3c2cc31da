//! JSON:API wire shapes of a work item resource.
//!
//! Inbound relationships distinguish an absent relationship (`None`) from one
//! present with `"data": null` (`Some` with `data: None`). Outbound, the data
//! member of a relationship is always serialized, so a missing reference shows
//! up as `null` rather than as an omitted key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const TYPE_WORK_ITEMS: &str = "workitems";
pub const TYPE_WORK_ITEM_TYPES: &str = "workitemtypes";
pub const TYPE_SPACES: &str = "spaces";
pub const TYPE_IDENTITIES: &str = "identities";
pub const TYPE_LABELS: &str = "labels";
pub const TYPE_BOARD_COLUMNS: &str = "boardcolumns";
pub const TYPE_ITERATIONS: &str = "iterations";
pub const TYPE_AREAS: &str = "areas";

/// Top-level document carrying a single resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItemSingle {
    pub data: WorkItemResource,
}

/// A work item as exposed on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItemResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type", default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<WorkItemRelationships>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ResourceLinks>,
}

fn default_resource_type() -> String {
    TYPE_WORK_ITEMS.to_string()
}

impl WorkItemResource {
    /// An empty inbound resource with no attributes or relationships.
    pub fn new() -> Self {
        Self {
            id: None,
            resource_type: default_resource_type(),
            attributes: Map::new(),
            relationships: None,
            links: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_relationships(mut self, relationships: WorkItemRelationships) -> Self {
        self.relationships = Some(relationships);
        self
    }

    /// The relationships object, created empty on first access.
    pub fn relationships_mut(&mut self) -> &mut WorkItemRelationships {
        self.relationships.get_or_insert_with(Default::default)
    }
}

impl Default for WorkItemResource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRelationships {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<RelationList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<RelationList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boardcolumns: Option<RelationList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<RelationGeneric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<RelationGeneric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_links: Option<RelationGeneric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<RelationGeneric>,
}

/// A to-one relationship.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    #[serde(default)]
    pub data: Option<ResourceStub>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationLinks>,
}

impl Relation {
    pub fn to(stub: ResourceStub) -> Self {
        Self {
            data: Some(stub),
            links: None,
        }
    }

    pub fn null() -> Self {
        Self::default()
    }
}

/// A to-many relationship.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelationList {
    #[serde(default)]
    pub data: Option<Vec<ResourceStub>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl RelationList {
    pub fn of(stubs: Vec<ResourceStub>) -> Self {
        Self {
            data: Some(stubs),
            ..Default::default()
        }
    }

    pub fn null() -> Self {
        Self::default()
    }
}

/// A relationship carrying only links and meta information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelationGeneric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl RelationGeneric {
    pub fn related(url: String) -> Self {
        Self {
            links: Some(RelationLinks::related(url)),
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelationLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl RelationLinks {
    pub fn related(url: String) -> Self {
        Self {
            self_link: None,
            related: Some(url),
        }
    }

    pub fn both(url: String) -> Self {
        Self {
            self_link: Some(url.clone()),
            related: Some(url),
        }
    }
}

/// Identifier plus type of a related resource.
///
/// The id stays a string so malformed identifiers reach validation and can be
/// reported as bad parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceStub {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationLinks>,
}

impl ResourceStub {
    pub fn new(id: impl ToString, resource_type: &str) -> Self {
        Self {
            id: id.to_string(),
            resource_type: resource_type.to_string(),
            links: None,
        }
    }

    pub fn with_links(mut self, links: RelationLinks) -> Self {
        self.links = Some(links);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
    #[serde(
        rename = "edit-codebase",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub edit_codebase: Option<String>,
}
