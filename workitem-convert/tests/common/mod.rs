//! Shared fixture for the conversion integration tests

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use workitem_config::EngineConfig;
use workitem_convert::test_support::{InMemoryStores, SpaceFixture};
use workitem_convert::{OperationKind, Projector, Result, WorkItemResource};
use workitem_fields::system::SYSTEM_TITLE;
use workitem_fields::{FieldType, Kind, WorkItem, WorkItemType};

pub struct Fixture {
    pub stores: Arc<InMemoryStores>,
    pub projector: Projector,
    pub space: SpaceFixture,
    pub bug: WorkItemType,
    pub cancel: CancellationToken,
}

impl Fixture {
    pub fn new() -> Self {
        let stores = InMemoryStores::new();
        let space = stores.add_space("Project");
        let bug = WorkItemType::new(Uuid::new_v4(), "Bug")
            .with_field(SYSTEM_TITLE, "Title", FieldType::simple(Kind::String))
            .with_field("points", "Points", FieldType::simple(Kind::Integer))
            .with_field("owner", "Owner", FieldType::simple(Kind::User))
            .with_field("reviewers", "Reviewers", FieldType::list(Kind::User));
        stores.add_type(bug.clone());
        let projector = Projector::new(stores.collaborators(), EngineConfig::default());
        Self {
            stores,
            projector,
            space,
            bug,
            cancel: CancellationToken::new(),
        }
    }

    /// A blank bug with sequence number 7.
    pub fn item(&self) -> WorkItem {
        WorkItem::new(Uuid::new_v4(), self.space.space_id, self.bug.id).with_number(7)
    }

    pub async fn apply(
        &self,
        payload: &WorkItemResource,
        target: &mut WorkItem,
        operation: OperationKind,
    ) -> Result<()> {
        let space_id = target.space_id;
        self.projector
            .apply_patch(payload, target, operation, space_id, &self.cancel)
            .await
    }
}

/// Parse a wire resource from JSON.
pub fn payload(value: Value) -> WorkItemResource {
    serde_json::from_value(value).unwrap()
}

/// Relationship data listing `ids` as resources of `resource_type`.
pub fn stubs(resource_type: &str, ids: &[Uuid]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| serde_json::json!({ "id": id.to_string(), "type": resource_type }))
            .collect(),
    )
}
