//! Post-projection enrichment hooks.
//!
//! Hooks run in the order given to the projector, each receiving the built
//! resource. The first failing hook aborts the projection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;
use workitem_fields::WorkItem;

use crate::error::{Result, ResultExt};
use crate::jsonapi::resource::{
    Relation, RelationLinks, ResourceStub, WorkItemResource, TYPE_WORK_ITEMS,
};
use crate::links::LinkBuilder;
use crate::store::{
    parent_in_ancestors, Ancestor, WorkItemLink, WorkItemLinkStore, PARENT_CHILD_LINK_TYPE_ID,
};

/// Meta key set on the children relationship.
pub const HAS_CHILDREN_META: &str = "hasChildren";

#[async_trait]
pub trait Include: Send + Sync {
    async fn apply(
        &self,
        item: &WorkItem,
        resource: &mut WorkItemResource,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Adapts a synchronous closure into a hook.
pub struct FnInclude<F>(pub F);

#[async_trait]
impl<F> Include for FnInclude<F>
where
    F: Fn(&WorkItem, &mut WorkItemResource) -> Result<()> + Send + Sync,
{
    async fn apply(
        &self,
        item: &WorkItem,
        resource: &mut WorkItemResource,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        (self.0)(item, resource)
    }
}

/// Sets `meta.hasChildren` on the children relationship.
///
/// A supplied link list is consulted first; without a parent-child link from
/// the item there, the link store is asked.
pub struct HasChildren {
    links: Option<Vec<WorkItemLink>>,
    store: Arc<dyn WorkItemLinkStore>,
}

impl HasChildren {
    pub fn new(store: Arc<dyn WorkItemLinkStore>) -> Self {
        Self { links: None, store }
    }

    pub fn with_links(store: Arc<dyn WorkItemLinkStore>, links: Vec<WorkItemLink>) -> Self {
        Self {
            links: Some(links),
            store,
        }
    }

    fn known_parent(&self, id: Uuid) -> bool {
        self.links.as_deref().is_some_and(|links| {
            links
                .iter()
                .any(|l| l.link_type_id == PARENT_CHILD_LINK_TYPE_ID && l.source_id == id)
        })
    }
}

#[async_trait]
impl Include for HasChildren {
    async fn apply(
        &self,
        item: &WorkItem,
        resource: &mut WorkItemResource,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let has_children = if self.known_parent(item.id) {
            true
        } else {
            let found = self
                .store
                .work_item_has_children(item.id, cancel)
                .await
                .context(|| format!("failed to determine if work item {} has children", item.id))?;
            debug!(wi_id = %item.id, has_children = found, "queried children of work item");
            found
        };

        let children = resource
            .relationships_mut()
            .children
            .get_or_insert_with(Default::default);
        let mut meta = Map::new();
        meta.insert(HAS_CHILDREN_META.to_string(), Value::Bool(has_children));
        children.meta = Some(meta);
        Ok(())
    }
}

/// Adds the parent relationship of the item.
///
/// The ancestor list is consulted first, then the link store.
pub struct ParentOf {
    ancestors: Vec<Ancestor>,
    store: Arc<dyn WorkItemLinkStore>,
    links: LinkBuilder,
}

impl ParentOf {
    pub fn new(store: Arc<dyn WorkItemLinkStore>, links: LinkBuilder) -> Self {
        Self {
            ancestors: Vec::new(),
            store,
            links,
        }
    }

    pub fn with_ancestors(mut self, ancestors: Vec<Ancestor>) -> Self {
        self.ancestors = ancestors;
        self
    }
}

#[async_trait]
impl Include for ParentOf {
    async fn apply(
        &self,
        item: &WorkItem,
        resource: &mut WorkItemResource,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let parent_id = match parent_in_ancestors(&self.ancestors, item.id) {
            Some(id) => Some(id),
            None => self
                .store
                .parent_id_of(item.id, PARENT_CHILD_LINK_TYPE_ID, cancel)
                .await
                .context(|| format!("failed to look up the parent of work item {}", item.id))?,
        };

        let relation = match parent_id {
            Some(id) => Relation::to(
                ResourceStub::new(id, TYPE_WORK_ITEMS)
                    .with_links(RelationLinks::both(self.links.work_item(id))),
            ),
            None => Relation::null(),
        };
        resource.relationships_mut().parent = Some(relation);
        Ok(())
    }
}
