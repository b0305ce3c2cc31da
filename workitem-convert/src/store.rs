//! Narrow read/validate interfaces onto the stores owning related entities.
//!
//! The engine never persists anything itself. Every method receives the
//! caller's cancellation token and implementations are expected to honour it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use workitem_fields::{WorkItem, WorkItemType};

use crate::error::Result;

/// Link type joining a parent work item to its children.
pub const PARENT_CHILD_LINK_TYPE_ID: Uuid =
    Uuid::from_u128(0x25c326a7_6d03_4f5a_b23b_86a9ee4171e9);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    pub id: Uuid,
    pub space_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub id: Uuid,
    pub space_id: Uuid,
    pub name: String,
}

/// A source repository registered with a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebase {
    pub id: Uuid,
    pub space_id: Uuid,
    pub kind: String,
    pub url: String,
    pub stack_id: Option<String>,
}

/// A directed link between two work items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemLink {
    pub id: Uuid,
    pub link_type_id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
}

/// One entry of an ancestry chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
}

/// Find the parent of `id` in an ancestry chain.
pub fn parent_in_ancestors(ancestors: &[Ancestor], id: Uuid) -> Option<Uuid> {
    ancestors
        .iter()
        .find(|ancestor| ancestor.id == id)
        .and_then(|ancestor| ancestor.parent_id)
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn is_valid(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool>;
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Identity>;
}

#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn is_valid(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool>;
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Label>;
}

#[async_trait]
pub trait BoardColumnStore: Send + Sync {
    async fn is_valid(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool>;
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<BoardColumn>;
}

#[async_trait]
pub trait IterationStore: Send + Sync {
    /// Fails with `NotFound` when the iteration does not exist.
    async fn check_exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<()>;
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Iteration>;
    /// The root iteration of a space.
    async fn root(&self, space_id: Uuid, cancel: &CancellationToken) -> Result<Iteration>;
}

#[async_trait]
pub trait AreaStore: Send + Sync {
    /// Fails with `NotFound` when the area does not exist.
    async fn check_exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<()>;
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Area>;
    /// The root area of a space.
    async fn root(&self, space_id: Uuid, cancel: &CancellationToken) -> Result<Area>;
}

#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// Fails with `NotFound` when the space does not exist.
    async fn check_exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<()>;
}

#[async_trait]
pub trait CodebaseStore: Send + Sync {
    async fn load_by_repo(
        &self,
        space_id: Uuid,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Codebase>>;
    /// Persist a new codebase; the returned value carries its assigned id.
    async fn create(&self, codebase: Codebase, cancel: &CancellationToken) -> Result<Codebase>;
}

#[async_trait]
pub trait WorkItemTypeStore: Send + Sync {
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<WorkItemType>;
}

#[async_trait]
pub trait WorkItemLinkStore: Send + Sync {
    async fn work_item_has_children(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool>;
    /// One page of children plus the total number of children.
    async fn list_children(
        &self,
        id: Uuid,
        offset: usize,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<(Vec<WorkItem>, usize)>;
    async fn parent_id_of(
        &self,
        id: Uuid,
        link_type_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<Uuid>>;
}

/// Every collaborator the engine consults, shared behind trait objects.
#[derive(Clone)]
pub struct Collaborators {
    pub identities: Arc<dyn IdentityStore>,
    pub labels: Arc<dyn LabelStore>,
    pub board_columns: Arc<dyn BoardColumnStore>,
    pub iterations: Arc<dyn IterationStore>,
    pub areas: Arc<dyn AreaStore>,
    pub spaces: Arc<dyn SpaceStore>,
    pub codebases: Arc<dyn CodebaseStore>,
    pub work_item_types: Arc<dyn WorkItemTypeStore>,
    pub work_item_links: Arc<dyn WorkItemLinkStore>,
}
