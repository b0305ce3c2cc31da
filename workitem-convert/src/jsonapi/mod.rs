//! Bidirectional mapping between work items and JSON:API resources.

pub mod include;
pub mod patch;
pub mod project;
pub mod resource;

use workitem_config::EngineConfig;

use crate::links::LinkBuilder;
use crate::resolver::RelationshipResolver;
use crate::store::Collaborators;

pub use include::{FnInclude, HasChildren, Include, ParentOf, HAS_CHILDREN_META};
pub use patch::parse_version;
pub use project::ChildrenPage;
pub use resource::{
    Relation, RelationGeneric, RelationLinks, RelationList, ResourceLinks, ResourceStub,
    WorkItemRelationships, WorkItemResource, WorkItemSingle,
};

/// Whether a patch creates a new work item or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
}

/// Converts between stored work items and their wire resources.
///
/// A projector holds no per-call state, so one projector can serve
/// concurrent calls.
#[derive(Clone)]
pub struct Projector {
    stores: Collaborators,
    config: EngineConfig,
    links: LinkBuilder,
}

impl Projector {
    pub fn new(stores: Collaborators, config: EngineConfig) -> Self {
        let links = LinkBuilder::from_config(&config);
        Self {
            stores,
            config,
            links,
        }
    }

    pub fn stores(&self) -> &Collaborators {
        &self.stores
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    fn resolver(&self) -> RelationshipResolver<'_> {
        RelationshipResolver::new(&self.stores)
    }
}
