//! Work item conversion engine
//!
//! Turns stored [`WorkItem`](workitem_fields::WorkItem)s into JSON:API
//! resources and back, resolves reference fields against collaborator stores,
//! and flattens mixed-type work item lists into CSV.
//!
//! ## Overview
//!
//! - **Patch application** - [`Projector::apply_patch`] validates a wire
//!   payload against the work item type and collaborator stores, then commits
//!   it to the target item in one step
//! - **Projection** - [`Projector::to_wire`] builds the wire resource and runs
//!   caller-supplied [`Include`] hooks in order
//! - **CSV export** - [`CsvExporter::export`] unions columns over every type
//!   and resolves references to display names through a shared cache
//!
//! Every collaborator lookup takes a [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use workitem_config::EngineConfig;
//! use workitem_convert::{Collaborators, OperationKind, Projector, WorkItemResource};
//! use workitem_fields::{WorkItem, WorkItemType};
//!
//! # async fn example(
//! #     stores: Collaborators,
//! #     work_item_type: WorkItemType,
//! #     item: &mut WorkItem,
//! #     payload: WorkItemResource,
//! # ) -> workitem_convert::Result<()> {
//! let projector = Projector::new(stores, EngineConfig::default());
//! let cancel = CancellationToken::new();
//!
//! let space_id = item.space_id;
//! projector
//!     .apply_patch(&payload, item, OperationKind::Update, space_id, &cancel)
//!     .await?;
//!
//! let resource = projector.to_wire(&work_item_type, item, &[], &cancel).await?;
//! println!("{}", serde_json::to_string(&resource)?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod export;
pub mod jsonapi;
pub mod links;
pub mod modified;
pub mod resolver;
pub mod store;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use error::{ConvertError, Result, ResultExt};
pub use export::{CsvExport, CsvExporter, TYPE_COLUMN_KEY, TYPE_COLUMN_LABEL};
pub use jsonapi::{
    parse_version, ChildrenPage, FnInclude, HasChildren, Include, OperationKind, ParentOf,
    Projector, WorkItemResource, WorkItemSingle, HAS_CHILDREN_META,
};
pub use links::LinkBuilder;
pub use modified::{find_last_modified, last_modified, last_modified_time, updated_at};
pub use resolver::{RelationshipResolver, ResolveCache};
pub use store::{Collaborators, PARENT_CHILD_LINK_TYPE_ID};
