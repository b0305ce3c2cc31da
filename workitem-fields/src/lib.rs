//! Field type system for the work item engine
//!
//! `workitem-fields` owns the schema side of work items: the closed [`Kind`]
//! taxonomy, list and enum compound types, work item types mapping field keys
//! to definitions, and the tagged [`FieldValue`] model stored in a work item.
//!
//! # Architecture
//!
//! - **Tagged values**: every stored value is a [`FieldValue`] variant; the
//!   declared kind decides which variants a field accepts
//! - **Explicit conversions**: wire JSON in through [`FieldType::value_from_json`],
//!   wire JSON out through [`FieldValue::to_json`], string tokens through
//!   [`FieldType::convert_to_string_slice`]
//! - **No I/O**: references are stored as identifiers and resolved elsewhere

pub mod codebase;
pub mod error;
pub mod item;
pub mod markup;
pub mod system;
pub mod types;
pub mod value;

pub use codebase::CodebaseContent;
pub use error::{FieldsError, Result};
pub use item::WorkItem;
pub use markup::{
    is_markup_supported, render_markup_to_html, MarkupContent, MARKUP_DEFAULT, MARKUP_MARKDOWN,
    MARKUP_PLAIN_TEXT,
};
pub use system::SystemField;
pub use types::{FieldDefinition, FieldType, Kind, WorkItemType};
pub use value::FieldValue;
