//! Flattening work items of mixed types into one CSV grid.
//!
//! Columns are the union of the fields of every distinct type, ordered by
//! label (ties broken by field key) behind a leading `_Type` column. Reference
//! values are resolved to display names through a cache shared by the whole
//! export, so each distinct identifier is looked up at most once.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;
use workitem_fields::{FieldDefinition, FieldType, FieldValue, WorkItem, WorkItemType};

use crate::error::{ConvertError, Result, ResultExt};
use crate::resolver::{RelationshipResolver, ResolveCache};
use crate::store::Collaborators;

pub const TYPE_COLUMN_KEY: &str = "_type";
pub const TYPE_COLUMN_LABEL: &str = "_Type";
const LIST_DELIMITER: &str = ";";

/// Serialized CSV plus the ordered column labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvExport {
    pub text: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
struct Column {
    key: String,
    label: String,
}

pub struct CsvExporter<'a> {
    resolver: RelationshipResolver<'a>,
}

impl<'a> CsvExporter<'a> {
    pub fn new(stores: &'a Collaborators) -> Self {
        Self {
            resolver: RelationshipResolver::new(stores),
        }
    }

    /// Export `items` as CSV, optionally preceded by a header of labels.
    ///
    /// No items yields empty text and no labels. Any failure aborts the whole
    /// export.
    pub async fn export(
        &self,
        types: &[WorkItemType],
        items: &[WorkItem],
        include_header: bool,
        cancel: &CancellationToken,
    ) -> Result<CsvExport> {
        if items.is_empty() {
            return Ok(CsvExport::default());
        }

        let mut known: HashMap<Uuid, &WorkItemType> = HashMap::new();
        let mut seen_keys: HashSet<&str> = HashSet::new();
        let mut columns: Vec<Column> = Vec::new();
        for work_item_type in types {
            if known.contains_key(&work_item_type.id) {
                continue;
            }
            known.insert(work_item_type.id, work_item_type);
            for (key, definition) in &work_item_type.fields {
                if seen_keys.insert(key.as_str()) {
                    columns.push(Column {
                        key: key.clone(),
                        label: definition.label.clone(),
                    });
                }
            }
        }
        columns.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.key.cmp(&b.key)));
        columns.insert(
            0,
            Column {
                key: TYPE_COLUMN_KEY.to_string(),
                label: TYPE_COLUMN_LABEL.to_string(),
            },
        );
        let labels: Vec<String> = columns.iter().map(|c| c.label.clone()).collect();

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(items.len() + 1);
        if include_header {
            grid.push(labels.clone());
        }

        let mut cache = ResolveCache::new();
        for item in items {
            let work_item_type = known.get(&item.type_id).ok_or_else(|| {
                ConvertError::internal(format!(
                    "encountered work item {} with unknown work item type {}",
                    item.id, item.type_id
                ))
            })?;
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                if column.key == TYPE_COLUMN_KEY {
                    row.push(work_item_type.name.clone());
                    continue;
                }
                let cell = match work_item_type.field(&column.key) {
                    Some(definition) => self
                        .render_field(
                            &column.key,
                            definition,
                            item.field(&column.key),
                            &mut cache,
                            cancel,
                        )
                        .await
                        .context(|| {
                            format!("failed to retrieve field values for work item {}", item.id)
                        })?,
                    None => String::new(),
                };
                row.push(cell);
            }
            grid.push(row);
        }

        debug!(
            rows = items.len(),
            columns = columns.len(),
            resolved = cache.len(),
            "exported work items to CSV"
        );
        Ok(CsvExport {
            text: write_csv(&grid),
            labels,
        })
    }

    async fn render_field(
        &self,
        key: &str,
        definition: &FieldDefinition,
        value: Option<&FieldValue>,
        cache: &mut ResolveCache,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let tokens = definition
            .field_type
            .convert_to_string_slice(key, value)
            .context(|| format!("failed to convert value of field {key}"))?;
        match &definition.field_type {
            FieldType::List { component } => {
                let mut resolved = Vec::with_capacity(tokens.len());
                for token in &tokens {
                    resolved.push(
                        self.resolver
                            .resolve(key, *component, token, cache, cancel)
                            .await?,
                    );
                }
                Ok(resolved.join(LIST_DELIMITER))
            }
            field_type => match tokens.as_slice() {
                [token] => {
                    self.resolver
                        .resolve(key, field_type.kind(), token, cache, cancel)
                        .await
                }
                _ => Ok(String::new()),
            },
        }
    }
}

/// Quote a cell when it contains a delimiter, quote or line break.
fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

fn write_csv(grid: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in grid {
        for (idx, cell) in row.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(&escape_cell(cell));
        }
        out.push('\n');
    }
    out
}
