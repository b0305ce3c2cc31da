//! Last-modified timestamps of work items for HTTP caching headers.

use chrono::{DateTime, SubsecRound, Utc};
use workitem_fields::system::SYSTEM_UPDATED_AT;
use workitem_fields::WorkItem;

/// When the item was last updated, truncated to whole seconds.
///
/// Items without an update instant report the Unix epoch.
pub fn updated_at(item: &WorkItem) -> DateTime<Utc> {
    item.field(SYSTEM_UPDATED_AT)
        .and_then(|value| value.as_instant())
        .unwrap_or(DateTime::UNIX_EPOCH)
        .trunc_subsecs(0)
}

/// Format an instant as an RFC 1123 HTTP date.
pub fn last_modified_time(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The `Last-Modified` value of a single item.
pub fn last_modified(item: &WorkItem) -> String {
    last_modified_time(updated_at(item))
}

/// The latest update instant across `items`.
pub fn find_last_modified(items: &[WorkItem]) -> DateTime<Utc> {
    items
        .iter()
        .map(updated_at)
        .max()
        .unwrap_or(DateTime::UNIX_EPOCH)
}
