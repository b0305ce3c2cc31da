//! Well-known field keys with engine-defined behaviour.

use std::fmt;

pub const SYSTEM_TITLE: &str = "system.title";
pub const SYSTEM_DESCRIPTION: &str = "system.description";
pub const SYSTEM_DESCRIPTION_MARKUP: &str = "system.description.markup";
pub const SYSTEM_DESCRIPTION_RENDERED: &str = "system.description.rendered";
pub const SYSTEM_CODEBASE: &str = "system.codebase";
pub const SYSTEM_ASSIGNEES: &str = "system.assignees";
pub const SYSTEM_LABELS: &str = "system.labels";
pub const SYSTEM_BOARDCOLUMNS: &str = "system.boardcolumns";
pub const SYSTEM_CREATOR: &str = "system.creator";
pub const SYSTEM_ITERATION: &str = "system.iteration";
pub const SYSTEM_AREA: &str = "system.area";
pub const SYSTEM_NUMBER: &str = "system.number";
pub const SYSTEM_CREATED_AT: &str = "system.created_at";
pub const SYSTEM_UPDATED_AT: &str = "system.updated_at";
pub const SYSTEM_VERSION: &str = "version";

/// A recognised system field. Every other key is user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemField {
    Title,
    Description,
    DescriptionMarkup,
    DescriptionRendered,
    Codebase,
    Assignees,
    Labels,
    BoardColumns,
    Creator,
    Iteration,
    Area,
    Number,
    CreatedAt,
    UpdatedAt,
    Version,
}

impl SystemField {
    pub const ALL: [SystemField; 15] = [
        SystemField::Title,
        SystemField::Description,
        SystemField::DescriptionMarkup,
        SystemField::DescriptionRendered,
        SystemField::Codebase,
        SystemField::Assignees,
        SystemField::Labels,
        SystemField::BoardColumns,
        SystemField::Creator,
        SystemField::Iteration,
        SystemField::Area,
        SystemField::Number,
        SystemField::CreatedAt,
        SystemField::UpdatedAt,
        SystemField::Version,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SystemField::Title => SYSTEM_TITLE,
            SystemField::Description => SYSTEM_DESCRIPTION,
            SystemField::DescriptionMarkup => SYSTEM_DESCRIPTION_MARKUP,
            SystemField::DescriptionRendered => SYSTEM_DESCRIPTION_RENDERED,
            SystemField::Codebase => SYSTEM_CODEBASE,
            SystemField::Assignees => SYSTEM_ASSIGNEES,
            SystemField::Labels => SYSTEM_LABELS,
            SystemField::BoardColumns => SYSTEM_BOARDCOLUMNS,
            SystemField::Creator => SYSTEM_CREATOR,
            SystemField::Iteration => SYSTEM_ITERATION,
            SystemField::Area => SYSTEM_AREA,
            SystemField::Number => SYSTEM_NUMBER,
            SystemField::CreatedAt => SYSTEM_CREATED_AT,
            SystemField::UpdatedAt => SYSTEM_UPDATED_AT,
            SystemField::Version => SYSTEM_VERSION,
        }
    }

    /// Classify a field key; `None` means a user-defined field.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for SystemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for field in SystemField::ALL {
            assert_eq!(SystemField::from_key(field.key()), Some(field));
        }
    }

    #[test]
    fn unknown_key_is_user_defined() {
        assert_eq!(SystemField::from_key("custom.points"), None);
        assert_eq!(SystemField::from_key("system.titles"), None);
    }
}
