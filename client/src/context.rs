//! Identity and table the client works against.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const ATTR_TABLE_ID: &str = "data-table-id";
pub const ATTR_USER_ID: &str = "data-user-id";
pub const ATTR_NICKNAME: &str = "data-nickname";

/// Supplied by the page or the session collaborator at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub table_id: String,
    pub user_id: String,
    pub nickname: String,
}

impl ClientContext {
    #[must_use]
    pub fn new(table_id: impl Into<String>, user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self { table_id: table_id.into(), user_id: user_id.into(), nickname: nickname.into() }
    }

    /// Read the context from rendered page attributes. Returns `None` when
    /// any attribute is missing or blank.
    #[must_use]
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Option<Self> {
        let pick = |key: &str| {
            attrs
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Some(Self { table_id: pick(ATTR_TABLE_ID)?, user_id: pick(ATTR_USER_ID)?, nickname: pick(ATTR_NICKNAME)? })
    }
}
