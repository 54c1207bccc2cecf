//! Action model — the canonical record of one event in a table's feed.
//!
//! DESIGN
//! ======
//! A client submits an [`ActionDraft`]. [`ActionDraft::validate`] turns it
//! into a [`ValidatedDraft`] or a [`ValidationError`]; both the composer and
//! the server run it, so an empty chat message is suppressed locally and
//! rejected again server-side. Only the server calls
//! [`ValidatedDraft::into_action`], because the author and the timestamp are
//! its to assign.
//!
//! `details` stays a JSON object on the wire so unknown action types pass
//! through untouched; typed views ([`ChatDetails`], [`DiceRollDetails`]) are
//! decoded on demand.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::dice::{self, DiceRoll};
use crate::frame::{Data, ErrorCode};

/// Longest accepted table identifier, in characters.
pub const MAX_TABLE_ID_LEN: usize = 128;

// =============================================================================
// ACTION TYPE
// =============================================================================

/// Variant tag of an action. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Chat,
    DiceRoll,
    Other(String),
}

impl ActionType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Chat => "chat",
            Self::DiceRoll => "dice_roll",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ActionType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "chat" => Self::Chat,
            "dice_roll" => Self::DiceRoll,
            _ => Self::Other(tag),
        }
    }
}

impl From<ActionType> for String {
    fn from(kind: ActionType) -> Self {
        match kind {
            ActionType::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("table_id required")]
    EmptyTableId,
    #[error("table_id is malformed")]
    MalformedTableId,
    #[error("action_type required")]
    EmptyActionType,
    #[error("details must be a JSON object")]
    DetailsNotObject,
    #[error("chat message must not be empty")]
    EmptyMessage,
    #[error("{action_type} details require `{field}`")]
    MissingField { action_type: &'static str, field: &'static str },
    #[error("dice result {result} is outside {min}..={max} for `{dice}`")]
    DiceResultOutOfRange { dice: String, result: i64, min: u64, max: u64 },
    #[error("user_id does not match the session identity")]
    IdentityMismatch,
    #[error("malformed action draft: {0}")]
    MalformedDraft(String),
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTableId | Self::MalformedTableId => "E_VALIDATION_TABLE_ID",
            Self::EmptyActionType => "E_VALIDATION_ACTION_TYPE",
            Self::DetailsNotObject | Self::MissingField { .. } | Self::MalformedDraft(_) => "E_VALIDATION_DETAILS",
            Self::EmptyMessage => "E_VALIDATION_EMPTY_MESSAGE",
            Self::DiceResultOutOfRange { .. } => "E_VALIDATION_DICE_RESULT",
            Self::IdentityMismatch => "E_VALIDATION_IDENTITY",
        }
    }
}

/// Check a table identifier and return it trimmed.
///
/// # Errors
///
/// `EmptyTableId` for blank input, `MalformedTableId` for overlong ids or ids
/// containing control characters.
pub fn validate_table_id(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTableId);
    }
    if trimmed.chars().count() > MAX_TABLE_ID_LEN || trimmed.chars().any(char::is_control) {
        return Err(ValidationError::MalformedTableId);
    }
    Ok(trimmed.to_owned())
}

// =============================================================================
// DETAILS
// =============================================================================

/// `details` of a `chat` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDetails {
    pub message: String,
}

/// `details` of a `dice_roll` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollDetails {
    pub dice: String,
    pub result: u64,
}

// =============================================================================
// DRAFT
// =============================================================================

/// Client-submitted action, before the server assigns author and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDraft {
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub table_id: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ActionDraft {
    #[must_use]
    pub fn chat(user_id: impl Into<String>, table_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            table_id: table_id.into(),
            action_type: ActionType::Chat,
            details: serde_json::json!({ "message": message.into() }),
        }
    }

    #[must_use]
    pub fn dice_roll(user_id: impl Into<String>, table_id: impl Into<String>, roll: DiceRoll) -> Self {
        Self {
            user_id: Some(user_id.into()),
            table_id: table_id.into(),
            action_type: ActionType::DiceRoll,
            details: serde_json::json!({ "dice": roll.dice, "result": roll.result }),
        }
    }

    /// Decode a draft from a `send_action` frame payload.
    ///
    /// # Errors
    ///
    /// `MalformedDraft` when required fields are missing or mistyped.
    pub fn from_data(data: &Data) -> Result<Self, ValidationError> {
        serde_json::from_value(serde_json::Value::Object(data.clone()))
            .map_err(|e| ValidationError::MalformedDraft(e.to_string()))
    }

    /// Encode as a `send_action` frame payload.
    #[must_use]
    pub fn to_data(&self) -> Data {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Data::new(),
        }
    }

    /// Check every rule for the declared type and normalize the payload.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(self) -> Result<ValidatedDraft, ValidationError> {
        let table_id = validate_table_id(&self.table_id)?;
        if self.action_type.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyActionType);
        }
        let serde_json::Value::Object(mut details) = self.details else {
            return Err(ValidationError::DetailsNotObject);
        };

        match self.action_type {
            ActionType::Chat => {
                let message = details
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .ok_or(ValidationError::MissingField { action_type: "chat", field: "message" })?
                    .trim()
                    .to_owned();
                if message.is_empty() {
                    return Err(ValidationError::EmptyMessage);
                }
                details.insert("message".into(), serde_json::Value::String(message));
            }
            ActionType::DiceRoll => {
                let dice = details
                    .get("dice")
                    .and_then(serde_json::Value::as_str)
                    .filter(|d| !d.trim().is_empty())
                    .ok_or(ValidationError::MissingField { action_type: "dice_roll", field: "dice" })?;
                let result = details
                    .get("result")
                    .and_then(serde_json::Value::as_i64)
                    .ok_or(ValidationError::MissingField { action_type: "dice_roll", field: "result" })?;
                let (min, max) = dice::result_bounds(dice);
                let in_range = u64::try_from(result).is_ok_and(|r| (min..=max).contains(&r));
                if !in_range {
                    return Err(ValidationError::DiceResultOutOfRange { dice: dice.to_owned(), result, min, max });
                }
            }
            ActionType::Other(_) => {}
        }

        Ok(ValidatedDraft { claimed_user_id: self.user_id, table_id, action_type: self.action_type, details })
    }
}

/// A draft that passed validation. Only the server materializes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    claimed_user_id: Option<String>,
    table_id: String,
    action_type: ActionType,
    details: Data,
}

/// Identity an action is attributed to, taken from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub user_id: String,
    pub nickname: String,
}

impl ValidatedDraft {
    #[must_use]
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    #[must_use]
    pub fn action_type(&self) -> &ActionType {
        &self.action_type
    }

    #[must_use]
    pub fn details(&self) -> &Data {
        &self.details
    }

    /// A draft may omit `user_id`, but must not claim someone else's.
    ///
    /// # Errors
    ///
    /// `IdentityMismatch` when the claimed id differs from the author.
    pub fn check_author(&self, author: &Author) -> Result<(), ValidationError> {
        match &self.claimed_user_id {
            Some(claimed) if *claimed != author.user_id => Err(ValidationError::IdentityMismatch),
            _ => Ok(()),
        }
    }

    /// Attach author and server timestamp.
    #[must_use]
    pub fn into_action(self, author: &Author, timestamp: i64) -> Action {
        Action {
            id: Uuid::new_v4(),
            author_user_id: author.user_id.clone(),
            author_nickname: author.nickname.clone(),
            table_id: self.table_id,
            action_type: self.action_type,
            details: self.details,
            timestamp,
        }
    }
}

// =============================================================================
// ACTION
// =============================================================================

/// A materialized action as delivered in `receive_action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub author_user_id: String,
    pub author_nickname: String,
    pub table_id: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub details: Data,
    /// Server-assigned, milliseconds since Unix epoch.
    pub timestamp: i64,
}

impl Action {
    /// Encode as a `receive_action` frame payload.
    #[must_use]
    pub fn to_data(&self) -> Data {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Data::new(),
        }
    }

    /// Decode from a `receive_action` frame payload.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the payload is not an action.
    pub fn from_data(data: &Data) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(data.clone()))
    }

    /// Typed view of `details`; `None` when the payload does not fit `T`.
    #[must_use]
    pub fn details_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(serde_json::Value::Object(self.details.clone())).ok()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
        }
    }
}

/// Identifiers arrive as strings from page attributes and as integers from
/// older clients; both normalize to strings.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
