//! Feed — ordered, append-only view of a table's actions.
//!
//! DESIGN
//! ======
//! Entries are kept in receipt order; the server already serializes each
//! room, so no client-side sorting happens. Action ids are remembered so
//! a live `receive_action` that overlaps the join backfill is shown once.
//!
//! Rendering is keyed by action type:
//! - `chat` → the message
//! - `dice_roll` → `rolled {dice} and got {result}`
//! - anything else, or a payload that does not fit its type →
//!   `Action: {type} - {raw details JSON}`
//!
//! Every user-controlled string is escaped for the target: HTML entities
//! for markup, visible escapes for control characters in terminal text.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use std::collections::HashSet;
use std::fmt;

use frames::action::{ChatDetails, DiceRollDetails};
use frames::frame::{EVENT_JOIN, EVENT_RECEIVE_ACTION};
use frames::{Action, ActionType, Frame, Status};
use uuid::Uuid;

// =============================================================================
// ENTRY
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryBody {
    Chat { message: String },
    DiceRoll { dice: String, result: u64 },
    Generic { action_type: String, details_json: String },
}

impl EntryBody {
    fn from_action(action: &Action) -> Self {
        let typed = match action.action_type {
            ActionType::Chat => action
                .details_as::<ChatDetails>()
                .map(|d| Self::Chat { message: d.message }),
            ActionType::DiceRoll => action
                .details_as::<DiceRollDetails>()
                .map(|d| Self::DiceRoll { dice: d.dice, result: d.result }),
            ActionType::Other(_) => None,
        };
        typed.unwrap_or_else(|| Self::Generic {
            action_type: action.action_type.to_string(),
            details_json: serde_json::to_string(&action.details).unwrap_or_else(|_| "{}".to_owned()),
        })
    }

    /// Unescaped body text.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Chat { message } => message.clone(),
            Self::DiceRoll { dice, result } => format!("rolled {dice} and got {result}"),
            Self::Generic { action_type, details_json } => format!("Action: {action_type} - {details_json}"),
        }
    }

    fn css_modifier(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::DiceRoll { .. } => "dice-roll",
            Self::Generic { .. } => "generic",
        }
    }
}

/// One rendered line of the feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: Uuid,
    pub author: String,
    pub timestamp: i64,
    pub body: EntryBody,
}

impl FeedEntry {
    #[must_use]
    pub fn from_action(action: &Action) -> Self {
        Self {
            id: action.id,
            author: action.author_nickname.clone(),
            timestamp: action.timestamp,
            body: EntryBody::from_action(action),
        }
    }

    /// `[HH:MM:SS] author: body`, safe to write to a terminal.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!(
            "[{}] {}: {}",
            format_clock(self.timestamp),
            escape_terminal(&self.author),
            escape_terminal(&self.body.text())
        )
    }

    /// A single `<li>` with every user-controlled string escaped.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            r#"<li class="feed-entry feed-entry--{}" data-action-id="{}"><time>{}</time> <span class="feed-author">{}</span>: <span class="feed-body">{}</span></li>"#,
            self.body.css_modifier(),
            html_escape::encode_double_quoted_attribute(&self.id.to_string()),
            format_clock(self.timestamp),
            html_escape::encode_text(&self.author),
            html_escape::encode_text(&self.body.text())
        )
    }
}

impl fmt::Display for FeedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// =============================================================================
// FEED
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct Feed {
    entries: Vec<FeedEntry>,
    seen: HashSet<Uuid>,
    /// Entry the view was last scrolled to.
    scroll_target: Option<Uuid>,
    scrolls: usize,
}

impl Feed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a live action and scroll to it. Returns the new entry, or
    /// `None` when the action was already shown.
    pub fn append(&mut self, action: &Action) -> Option<&FeedEntry> {
        if !self.seen.insert(action.id) {
            return None;
        }
        self.entries.push(FeedEntry::from_action(action));
        self.scroll_to_newest();
        self.entries.last()
    }

    /// Replace the feed with a backfill and scroll once.
    pub fn load_history(&mut self, actions: &[Action]) {
        self.entries.clear();
        self.seen.clear();
        for action in actions {
            if self.seen.insert(action.id) {
                self.entries.push(FeedEntry::from_action(action));
            }
        }
        self.scroll_to_newest();
    }

    /// Feed a server frame in. Handles `receive_action` fan-out and the
    /// history carried by a `join` reply; returns whether the feed changed.
    pub fn apply_frame(&mut self, frame: &Frame) -> bool {
        if let Some(action) = parse_receive_action_frame(frame) {
            return self.append(&action).is_some();
        }
        if let Some(history) = parse_join_history_frame(frame) {
            self.load_history(&history);
            return true;
        }
        false
    }

    #[must_use]
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn scroll_target(&self) -> Option<Uuid> {
        self.scroll_target
    }

    /// Number of scroll-to-bottom requests issued so far.
    #[must_use]
    pub fn scroll_count(&self) -> usize {
        self.scrolls
    }

    /// Whole feed as an HTML list.
    #[must_use]
    pub fn to_html(&self) -> String {
        let items: String = self.entries.iter().map(FeedEntry::to_html).collect();
        format!(r#"<ul class="feed">{items}</ul>"#)
    }

    fn scroll_to_newest(&mut self) {
        self.scroll_target = self.entries.last().map(|e| e.id);
        self.scrolls += 1;
    }
}

// =============================================================================
// FRAME PARSING
// =============================================================================

/// Decode the action carried by a `receive_action` frame.
#[must_use]
pub fn parse_receive_action_frame(frame: &Frame) -> Option<Action> {
    if frame.event != EVENT_RECEIVE_ACTION || frame.status != Status::Request {
        return None;
    }
    Action::from_data(&frame.data).ok()
}

/// Decode the backfill carried by a successful `join` reply. Items that do
/// not decode are skipped.
#[must_use]
pub fn parse_join_history_frame(frame: &Frame) -> Option<Vec<Action>> {
    if frame.event != EVENT_JOIN || frame.status != Status::Done {
        return None;
    }
    let items = frame.data.get("history")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
    )
}

// =============================================================================
// FORMATTING
// =============================================================================

/// Formats a millisecond epoch timestamp as UTC `HH:MM:SS`.
#[must_use]
pub fn format_clock(ms: i64) -> String {
    if ms < 0 {
        return "--:--:--".to_owned();
    }
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3600) % 24;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

/// Control characters are shown as escapes so text cannot drive the terminal.
#[must_use]
pub fn escape_terminal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}
