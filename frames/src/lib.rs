//! Shared wire model for the tablechat realtime protocol.
//!
//! This crate owns everything both sides of the socket must agree on: the
//! frame envelope, the event names, the action data model and the dice
//! evaluator. The server re-validates what the client built with the same
//! code, so the two never drift apart.

pub mod action;
pub mod dice;
pub mod frame;

pub use action::{Action, ActionDraft, ActionType, Author, ValidatedDraft, ValidationError};
pub use dice::{DiceExpr, DiceRoll, ParseFallbackError};
pub use frame::{Data, ErrorCode, Frame, Status};
