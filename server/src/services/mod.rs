//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room membership, action submission, history and
//! ticket bookkeeping so route handlers can stay focused on protocol
//! translation.

pub mod action;
pub mod history;
pub mod room;
pub mod session;
