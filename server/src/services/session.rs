//! Session identity and WS-ticket management.
//!
//! ARCHITECTURE
//! ============
//! A client announces a nickname over HTTP and receives a one-time,
//! short-lived ticket bound to a fresh `user_id`. The websocket upgrade
//! presents the ticket in its query string; the connection's identity is
//! whatever the ticket was bound to, never what later frames claim.
//!
//! TRADE-OFFS
//! ==========
//! Ticket consumption is destructive to guarantee single use; this favors
//! replay safety over reconnect convenience. Tickets live only in memory.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use frames::{Author, ErrorCode};
use rand::Rng;
use uuid::Uuid;

/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_LEN: usize = 32;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a short-lived 16-byte hex WS ticket.
#[must_use]
pub(crate) fn generate_ws_ticket() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("nickname required")]
    EmptyNickname,
    #[error("nickname longer than {MAX_NICKNAME_LEN} characters")]
    NicknameTooLong,
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyNickname => "E_SESSION_EMPTY_NICKNAME",
            Self::NicknameTooLong => "E_SESSION_NICKNAME_TOO_LONG",
        }
    }
}

#[derive(Debug, Clone)]
struct PendingTicket {
    author: Author,
    expires_at: Instant,
}

/// Outstanding WS tickets. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    tickets: Arc<Mutex<HashMap<String, PendingTicket>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, tickets: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Mint a fresh identity for `nickname` and a ticket bound to it.
    ///
    /// # Errors
    ///
    /// Rejects blank or overlong nicknames.
    pub fn issue(&self, nickname: &str) -> Result<(String, Author), SessionError> {
        self.issue_at(nickname, Instant::now())
    }

    pub(crate) fn issue_at(&self, nickname: &str, now: Instant) -> Result<(String, Author), SessionError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(SessionError::EmptyNickname);
        }
        if nickname.chars().count() > MAX_NICKNAME_LEN {
            return Err(SessionError::NicknameTooLong);
        }

        let author = Author { user_id: Uuid::new_v4().to_string(), nickname: nickname.to_owned() };
        let ticket = generate_ws_ticket();

        let mut tickets = self
            .tickets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tickets.retain(|_, pending| pending.expires_at > now);
        tickets.insert(ticket.clone(), PendingTicket { author: author.clone(), expires_at: now + self.ttl });
        Ok((ticket, author))
    }

    /// Redeem a ticket. Returns `None` for unknown, used, or expired tickets.
    #[must_use]
    pub fn consume(&self, ticket: &str) -> Option<Author> {
        self.consume_at(ticket, Instant::now())
    }

    pub(crate) fn consume_at(&self, ticket: &str, now: Instant) -> Option<Author> {
        let pending = self
            .tickets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(ticket)?;
        (pending.expires_at > now).then_some(pending.author)
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.tickets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
