//! Transport-free client logic for tablechat.
//!
//! The composer turns typed input into action drafts and the feed turns
//! received actions into rendered entries. Neither touches a socket, so the
//! terminal client and any other front end share the same behavior.

pub mod composer;
pub mod context;
pub mod feed;

pub use composer::Composer;
pub use context::ClientContext;
pub use feed::{EntryBody, Feed, FeedEntry};
