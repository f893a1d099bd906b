//! Authenticated broadcast channel shared by all parties of a session.
//!
//! Every entry is keyed by the publishing party and a hierarchical tag. An entry
//! is written once; readers block until it appears.

mod in_memory;

pub use in_memory::InMemoryBulletinBoard;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::byte_tree::ByteTree;

/// One-based index of a party in the session.
pub type PartyIndex = u32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("party {party} already published a different message under {tag}")]
    Conflict { party: PartyIndex, tag: Tag },

    #[error("timed out waiting for party {party} to publish {tag}")]
    Timeout { party: PartyIndex, tag: Tag },
}

/// Hierarchical message label, rendered as `/`-separated segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(root: impl Into<String>) -> Self {
        Tag(root.into())
    }

    pub fn child(&self, segment: impl fmt::Display) -> Tag {
        Tag(format!("{}/{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait BulletinBoard: Send + Sync {
    /// Publish `data` as party `party` under `tag`.
    ///
    /// Republishing identical data is a no-op so that a restarted party can
    /// replay its messages.
    async fn publish(&self, party: PartyIndex, tag: &Tag, data: ByteTree) -> Result<(), BoardError>;

    /// Block until party `party` has published under `tag` and return the data.
    async fn wait_for(&self, party: PartyIndex, tag: &Tag) -> Result<ByteTree, BoardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_nest_with_slashes() {
        let tag = Tag::new("session").child("mix").child(3);
        assert_eq!(tag.as_str(), "session/mix/3");
        assert_eq!(tag.to_string(), "session/mix/3");
    }
}
