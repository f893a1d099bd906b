use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{BoardError, BulletinBoard, PartyIndex, Tag};
use crate::byte_tree::ByteTree;

const LOG_TARGET: &str = "verimix::bulletin_board";

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<(PartyIndex, Tag), ByteTree>>,
    published: Notify,
}

/// Process-local board shared by parties running as tasks of one runtime.
#[derive(Clone, Default)]
pub struct InMemoryBulletinBoard {
    inner: Arc<Inner>,
    read_timeout: Option<Duration>,
}

impl InMemoryBulletinBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail reads that stay unanswered for longer than `timeout`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, party: PartyIndex, tag: &Tag) -> Option<ByteTree> {
        self.inner
            .entries
            .lock()
            .get(&(party, tag.clone()))
            .cloned()
    }

    async fn wait_unbounded(&self, party: PartyIndex, tag: &Tag) -> ByteTree {
        loop {
            let notified = self.inner.published.notified();
            tokio::pin!(notified);
            // Register before checking so a publish in between is not missed.
            notified.as_mut().enable();
            if let Some(data) = self.lookup(party, tag) {
                return data;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl BulletinBoard for InMemoryBulletinBoard {
    async fn publish(&self, party: PartyIndex, tag: &Tag, data: ByteTree) -> Result<(), BoardError> {
        {
            let mut entries = self.inner.entries.lock();
            match entries.get(&(party, tag.clone())) {
                Some(existing) if *existing == data => {
                    tracing::trace!(target: LOG_TARGET, party, %tag, "Ignoring identical republish");
                    return Ok(());
                }
                Some(_) => {
                    return Err(BoardError::Conflict {
                        party,
                        tag: tag.clone(),
                    });
                }
                None => {
                    tracing::trace!(
                        target: LOG_TARGET,
                        party,
                        %tag,
                        bytes = data.encoded_len(),
                        "Published"
                    );
                    entries.insert((party, tag.clone()), data);
                }
            }
        }
        self.inner.published.notify_waiters();
        Ok(())
    }

    async fn wait_for(&self, party: PartyIndex, tag: &Tag) -> Result<ByteTree, BoardError> {
        match self.read_timeout {
            None => Ok(self.wait_unbounded(party, tag).await),
            Some(timeout) => tokio::time::timeout(timeout, self.wait_unbounded(party, tag))
                .await
                .map_err(|_| BoardError::Timeout {
                    party,
                    tag: tag.clone(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_blocks_until_publication() {
        let board = InMemoryBulletinBoard::new();
        let tag = Tag::new("s").child("x");

        let reader = {
            let board = board.clone();
            let tag = tag.clone();
            tokio::spawn(async move { board.wait_for(2, &tag).await })
        };
        tokio::task::yield_now().await;
        board.publish(2, &tag, ByteTree::leaf(vec![1])).await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), ByteTree::leaf(vec![1]));
    }

    #[tokio::test]
    async fn entries_are_write_once() {
        let board = InMemoryBulletinBoard::new();
        let tag = Tag::new("s");

        board.publish(1, &tag, ByteTree::leaf(vec![1])).await.unwrap();
        board.publish(1, &tag, ByteTree::leaf(vec![1])).await.unwrap();
        assert_eq!(
            board.publish(1, &tag, ByteTree::leaf(vec![2])).await,
            Err(BoardError::Conflict { party: 1, tag: tag.clone() })
        );
        // Same tag for another party is a separate entry.
        board.publish(2, &tag, ByteTree::leaf(vec![2])).await.unwrap();
        assert_eq!(board.len(), 2);
    }

    #[tokio::test]
    async fn read_timeout_is_reported() {
        let board = InMemoryBulletinBoard::new().with_read_timeout(Duration::from_millis(20));
        let tag = Tag::new("missing");
        assert_eq!(
            board.wait_for(3, &tag).await,
            Err(BoardError::Timeout { party: 3, tag })
        );
    }
}
