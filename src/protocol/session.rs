//! Per-party persistence of sub-protocol outputs, so a restarted party resumes
//! from its own verified state instead of re-running completed steps.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

use crate::byte_tree::{ByteTree, ByteTreeError, FromByteTree, ToByteTree};
use crate::config::HashFunction;
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;

const LOG_TARGET: &str = "verimix::protocol::session";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ByteTreeError,
    },
}

/// Output of a sub-protocol, tagged with whether it was read back from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Persisted<T> {
    Cached(T),
    Recomputed(T),
}

impl<T> Persisted<T> {
    pub fn value(&self) -> &T {
        match self {
            Persisted::Cached(value) | Persisted::Recomputed(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Persisted::Cached(value) | Persisted::Recomputed(value) => value,
        }
    }

    pub fn was_cached(&self) -> bool {
        matches!(self, Persisted::Cached(_))
    }
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    dir: PathBuf,
    key: String,
}

impl SessionStore {
    pub fn new(ctx: &ProtocolContext) -> Self {
        let sid_digest = HashFunction::Sha256.digest(ctx.sid().as_bytes());
        Self {
            dir: ctx.session_dir().to_path_buf(),
            key: format!("{}-p{}", hex::encode(&sid_digest[..8]), ctx.party()),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}-{}.bt", self.key))
    }

    pub async fn load<T: FromByteTree>(&self, name: &str) -> Result<Option<T>, SessionError> {
        let path = self.path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        let tree = ByteTree::from_bytes(&bytes).map_err(|source| SessionError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let value = T::from_byte_tree(&tree).map_err(|source| SessionError::Corrupt { path, source })?;
        Ok(Some(value))
    }

    /// Write atomically: a crash leaves either the old file or the new one.
    pub async fn store<T: ToByteTree>(&self, name: &str, value: &T) -> Result<(), SessionError> {
        let path = self.path(name);
        let tmp = path.with_extension("bt.tmp");
        let io_err = |source| SessionError::Io {
            path: path.clone(),
            source,
        };
        let bytes = value
            .to_byte_tree()
            .to_bytes()
            .map_err(|source| SessionError::Corrupt {
                path: path.clone(),
                source,
            })?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;
        Ok(())
    }

    /// Return the stored value for `name`, or run `compute` and store its result.
    ///
    /// A stored value is trusted as-is: it was verified before it was written.
    pub async fn load_or_compute<T, F, Fut>(
        &self,
        name: &str,
        compute: F,
    ) -> Result<Persisted<T>, ProtocolError>
    where
        T: ToByteTree + FromByteTree,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProtocolError>>,
    {
        if let Some(value) = self.load::<T>(name).await? {
            tracing::info!(target: LOG_TARGET, name, "Resuming from stored state");
            return Ok(Persisted::Cached(value));
        }
        let value = compute().await?;
        self.store(name, &value).await?;
        tracing::debug!(target: LOG_TARGET, name, "Stored state");
        Ok(Persisted::Recomputed(value))
    }
}
