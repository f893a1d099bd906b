//! Background export of proof transcripts for offline (universal) verification.

use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::byte_tree::{ByteTree, ByteTreeError};
use crate::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "verimix::protocol::export";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write proof transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode proof transcript: {0}")]
    Encode(#[from] ByteTreeError),

    #[error("proof export task was interrupted")]
    Interrupted,
}

/// Writes each proof round's transcript under `<dir>/<round>/<party>.bt` when enabled.
#[derive(Clone, Debug, Default)]
pub struct ProofExport {
    dir: Option<PathBuf>,
}

/// Pending export; must be joined before the round is reported complete.
#[must_use]
pub struct ExportHandle {
    task: Option<JoinHandle<Result<(), ExportError>>>,
}

impl ProofExport {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn to_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn spawn_write(&self, round: &str, party: u32, transcript: ByteTree) -> ExportHandle {
        let Some(dir) = self.dir.as_ref() else {
            return ExportHandle { task: None };
        };
        let round_dir = dir.join(round);
        let path = round_dir.join(format!("{party}.bt"));
        let task = spawn_named_task(format!("export-{round}-{party}"), async move {
            tokio::fs::create_dir_all(&round_dir)
                .await
                .map_err(|source| ExportError::Io {
                    path: round_dir.clone(),
                    source,
                })?;
            let bytes = transcript.to_bytes()?;
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|source| ExportError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(target: LOG_TARGET, path = %path.display(), "Exported proof transcript");
            Ok(())
        });
        ExportHandle { task: Some(task) }
    }
}

impl ExportHandle {
    pub async fn join(self) -> Result<(), ExportError> {
        let Some(task) = self.task else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(target: LOG_TARGET, %err, "Proof export task did not complete");
                Err(ExportError::Interrupted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_session_dir;

    #[tokio::test]
    async fn transcript_is_written_and_joined() {
        let dir = temp_session_dir("export");
        let export = ProofExport::to_dir(&dir);
        let transcript = ByteTree::node(vec![ByteTree::leaf(vec![1, 2])]);

        export
            .spawn_write("mix-1", 2, transcript.clone())
            .join()
            .await
            .unwrap();

        let written = std::fs::read(dir.join("mix-1").join("2.bt")).unwrap();
        assert_eq!(ByteTree::from_bytes(&written).unwrap(), transcript);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn disabled_export_is_a_no_op() {
        let export = ProofExport::disabled();
        assert!(!export.is_enabled());
        export
            .spawn_write("mix-1", 1, ByteTree::empty())
            .join()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn aborted_task_reports_interruption() {
        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok(())
        });
        task.abort();
        let handle = ExportHandle { task: Some(task) };
        assert!(matches!(handle.join().await, Err(ExportError::Interrupted)));
    }
}
