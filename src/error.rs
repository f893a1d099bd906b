use thiserror::Error;

use crate::bulletin_board::BoardError;
use crate::byte_tree::ByteTreeError;
use crate::config::ConfigError;
use crate::protocol::export::ExportError;
use crate::protocol::session::SessionError;
use crate::shuffle::ShuffleError;
use crate::vss::VssError;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    ByteTree(#[from] ByteTreeError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Vss(#[from] VssError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Shuffle(#[from] ShuffleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid session setup: {0}")]
    InvalidContext(String),

    #[error("{step} requires {required} to have run first")]
    MissingPrerequisite {
        step: &'static str,
        required: &'static str,
    },

    #[error("every dealer was disqualified during key generation")]
    NoQualifiedDealers,

    #[error("only {accepted} parties produced valid decryption factors, {threshold} needed")]
    InsufficientDecryptionFactors { accepted: usize, threshold: usize },
}
