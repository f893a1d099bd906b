pub mod arithm;
pub mod bulletin_board;
pub mod byte_tree;
pub mod challenger;
pub mod config;
pub mod crypto;
pub mod elgamal;
pub mod error;
pub mod proofs;
pub mod protocol;
pub mod shuffle;
pub mod tokio_tools;
pub mod vss;

#[cfg(test)]
pub mod test_utils;

pub use bulletin_board::{BulletinBoard, InMemoryBulletinBoard, PartyIndex, Tag};
pub use byte_tree::{ByteTree, FromByteTree, ToByteTree};
pub use config::ProtocolParameters;
pub use elgamal::{ElGamalCiphertext, ElGamalKeys};
pub use error::ProtocolError;
pub use protocol::{MixServer, ProtocolContext};
