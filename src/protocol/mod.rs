//! Multi-party sub-protocols run over the bulletin board and their orchestration.

pub mod context;
pub mod decryption;
pub mod dkg;
pub mod export;
pub mod generators;
pub mod mixnet;
pub mod plain_keys;
pub mod session;
pub mod sigma;

pub use context::ProtocolContext;
pub use dkg::DkgOutput;
pub use export::ProofExport;
pub use generators::{IndependentGenerators, IndependentGeneratorsSource};
pub use mixnet::MixServer;
pub use plain_keys::PlainKeys;
pub use session::{Persisted, SessionStore};
