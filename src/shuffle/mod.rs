//! Sigma-protocol proof that a list of ElGamal ciphertexts is a re-encryption and
//! permutation of another, together with the commitment-consistent variant that
//! binds the shuffle to a permutation commitment fixed in advance.
//!
//! Both engines are typestate machines: each step consumes the previous state, so
//! a prover cannot reply before committing and a verifier cannot check a reply
//! before it has fixed the batching vector and challenge.

mod batch;
mod cc;
mod commitment;
mod messages;
mod prover;
mod verifier;

#[cfg(test)]
mod tests;

pub use batch::batch_vector;
pub use cc::{
    CcCommittedProver, CcInstantiatedProver, CcInstantiatedVerifier, CcPrecomputedProver,
    CcShuffleProver, CcShuffleVerifier, RaisedCommitment,
};
pub use commitment::commit_permutation;
pub use messages::{
    shuffle_instance_tree, CcCommitment, CcReply, ShuffleCommitment, ShuffleReply,
};
pub use prover::{CommittedProver, InstantiatedProver, PrecomputedProver, ShuffleProver};
pub use verifier::{
    BatchedVerifier, ChallengedVerifier, InstantiatedVerifier, PermutationCommittedVerifier,
    PrecomputedVerifier, ShuffleVerifier,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShuffleError {
    #[error("cannot prove a shuffle of an empty list")]
    Empty,

    #[error("expected {expected} {what}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), ShuffleError> {
    if expected != actual {
        return Err(ShuffleError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
