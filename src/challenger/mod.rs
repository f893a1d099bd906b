//! Sources of public randomness for batching vectors and sigma-protocol challenges.

mod coin_flip;
mod random_oracle;

pub use coin_flip::CoinFlipChallenger;
pub use random_oracle::RandomOracleChallenger;

use ark_ff::PrimeField;
use async_trait::async_trait;

use crate::arithm::scalar_from_bits;
use crate::bulletin_board::Tag;
use crate::byte_tree::ByteTree;
use crate::error::ProtocolError;

#[async_trait]
pub trait Challenger: Send + Sync {
    /// Produce `bitlen` public random bits (big-endian, high bits cleared) for the
    /// step labelled `tag`, after the transcript `data` has been fixed.
    ///
    /// Every party must call this with the same arguments for the same step.
    async fn challenge(
        &self,
        tag: &Tag,
        data: &ByteTree,
        bitlen: u32,
        statdist: u32,
    ) -> Result<Vec<u8>, ProtocolError>;
}

/// Challenge interpreted as a non-negative scalar below `2^bitlen`.
pub async fn challenge_scalar<F: PrimeField>(
    challenger: &dyn Challenger,
    tag: &Tag,
    data: &ByteTree,
    bitlen: u32,
    statdist: u32,
) -> Result<F, ProtocolError> {
    let bytes = challenger.challenge(tag, data, bitlen, statdist).await?;
    Ok(scalar_from_bits(&bytes, bitlen))
}
