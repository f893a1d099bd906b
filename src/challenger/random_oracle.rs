use async_trait::async_trait;

use super::Challenger;
use crate::bulletin_board::Tag;
use crate::byte_tree::{ByteTree, ByteTreeError};
use crate::config::HashFunction;
use crate::crypto::RandomOracle;
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;

/// Fiat-Shamir challenger: hashes the session prefix, the step tag and the transcript.
#[derive(Clone, Debug)]
pub struct RandomOracleChallenger {
    prefix: Vec<u8>,
    hash: HashFunction,
}

impl RandomOracleChallenger {
    pub fn new(prefix: Vec<u8>, hash: HashFunction) -> Self {
        Self { prefix, hash }
    }

    pub fn from_context(ctx: &ProtocolContext) -> Self {
        Self::new(ctx.random_oracle_prefix().to_vec(), ctx.parameters().hash)
    }

    pub fn derive(&self, tag: &Tag, data: &ByteTree, bitlen: u32) -> Result<Vec<u8>, ByteTreeError> {
        let input = ByteTree::node(vec![
            ByteTree::leaf(self.prefix.clone()),
            ByteTree::leaf(tag.as_str().as_bytes().to_vec()),
            data.clone(),
        ]);
        Ok(RandomOracle::new(self.hash, bitlen).digest(&input.to_bytes()?))
    }
}

#[async_trait]
impl Challenger for RandomOracleChallenger {
    async fn challenge(
        &self,
        tag: &Tag,
        data: &ByteTree,
        bitlen: u32,
        _statdist: u32,
    ) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.derive(tag, data, bitlen)?)
    }
}
