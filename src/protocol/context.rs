use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::bulletin_board::{PartyIndex, Tag};
use crate::byte_tree::ByteTree;
use crate::config::ProtocolParameters;
use crate::error::ProtocolError;

const PREFIX_DOMAIN: &[u8] = b"verimix/session/v1";

/// Identity of one party within a session together with the session-wide settings.
#[derive(Clone, Debug)]
pub struct ProtocolContext {
    sid: String,
    party: PartyIndex,
    parties: u32,
    threshold: u32,
    parameters: ProtocolParameters,
    session_dir: PathBuf,
    prefix: Vec<u8>,
}

impl ProtocolContext {
    pub fn new(
        sid: impl Into<String>,
        party: PartyIndex,
        parties: u32,
        threshold: u32,
        parameters: ProtocolParameters,
        session_dir: impl Into<PathBuf>,
    ) -> Result<Self, ProtocolError> {
        let sid = sid.into();
        if sid.is_empty() {
            return Err(ProtocolError::InvalidContext("empty session identifier".into()));
        }
        if parties == 0 || party == 0 || party > parties {
            return Err(ProtocolError::InvalidContext(format!(
                "party index {party} outside 1..={parties}"
            )));
        }
        if threshold == 0 || threshold > parties {
            return Err(ProtocolError::InvalidContext(format!(
                "threshold {threshold} outside 1..={parties}"
            )));
        }

        let encoded_parameters = serde_json::to_vec(&parameters)
            .map_err(|err| ProtocolError::InvalidContext(err.to_string()))?;
        let prefix_tree = ByteTree::node(vec![
            ByteTree::leaf(PREFIX_DOMAIN.to_vec()),
            ByteTree::leaf(sid.as_bytes().to_vec()),
            ByteTree::from_u32(parties),
            ByteTree::from_u32(threshold),
            ByteTree::leaf(encoded_parameters),
        ]);
        let prefix = parameters.hash.digest(&prefix_tree.to_bytes()?);

        Ok(Self {
            sid,
            party,
            parties,
            threshold,
            parameters,
            session_dir: session_dir.into(),
            prefix,
        })
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// This party's one-based index.
    pub fn party(&self) -> PartyIndex {
        self.party
    }

    pub fn parties(&self) -> u32 {
        self.parties
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn parameters(&self) -> &ProtocolParameters {
        &self.parameters
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Digest of the session identifier and parameters, prepended to every oracle query.
    pub fn random_oracle_prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn all_parties(&self) -> RangeInclusive<PartyIndex> {
        1..=self.parties
    }

    /// Parties that deal secrets and mix: the first `threshold` ones.
    pub fn dealers(&self) -> RangeInclusive<PartyIndex> {
        1..=self.threshold
    }

    pub fn is_dealer(&self) -> bool {
        self.party <= self.threshold
    }

    pub fn tag(&self, name: &str) -> Tag {
        Tag::new(self.sid.clone()).child(name)
    }
}
