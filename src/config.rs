use std::path::Path;

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOG_TARGET: &str = "verimix::config";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access parameter file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed parameter file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameter: {0}")]
    Invalid(String),
}

/// Hash function underlying the PRG, the random oracle and the Fiat-Shamir challenger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    #[default]
    Sha256,
    Sha512,
    Sha3_256,
}

/// How the independent generators of a session are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorStrategy {
    #[default]
    RandomOracle,
    Vss,
}

/// Source of the verifier challenges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMode {
    /// Fiat-Shamir over the session random oracle.
    #[default]
    RandomOracle,
    /// Joint coin-flipping built from verifiable secret sharing.
    CoinFlip,
}

/// Parameters shared by every sub-protocol of a session.
///
/// All parties of a session must use identical parameters; they are folded into
/// the random-oracle prefix so that a mismatch makes every proof fail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParameters {
    /// Bit length of each component of the batching vector.
    pub ebitlen: u32,
    /// Bit length of the sigma-protocol challenge.
    pub vbitlen: u32,
    /// Statistical distance (in bits) used when sampling random ring elements.
    pub rbitlen: u32,
    /// Bit length of the seed from which batching vectors are expanded.
    pub seed_bits: u32,
    pub hash: HashFunction,
    pub generators: GeneratorStrategy,
    pub challenges: ChallengeMode,
    /// Write commitment/reply transcripts for offline verification.
    pub export_proofs: bool,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            ebitlen: 100,
            vbitlen: 100,
            rbitlen: 100,
            seed_bits: 256,
            hash: HashFunction::Sha256,
            generators: GeneratorStrategy::RandomOracle,
            challenges: ChallengeMode::RandomOracle,
            export_proofs: false,
        }
    }
}

impl ProtocolParameters {
    pub fn with_ebitlen(mut self, ebitlen: u32) -> Self {
        self.ebitlen = ebitlen;
        self
    }

    pub fn with_vbitlen(mut self, vbitlen: u32) -> Self {
        self.vbitlen = vbitlen;
        self
    }

    pub fn with_rbitlen(mut self, rbitlen: u32) -> Self {
        self.rbitlen = rbitlen;
        self
    }

    pub fn with_hash(mut self, hash: HashFunction) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_generators(mut self, generators: GeneratorStrategy) -> Self {
        self.generators = generators;
        self
    }

    pub fn with_challenges(mut self, challenges: ChallengeMode) -> Self {
        self.challenges = challenges;
        self
    }

    pub fn with_export_proofs(mut self, export_proofs: bool) -> Self {
        self.export_proofs = export_proofs;
        self
    }

    /// Check the bit lengths against the order of the scalar field in use.
    ///
    /// Batching components and challenges must be strictly shorter than the group
    /// order, otherwise distinct values could collide modulo the order.
    pub fn validate_for<F: PrimeField>(&self) -> Result<(), ConfigError> {
        let order_bits = F::MODULUS_BIT_SIZE;
        if self.ebitlen == 0 || self.ebitlen >= order_bits {
            return Err(ConfigError::Invalid(format!(
                "ebitlen must be in [1, {}), got {}",
                order_bits, self.ebitlen
            )));
        }
        if self.vbitlen == 0 || self.vbitlen >= order_bits {
            return Err(ConfigError::Invalid(format!(
                "vbitlen must be in [1, {}), got {}",
                order_bits, self.vbitlen
            )));
        }
        if self.seed_bits < 128 {
            return Err(ConfigError::Invalid(format!(
                "seed_bits must be at least 128, got {}",
                self.seed_bits
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&raw)?;
        tracing::debug!(target: LOG_TARGET, path = %path.display(), ?params, "Loaded protocol parameters");
        Ok(params)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
