use ark_serialize::CanonicalSerialize;
use sha2::{Digest, Sha256, Sha512};
use sha3::Sha3_256;

use crate::config::HashFunction;

impl HashFunction {
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashFunction::Sha256 => Sha256::digest(data).to_vec(),
            HashFunction::Sha512 => Sha512::digest(data).to_vec(),
            HashFunction::Sha3_256 => Sha3_256::digest(data).to_vec(),
        }
    }

    /// Digest of several byte strings, each prefixed by its length as a `u64`.
    pub fn digest_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut input = Vec::new();
        for part in parts {
            input.extend_from_slice(&(part.len() as u64).to_be_bytes());
            input.extend_from_slice(part);
        }
        self.digest(&input)
    }

    pub fn output_len(&self) -> usize {
        match self {
            HashFunction::Sha256 | HashFunction::Sha3_256 => 32,
            HashFunction::Sha512 => 64,
        }
    }
}

pub fn canonical_serialize_bytes<T: CanonicalSerialize>(value: &T) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut buf)
        .expect("serializing into a Vec cannot fail");
    buf
}
