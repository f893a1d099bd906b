use crate::config::HashFunction;
use crate::crypto::Prg;

/// Random oracle with a fixed output length in bits.
///
/// The input is hashed together with the output length into a PRG seed, and the
/// PRG output is truncated so that all bits above `output_bits` are zero.
#[derive(Clone, Copy, Debug)]
pub struct RandomOracle {
    hash: HashFunction,
    output_bits: u32,
}

impl RandomOracle {
    pub fn new(hash: HashFunction, output_bits: u32) -> Self {
        Self { hash, output_bits }
    }

    pub fn output_bits(&self) -> u32 {
        self.output_bits
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut input = Vec::with_capacity(data.len() + 4);
        input.extend_from_slice(&self.output_bits.to_be_bytes());
        input.extend_from_slice(data);
        let seed = self.hash.digest(&input);

        let len = self.output_bits.div_ceil(8) as usize;
        let mut out = Prg::new(self.hash, &seed).next_bytes(len);
        mask_high_bits(&mut out, self.output_bits);
        out
    }
}

/// Clear the bits of a big-endian byte string above `bits`.
pub(crate) fn mask_high_bits(bytes: &mut [u8], bits: u32) {
    let excess = bytes.len() as u32 * 8 - bits.min(bytes.len() as u32 * 8);
    if excess == 0 || bytes.is_empty() {
        return;
    }
    let full = (excess / 8) as usize;
    for byte in bytes.iter_mut().take(full) {
        *byte = 0;
    }
    if full < bytes.len() {
        bytes[full] &= 0xFF >> (excess % 8);
    }
}
