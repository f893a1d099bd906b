use ark_ff::PrimeField;

use crate::arithm::scalar_from_bits;
use crate::config::HashFunction;
use crate::crypto::Prg;

/// Expand a public seed into `n` batching exponents of `ebitlen` bits each.
pub fn batch_vector<F: PrimeField>(
    hash: HashFunction,
    seed: &[u8],
    n: usize,
    ebitlen: u32,
) -> Vec<F> {
    let mut prg = Prg::new(hash, seed);
    let len = ebitlen.div_ceil(8) as usize;
    (0..n)
        .map(|_| scalar_from_bits(&prg.next_bytes(len), ebitlen))
        .collect()
}
