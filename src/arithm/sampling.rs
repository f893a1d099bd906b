use ark_ff::PrimeField;
use rand::RngCore;

use crate::crypto::mask_high_bits;

/// Uniformly random scalar with statistical distance `2^-statdist` from uniform.
///
/// Draws `MODULUS_BIT_SIZE + statdist` random bits and reduces them modulo the order.
pub fn random_scalar<F: PrimeField, R: RngCore + ?Sized>(rng: &mut R, statdist: u32) -> F {
    let len = (F::MODULUS_BIT_SIZE + statdist).div_ceil(8) as usize;
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    F::from_be_bytes_mod_order(&bytes)
}

pub fn random_scalars<F: PrimeField, R: RngCore + ?Sized>(
    n: usize,
    rng: &mut R,
    statdist: u32,
) -> Vec<F> {
    (0..n).map(|_| random_scalar(rng, statdist)).collect()
}

/// Interpret the leading `bits` bits of a big-endian string as a non-negative scalar.
///
/// Callers keep `bits` below the modulus size so the value is never reduced.
pub fn scalar_from_bits<F: PrimeField>(bytes: &[u8], bits: u32) -> F {
    let len = (bits.div_ceil(8) as usize).min(bytes.len());
    let mut truncated = bytes[..len].to_vec();
    mask_high_bits(&mut truncated, bits);
    F::from_be_bytes_mod_order(&truncated)
}
