//! Group and ring helpers shared by the proof engines and protocols.

mod permutation;
mod sampling;

pub use permutation::{Permutation, PermutationError};
pub use sampling::{random_scalar, random_scalars, scalar_from_bits};

use ark_ec::CurveGroup;
use ark_ff::Field;

/// `sum_i bases[i] * scalars[i]`, the additive form of an exponentiated product.
pub fn msm<G: CurveGroup>(bases: &[G], scalars: &[G::ScalarField]) -> G {
    debug_assert_eq!(bases.len(), scalars.len());
    let affine = G::normalize_batch(bases);
    G::msm_unchecked(&affine, scalars)
}

pub fn sum<G: CurveGroup>(elements: &[G]) -> G {
    elements.iter().sum()
}

pub fn inner_product<F: Field>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| *x * y).sum()
}

pub fn product<F: Field>(values: &[F]) -> F {
    values.iter().product()
}

/// Component-wise sum of equally long element arrays.
pub fn add_arrays<G: CurveGroup>(left: &[G], right: &[G]) -> Vec<G> {
    debug_assert_eq!(left.len(), right.len());
    left.iter().zip(right).map(|(a, b)| *a + b).collect()
}
