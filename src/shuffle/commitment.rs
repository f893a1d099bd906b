use ark_ec::CurveGroup;
use rand::RngCore;

use crate::arithm::{random_scalars, Permutation};

/// Pedersen commitment to a permutation: `u[pi(j)] = g*r[j] + h[j]`.
///
/// Returns the commitment together with the randomness `r` needed to open it.
pub fn commit_permutation<G: CurveGroup, R: RngCore + ?Sized>(
    h: &[G],
    permutation: &Permutation,
    rng: &mut R,
    statdist: u32,
) -> (Vec<G>, Vec<G::ScalarField>) {
    let r = random_scalars(h.len(), rng, statdist);
    (commitment_from_randomness(h, permutation, &r), r)
}

pub(crate) fn commitment_from_randomness<G: CurveGroup>(
    h: &[G],
    permutation: &Permutation,
    r: &[G::ScalarField],
) -> Vec<G> {
    let g = G::generator();
    let x: Vec<G> = h.iter().zip(r).map(|(h, r)| g * r + h).collect();
    permutation.apply(&x)
}
