//! Batched proof of knowledge of exponents: for parts `y_i = g*x_i`, prove
//! knowledge of all `x_i` at once through `Y = sum e_i y_i`.

use ark_ec::CurveGroup;
use rand::RngCore;
use zeroize::Zeroize;

use crate::arithm::{inner_product, msm, random_scalar};

const LOG_TARGET: &str = "verimix::proofs::exponents";

pub struct ExponentsProver<G: CurveGroup> {
    exponents: Vec<G::ScalarField>,
    blinder: G::ScalarField,
}

impl<G: CurveGroup> ExponentsProver<G> {
    /// Returns the prover state and its commitment `g*s`.
    pub fn commit<R: RngCore + ?Sized>(
        exponents: Vec<G::ScalarField>,
        rng: &mut R,
        statdist: u32,
    ) -> (Self, G) {
        let blinder = random_scalar(rng, statdist);
        let commitment = G::generator() * blinder;
        (Self { exponents, blinder }, commitment)
    }

    /// `s + v * <x, e>`.
    pub fn reply(&self, e: &[G::ScalarField], v: G::ScalarField) -> G::ScalarField {
        self.blinder + v * inner_product(&self.exponents, e)
    }
}

impl<G: CurveGroup> Drop for ExponentsProver<G> {
    fn drop(&mut self) {
        self.exponents.zeroize();
        self.blinder.zeroize();
    }
}

pub fn verify_exponents<G: CurveGroup>(
    parts: &[G],
    e: &[G::ScalarField],
    commitment: &G,
    v: G::ScalarField,
    reply: &G::ScalarField,
) -> bool {
    if parts.len() != e.len() {
        return false;
    }
    G::generator() * reply == *commitment + msm(parts, e) * v
}

/// Check all parties' proofs with a single multi-exponentiation.
///
/// Valid when every proof shares the batching vector and challenge. A `false`
/// result only says that some proof is bad; callers then check individually.
pub fn verify_exponents_combined<G: CurveGroup>(
    parts: &[Vec<G>],
    e: &[G::ScalarField],
    commitments: &[G],
    v: G::ScalarField,
    replies: &[G::ScalarField],
) -> bool {
    if parts.len() != commitments.len() || parts.len() != replies.len() {
        return false;
    }
    if parts.iter().any(|p| p.len() != e.len()) {
        return false;
    }
    let mut combined = vec![G::zero(); e.len()];
    for party_parts in parts {
        for (acc, part) in combined.iter_mut().zip(party_parts) {
            *acc += part;
        }
    }
    let commitment: G = commitments.iter().sum();
    let reply: G::ScalarField = replies.iter().sum();
    let accepted = G::generator() * reply == commitment + msm(&combined, e) * v;
    tracing::debug!(target: LOG_TARGET, parties = parts.len(), accepted, "Combined exponent proof check");
    accepted
}
