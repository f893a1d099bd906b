//! Feldman verifiable secret sharing over a prime-order group.
//!
//! A dealer samples a polynomial of degree `threshold - 1`, publishes `g*a_i` for
//! every coefficient and hands party `i` the evaluation at `i`. Any `threshold`
//! valid shares determine the secret.

mod deal;
mod encrypted_share;
mod error;

pub use deal::Deal;
pub use encrypted_share::EncryptedShare;
pub use error::VssError;

use ark_ec::CurveGroup;
use ark_ff::{Field, PrimeField};
use rand::RngCore;
use zeroize::Zeroize;

use crate::arithm::{msm, random_scalar};
use crate::byte_tree::{elements_from_node, elements_node, ByteTree, ByteTreeError, FromByteTree, ToByteTree};

/// Secret polynomial held by a dealer. Coefficients are wiped on drop.
#[derive(Clone, Debug)]
pub struct Polynomial<F: PrimeField> {
    coefficients: Vec<F>,
}

impl<F: PrimeField> Polynomial<F> {
    pub fn random_with_constant<R: RngCore + ?Sized>(
        constant: F,
        threshold: usize,
        rng: &mut R,
        statdist: u32,
    ) -> Self {
        let mut coefficients = Vec::with_capacity(threshold.max(1));
        coefficients.push(constant);
        for _ in 1..threshold {
            coefficients.push(random_scalar(rng, statdist));
        }
        Self { coefficients }
    }

    pub fn random<R: RngCore + ?Sized>(threshold: usize, rng: &mut R, statdist: u32) -> Self {
        let constant = random_scalar(rng, statdist);
        Self::random_with_constant(constant, threshold, rng, statdist)
    }

    pub fn secret(&self) -> F {
        self.coefficients[0]
    }

    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }

    /// Share of party `index`, i.e. the evaluation at `index`.
    pub fn evaluate(&self, index: u32) -> F {
        let x = F::from(index as u64);
        self.coefficients
            .iter()
            .rev()
            .fold(F::zero(), |acc, coeff| acc * x + coeff)
    }

    pub fn commit<G: CurveGroup<ScalarField = F>>(&self) -> PolynomialInExponent<G> {
        let g = G::generator();
        PolynomialInExponent {
            commitments: self.coefficients.iter().map(|c| g * c).collect(),
        }
    }
}

impl<F: PrimeField> Drop for Polynomial<F> {
    fn drop(&mut self) {
        self.coefficients.zeroize();
    }
}

/// Public commitments `g*a_0, ..., g*a_{t-1}` to a dealer's polynomial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolynomialInExponent<G: CurveGroup> {
    commitments: Vec<G>,
}

impl<G: CurveGroup> PolynomialInExponent<G> {
    /// Commitment to the zero polynomial, substituted for malformed dealer data.
    pub fn trivial(threshold: usize) -> Self {
        Self {
            commitments: vec![G::zero(); threshold],
        }
    }

    pub fn commitments(&self) -> &[G] {
        &self.commitments
    }

    pub fn threshold(&self) -> usize {
        self.commitments.len()
    }

    /// `g*secret`.
    pub fn constant(&self) -> G {
        self.commitments.first().copied().unwrap_or_else(G::zero)
    }

    /// `g*p(index)`, computed from the public commitments only.
    pub fn evaluate(&self, index: u32) -> G {
        let x = G::ScalarField::from(index as u64);
        let powers: Vec<G::ScalarField> =
            std::iter::successors(Some(G::ScalarField::ONE), |p| Some(*p * x))
                .take(self.commitments.len())
                .collect();
        msm(&self.commitments, &powers)
    }

    pub fn verify_share(&self, index: u32, share: &G::ScalarField) -> bool {
        G::generator() * share == self.evaluate(index)
    }

    /// Coefficient-wise sum, the commitment to the sum of the polynomials.
    pub fn combine<'a>(threshold: usize, polys: impl IntoIterator<Item = &'a Self>) -> Self
    where
        G: 'a,
    {
        let mut commitments = vec![G::zero(); threshold];
        for poly in polys {
            for (acc, c) in commitments.iter_mut().zip(&poly.commitments) {
                *acc += c;
            }
        }
        Self { commitments }
    }

    pub fn from_byte_tree_with_threshold(
        tree: &ByteTree,
        threshold: usize,
    ) -> Result<Self, ByteTreeError> {
        Ok(Self {
            commitments: elements_from_node(tree, Some(threshold))?,
        })
    }
}

impl<G: CurveGroup> ToByteTree for PolynomialInExponent<G> {
    fn to_byte_tree(&self) -> ByteTree {
        elements_node(&self.commitments)
    }
}

impl<G: CurveGroup> FromByteTree for PolynomialInExponent<G> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        Ok(Self {
            commitments: elements_from_node(tree, None)?,
        })
    }
}

/// Lagrange coefficients for interpolating at zero from the given share indices.
pub fn lagrange_coefficients_at_zero<F: PrimeField>(indices: &[u32]) -> Result<Vec<F>, VssError> {
    for (pos, index) in indices.iter().enumerate() {
        if *index == 0 {
            return Err(VssError::ZeroIndex);
        }
        if indices[..pos].contains(index) {
            return Err(VssError::DuplicateIndex(*index));
        }
    }

    let xs: Vec<F> = indices.iter().map(|i| F::from(*i as u64)).collect();
    let product: F = xs.iter().product();
    indices
        .iter()
        .zip(&xs)
        .map(|(index, xi)| {
            let denominator: F = xs.iter().filter(|xj| *xj != xi).map(|xj| *xj - xi).product();
            let numerator = product * xi.inverse().ok_or(VssError::ZeroIndex)?;
            let inverse = denominator
                .inverse()
                .ok_or(VssError::DuplicateIndex(*index))?;
            Ok(numerator * inverse)
        })
        .collect()
}

/// Interpolate the secret from the first `threshold` of the `(index, share)` pairs.
pub fn recover_secret<F: PrimeField>(shares: &[(u32, F)], threshold: usize) -> Result<F, VssError> {
    if shares.len() < threshold {
        return Err(VssError::BelowThreshold {
            available: shares.len(),
            threshold,
        });
    }
    let shares = &shares[..threshold];
    let indices: Vec<u32> = shares.iter().map(|(i, _)| *i).collect();
    let coefficients = lagrange_coefficients_at_zero::<F>(&indices)?;
    Ok(shares
        .iter()
        .zip(coefficients)
        .map(|((_, share), lambda)| *share * lambda)
        .sum())
}

/// Interpolate `g*secret` from `(index, g*share)` pairs.
pub fn recover_in_exponent<G: CurveGroup>(points: &[(u32, G)]) -> Result<G, VssError> {
    let indices: Vec<u32> = points.iter().map(|(i, _)| *i).collect();
    let coefficients = lagrange_coefficients_at_zero::<G::ScalarField>(&indices)?;
    let bases: Vec<G> = points.iter().map(|(_, p)| *p).collect();
    Ok(msm(&bases, &coefficients))
}
