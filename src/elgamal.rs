//! ElGamal over an additive group with the standard generator `g`.
//!
//! Re-encryption adds `Enc(0, s) = (g*s, pk*s)`, which is the homomorphism the
//! proof of shuffle reasons about.

use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::RngCore;
use zeroize::Zeroize;

use crate::arithm::{msm, Permutation};
use crate::byte_tree::{element_from_leaf, element_leaf, ByteTree, ByteTreeError, FromByteTree, ToByteTree};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct ElGamalCiphertext<C: CurveGroup> {
    pub c1: C,
    pub c2: C,
}

impl<C: CurveGroup> ElGamalCiphertext<C> {
    pub fn new(c1: C, c2: C) -> Self {
        Self { c1, c2 }
    }

    /// `(r*G, M + r*PK)`.
    pub fn encrypt(message: C, randomness: C::ScalarField, public_key: C) -> Self {
        Self::new(C::zero(), message).add_encryption_layer(randomness, public_key)
    }

    /// Encryption of the identity, `(r*G, r*PK)`.
    pub fn encrypt_zero(randomness: C::ScalarField, public_key: C) -> Self {
        Self::new(C::generator() * randomness, public_key * randomness)
    }

    pub fn add_encryption_layer(&self, randomness: C::ScalarField, public_key: C) -> Self {
        *self + Self::encrypt_zero(randomness, public_key)
    }

    pub fn scale(&self, scalar: C::ScalarField) -> Self {
        Self::new(self.c1 * scalar, self.c2 * scalar)
    }

    /// Strip a decryption factor `c1 * x` from the second component.
    pub fn remove_factor(&self, factor: C) -> C {
        self.c2 - factor
    }

    pub fn decrypt(&self, private_key: C::ScalarField) -> C {
        self.remove_factor(self.c1 * private_key)
    }
}

impl<C: CurveGroup> std::ops::Add for ElGamalCiphertext<C> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.c1 + other.c1, self.c2 + other.c2)
    }
}

/// Component-wise multi-scalar multiplication over a list of ciphertexts.
pub fn msm_ciphertexts<C: CurveGroup>(
    ciphertexts: &[ElGamalCiphertext<C>],
    scalars: &[C::ScalarField],
) -> ElGamalCiphertext<C> {
    let c1s: Vec<C> = ciphertexts.iter().map(|ct| ct.c1).collect();
    let c2s: Vec<C> = ciphertexts.iter().map(|ct| ct.c2).collect();
    ElGamalCiphertext::new(msm(&c1s, scalars), msm(&c2s, scalars))
}

/// Re-encrypt every ciphertext and permute the result: `out[pi(i)] = w[i] + Enc(0, s[i])`.
pub fn shuffle_ciphertexts<C: CurveGroup>(
    ciphertexts: &[ElGamalCiphertext<C>],
    randomness: &[C::ScalarField],
    permutation: &Permutation,
    public_key: C,
) -> Vec<ElGamalCiphertext<C>> {
    let reencrypted: Vec<_> = ciphertexts
        .iter()
        .zip(randomness)
        .map(|(ct, s)| ct.add_encryption_layer(*s, public_key))
        .collect();
    permutation.apply(&reencrypted)
}

#[derive(Clone, Debug)]
pub struct ElGamalKeys<C: CurveGroup> {
    pub private_key: C::ScalarField,
    pub public_key: C,
}

impl<C: CurveGroup> ElGamalKeys<C> {
    pub fn new(private_key: C::ScalarField) -> Self {
        let public_key = C::generator() * private_key;
        Self {
            private_key,
            public_key,
        }
    }

    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::new(C::ScalarField::rand(rng))
    }
}

impl<C: CurveGroup> Drop for ElGamalKeys<C> {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl<C: CurveGroup> ToByteTree for ElGamalKeys<C> {
    fn to_byte_tree(&self) -> ByteTree {
        element_leaf(&self.private_key)
    }
}

impl<C: CurveGroup> FromByteTree for ElGamalKeys<C> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        Ok(Self::new(element_from_leaf(tree)?))
    }
}

impl<C: CurveGroup> ToByteTree for ElGamalCiphertext<C> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![element_leaf(&self.c1), element_leaf(&self.c2)])
    }
}

impl<C: CurveGroup> FromByteTree for ElGamalCiphertext<C> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(2)?;
        Ok(Self::new(
            element_from_leaf(&children[0])?,
            element_from_leaf(&children[1])?,
        ))
    }
}

pub fn ciphertexts_to_tree<C: CurveGroup>(ciphertexts: &[ElGamalCiphertext<C>]) -> ByteTree {
    ByteTree::node(ciphertexts.iter().map(ToByteTree::to_byte_tree).collect())
}

pub fn ciphertexts_from_tree<C: CurveGroup>(
    tree: &ByteTree,
    expected_len: Option<usize>,
) -> Result<Vec<ElGamalCiphertext<C>>, ByteTreeError> {
    let children = match expected_len {
        Some(n) => tree.children_exact(n)?,
        None => tree.children()?,
    };
    children.iter().map(ElGamalCiphertext::from_byte_tree).collect()
}
