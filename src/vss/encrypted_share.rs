use ark_ec::CurveGroup;
use ark_ff::PrimeField;
use rand::RngCore;

use crate::arithm::random_scalar;
use crate::byte_tree::{element_from_leaf, element_leaf, ByteTree, ByteTreeError, FromByteTree, ToByteTree};
use crate::config::HashFunction;
use crate::crypto::{canonical_serialize_bytes, Prg};

const MASK_STATDIST: u32 = 128;

/// A share encrypted to a recipient's plain key with hashed ElGamal.
///
/// `ephemeral = g*r` and `masked = share + H(pk*r)`; only the holder of the
/// secret key recomputes `pk*r = ephemeral*sk`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedShare<G: CurveGroup> {
    pub ephemeral: G,
    pub masked: G::ScalarField,
}

impl<G: CurveGroup> EncryptedShare<G> {
    pub fn encrypt<R: RngCore + ?Sized>(
        share: G::ScalarField,
        recipient: &G,
        hash: HashFunction,
        rng: &mut R,
        statdist: u32,
    ) -> Self {
        let r: G::ScalarField = random_scalar(rng, statdist);
        Self {
            ephemeral: G::generator() * r,
            masked: share + mask::<G>(&(*recipient * r), hash),
        }
    }

    pub fn decrypt(&self, private_key: &G::ScalarField, hash: HashFunction) -> G::ScalarField {
        self.masked - mask::<G>(&(self.ephemeral * private_key), hash)
    }

    /// Placeholder for a share a malformed dealer message failed to provide.
    pub fn trivial() -> Self {
        Self {
            ephemeral: G::zero(),
            masked: G::ScalarField::from(0u64),
        }
    }
}

fn mask<G: CurveGroup>(shared: &G, hash: HashFunction) -> G::ScalarField {
    let seed = canonical_serialize_bytes(&shared.into_affine());
    let len = (G::ScalarField::MODULUS_BIT_SIZE + MASK_STATDIST).div_ceil(8) as usize;
    let bytes = Prg::new(hash, &seed).next_bytes(len);
    G::ScalarField::from_be_bytes_mod_order(&bytes)
}

impl<G: CurveGroup> ToByteTree for EncryptedShare<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![element_leaf(&self.ephemeral), element_leaf(&self.masked)])
    }
}

impl<G: CurveGroup> FromByteTree for EncryptedShare<G> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(2)?;
        Ok(Self {
            ephemeral: element_from_leaf(&children[0])?,
            masked: element_from_leaf(&children[1])?,
        })
    }
}
