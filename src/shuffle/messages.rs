use ark_ec::CurveGroup;

use crate::byte_tree::{
    element_from_leaf, element_leaf, elements_from_node, elements_node, parse_or_default,
    ByteTree, ByteTreeError, FromByteTree, ToByteTree,
};
use crate::elgamal::{ciphertexts_to_tree, ElGamalCiphertext};

/// Public statement of a shuffle, fed to the challenger before the batching vector.
pub fn shuffle_instance_tree<G: CurveGroup>(
    h: &[G],
    u: &[G],
    public_key: &G,
    input: &[ElGamalCiphertext<G>],
    output: &[ElGamalCiphertext<G>],
) -> ByteTree {
    ByteTree::node(vec![
        elements_node(h),
        elements_node(u),
        element_leaf(public_key),
        ciphertexts_to_tree(input),
        ciphertexts_to_tree(output),
    ])
}

/// First prover message of the proof of shuffle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffleCommitment<G: CurveGroup> {
    /// Bridging commitments `B`.
    pub b: Vec<G>,
    pub a_prime: G,
    pub b_prime: Vec<G>,
    pub c_prime: G,
    pub d_prime: G,
    pub f_prime: ElGamalCiphertext<G>,
}

impl<G: CurveGroup> ShuffleCommitment<G> {
    /// Identity-filled commitment, substituted for a malformed one so that
    /// verification fails instead of aborting.
    pub fn identity(n: usize) -> Self {
        Self {
            b: vec![G::zero(); n],
            a_prime: G::zero(),
            b_prime: vec![G::zero(); n],
            c_prime: G::zero(),
            d_prime: G::zero(),
            f_prime: ElGamalCiphertext::default(),
        }
    }

    pub fn parse(tree: &ByteTree, n: usize) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(6)?;
        Ok(Self {
            b: elements_from_node(&children[0], Some(n))?,
            a_prime: element_from_leaf(&children[1])?,
            b_prime: elements_from_node(&children[2], Some(n))?,
            c_prime: element_from_leaf(&children[3])?,
            d_prime: element_from_leaf(&children[4])?,
            f_prime: ElGamalCiphertext::from_byte_tree(&children[5])?,
        })
    }

    pub fn parse_or_identity(tree: &ByteTree, n: usize) -> Self {
        parse_or_default(Self::parse(tree, n), || Self::identity(n), "shuffle commitment")
    }
}

impl<G: CurveGroup> ToByteTree for ShuffleCommitment<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![
            elements_node(&self.b),
            element_leaf(&self.a_prime),
            elements_node(&self.b_prime),
            element_leaf(&self.c_prime),
            element_leaf(&self.d_prime),
            self.f_prime.to_byte_tree(),
        ])
    }
}

/// Second prover message: one reply per committed secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffleReply<G: CurveGroup> {
    pub k_a: G::ScalarField,
    pub k_b: Vec<G::ScalarField>,
    pub k_c: G::ScalarField,
    pub k_d: G::ScalarField,
    pub k_e: Vec<G::ScalarField>,
    pub k_f: G::ScalarField,
}

impl<G: CurveGroup> ShuffleReply<G> {
    pub fn zero(n: usize) -> Self {
        let zero = G::ScalarField::from(0u64);
        Self {
            k_a: zero,
            k_b: vec![zero; n],
            k_c: zero,
            k_d: zero,
            k_e: vec![zero; n],
            k_f: zero,
        }
    }

    pub fn parse(tree: &ByteTree, n: usize) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(6)?;
        Ok(Self {
            k_a: element_from_leaf(&children[0])?,
            k_b: elements_from_node(&children[1], Some(n))?,
            k_c: element_from_leaf(&children[2])?,
            k_d: element_from_leaf(&children[3])?,
            k_e: elements_from_node(&children[4], Some(n))?,
            k_f: element_from_leaf(&children[5])?,
        })
    }

    pub fn parse_or_zero(tree: &ByteTree, n: usize) -> Self {
        parse_or_default(Self::parse(tree, n), || Self::zero(n), "shuffle reply")
    }
}

impl<G: CurveGroup> ToByteTree for ShuffleReply<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![
            element_leaf(&self.k_a),
            elements_node(&self.k_b),
            element_leaf(&self.k_c),
            element_leaf(&self.k_d),
            elements_node(&self.k_e),
            element_leaf(&self.k_f),
        ])
    }
}

/// First prover message of the commitment-consistent proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CcCommitment<G: CurveGroup> {
    pub a_prime: G,
    pub f_prime: ElGamalCiphertext<G>,
}

impl<G: CurveGroup> CcCommitment<G> {
    pub fn parse(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(2)?;
        Ok(Self {
            a_prime: element_from_leaf(&children[0])?,
            f_prime: ElGamalCiphertext::from_byte_tree(&children[1])?,
        })
    }

    pub fn parse_or_identity(tree: &ByteTree) -> Self {
        parse_or_default(
            Self::parse(tree),
            || Self {
                a_prime: G::zero(),
                f_prime: ElGamalCiphertext::default(),
            },
            "commitment-consistent commitment",
        )
    }
}

impl<G: CurveGroup> ToByteTree for CcCommitment<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![element_leaf(&self.a_prime), self.f_prime.to_byte_tree()])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CcReply<G: CurveGroup> {
    pub k_a: G::ScalarField,
    pub k_e: Vec<G::ScalarField>,
    pub k_f: G::ScalarField,
}

impl<G: CurveGroup> CcReply<G> {
    pub fn parse(tree: &ByteTree, n: usize) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(3)?;
        Ok(Self {
            k_a: element_from_leaf(&children[0])?,
            k_e: elements_from_node(&children[1], Some(n))?,
            k_f: element_from_leaf(&children[2])?,
        })
    }

    pub fn parse_or_zero(tree: &ByteTree, n: usize) -> Self {
        let zero = G::ScalarField::from(0u64);
        parse_or_default(
            Self::parse(tree, n),
            || Self {
                k_a: zero,
                k_e: vec![zero; n],
                k_f: zero,
            },
            "commitment-consistent reply",
        )
    }
}

impl<G: CurveGroup> ToByteTree for CcReply<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![
            element_leaf(&self.k_a),
            elements_node(&self.k_e),
            element_leaf(&self.k_f),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Fr, G1Projective};
    use ark_std::{test_rng, UniformRand};

    #[test]
    fn commitment_parses_with_expected_width() {
        let mut rng = test_rng();
        let commitment = ShuffleCommitment::<G1Projective> {
            b: (0..3).map(|_| G1Projective::rand(&mut rng)).collect(),
            a_prime: G1Projective::rand(&mut rng),
            b_prime: (0..3).map(|_| G1Projective::rand(&mut rng)).collect(),
            c_prime: G1Projective::rand(&mut rng),
            d_prime: G1Projective::rand(&mut rng),
            f_prime: ElGamalCiphertext::new(G1Projective::rand(&mut rng), G1Projective::rand(&mut rng)),
        };
        let tree = commitment.to_byte_tree();
        assert_eq!(ShuffleCommitment::parse(&tree, 3).unwrap(), commitment);
        assert_eq!(ShuffleCommitment::<G1Projective>::parse_or_identity(&tree, 4), ShuffleCommitment::identity(4));
    }

    #[test]
    fn malformed_reply_becomes_zero() {
        let mut rng = test_rng();
        let reply = ShuffleReply::<G1Projective> {
            k_a: Fr::rand(&mut rng),
            k_b: vec![Fr::rand(&mut rng); 2],
            k_c: Fr::rand(&mut rng),
            k_d: Fr::rand(&mut rng),
            k_e: vec![Fr::rand(&mut rng); 2],
            k_f: Fr::rand(&mut rng),
        };
        assert_eq!(ShuffleReply::parse_or_zero(&reply.to_byte_tree(), 2), reply);
        assert_eq!(
            ShuffleReply::<G1Projective>::parse_or_zero(&ByteTree::leaf(vec![1]), 2),
            ShuffleReply::zero(2)
        );
    }

    #[test]
    fn cc_messages_parse_back_or_fall_back() {
        let mut rng = test_rng();
        let commitment = CcCommitment::<G1Projective> {
            a_prime: G1Projective::rand(&mut rng),
            f_prime: ElGamalCiphertext::new(G1Projective::rand(&mut rng), G1Projective::rand(&mut rng)),
        };
        assert_eq!(CcCommitment::parse(&commitment.to_byte_tree()).unwrap(), commitment);
        let fallback = CcCommitment::<G1Projective>::parse_or_identity(&ByteTree::empty());
        assert_eq!(fallback.a_prime, G1Projective::default());
        assert_eq!(fallback.f_prime, ElGamalCiphertext::default());

        let reply = CcReply::<G1Projective> {
            k_a: Fr::rand(&mut rng),
            k_e: (0..3).map(|_| Fr::rand(&mut rng)).collect(),
            k_f: Fr::rand(&mut rng),
        };
        let tree = reply.to_byte_tree();
        assert_eq!(CcReply::parse(&tree, 3).unwrap(), reply);
        assert_eq!(
            CcReply::<G1Projective>::parse(&tree, 2),
            Err(ByteTreeError::WrongArity {
                expected: 2,
                actual: 3
            })
        );
        let zero = CcReply::<G1Projective>::parse_or_zero(&tree, 2);
        assert_eq!(zero.k_e, vec![Fr::from(0u64); 2]);
        assert_eq!(zero.k_a, Fr::from(0u64));
    }
}
