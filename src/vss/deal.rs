use ark_ec::CurveGroup;
use rand::RngCore;

use super::{EncryptedShare, Polynomial, PolynomialInExponent};
use crate::byte_tree::{ByteTree, ByteTreeError, FromByteTree, ToByteTree};
use crate::config::HashFunction;

/// Dealer broadcast: polynomial commitments and one encrypted share per party.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deal<G: CurveGroup> {
    pub commitment: PolynomialInExponent<G>,
    pub shares: Vec<EncryptedShare<G>>,
}

impl<G: CurveGroup> Deal<G> {
    /// Share `poly` among the holders of `recipients`; party `i` gets `p(i)`.
    pub fn new<R: RngCore + ?Sized>(
        poly: &Polynomial<G::ScalarField>,
        recipients: &[G],
        hash: HashFunction,
        rng: &mut R,
        statdist: u32,
    ) -> Self {
        let shares = recipients
            .iter()
            .enumerate()
            .map(|(i, pk)| {
                EncryptedShare::encrypt(poly.evaluate(i as u32 + 1), pk, hash, rng, statdist)
            })
            .collect();
        Self {
            commitment: poly.commit(),
            shares,
        }
    }

    /// Stand-in for a malformed deal: commits to zero and carries no usable shares.
    pub fn trivial(threshold: usize, parties: usize) -> Self {
        Self {
            commitment: PolynomialInExponent::trivial(threshold),
            shares: vec![EncryptedShare::trivial(); parties],
        }
    }

    pub fn parse(tree: &ByteTree, threshold: usize, parties: usize) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(2)?;
        let commitment =
            PolynomialInExponent::from_byte_tree_with_threshold(&children[0], threshold)?;
        let shares = children[1]
            .children_exact(parties)?
            .iter()
            .map(EncryptedShare::from_byte_tree)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commitment, shares })
    }
}

impl<G: CurveGroup> ToByteTree for Deal<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![
            self.commitment.to_byte_tree(),
            ByteTree::node(self.shares.iter().map(ToByteTree::to_byte_tree).collect()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::ElGamalKeys;
    use ark_bn254::{Fr, G1Projective};
    use ark_std::test_rng;

    #[test]
    fn every_recipient_decrypts_a_valid_share() {
        let mut rng = test_rng();
        let keys: Vec<_> = (0..4).map(|_| ElGamalKeys::<G1Projective>::random(&mut rng)).collect();
        let recipients: Vec<_> = keys.iter().map(|k| k.public_key).collect();
        let poly = Polynomial::<Fr>::random(3, &mut rng, 64);

        let deal = Deal::new(&poly, &recipients, HashFunction::Sha256, &mut rng, 64);
        let parsed = Deal::parse(&deal.to_byte_tree(), 3, 4).unwrap();
        assert_eq!(parsed, deal);

        for (i, key) in keys.iter().enumerate() {
            let share = parsed.shares[i].decrypt(&key.private_key, HashFunction::Sha256);
            assert!(parsed.commitment.verify_share(i as u32 + 1, &share));
        }
        assert!(Deal::<G1Projective>::parse(&deal.to_byte_tree(), 2, 4).is_err());
    }
}
