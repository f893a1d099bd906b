//! Exchange of per-party "plain" ElGamal keys used to encrypt VSS shares in transit.

use ark_ec::CurveGroup;
use rand::RngCore;

use crate::bulletin_board::{BulletinBoard, PartyIndex};
use crate::byte_tree::{
    element_from_leaf, element_leaf, elements_from_node, elements_node, parse_or_default, ByteTree,
    ByteTreeError, FromByteTree, ToByteTree,
};
use crate::elgamal::ElGamalKeys;
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;

const LOG_TARGET: &str = "verimix::protocol::plain_keys";

#[derive(Clone, Debug)]
pub struct PlainKeys<G: CurveGroup> {
    keys: ElGamalKeys<G>,
    public_keys: Vec<G>,
}

impl<G: CurveGroup> PlainKeys<G> {
    pub fn new(keys: ElGamalKeys<G>, public_keys: Vec<G>) -> Self {
        Self { keys, public_keys }
    }

    pub fn own(&self) -> &ElGamalKeys<G> {
        &self.keys
    }

    pub fn public_keys(&self) -> &[G] {
        &self.public_keys
    }

    pub fn public_key(&self, party: PartyIndex) -> G {
        self.public_keys[party as usize - 1]
    }
}

impl<G: CurveGroup> ToByteTree for PlainKeys<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![self.keys.to_byte_tree(), elements_node(&self.public_keys)])
    }
}

impl<G: CurveGroup> FromByteTree for PlainKeys<G> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(2)?;
        Ok(Self {
            keys: ElGamalKeys::from_byte_tree(&children[0])?,
            public_keys: elements_from_node(&children[1], None)?,
        })
    }
}

/// Publish this party's public key and collect everybody else's.
///
/// A malformed peer key is replaced by the identity, which makes shares
/// encrypted to that peer readable by anyone without stalling the session.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = ctx.party()))]
pub async fn exchange_plain_keys<G, B, R>(
    ctx: &ProtocolContext,
    board: &B,
    rng: &mut R,
) -> Result<PlainKeys<G>, ProtocolError>
where
    G: CurveGroup,
    B: BulletinBoard + ?Sized,
    R: RngCore + ?Sized,
{
    let keys = ElGamalKeys::<G>::random(rng);
    let tag = ctx.tag("plain_keys");
    board
        .publish(ctx.party(), &tag, element_leaf(&keys.public_key))
        .await?;

    let mut public_keys = Vec::with_capacity(ctx.parties() as usize);
    for l in ctx.all_parties() {
        let tree = board.wait_for(l, &tag).await?;
        let key = parse_or_default(element_from_leaf::<G>(&tree), G::zero, "plain public key");
        public_keys.push(key);
    }
    tracing::debug!(target: LOG_TARGET, parties = public_keys.len(), "Collected plain public keys");
    Ok(PlainKeys::new(keys, public_keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin_board::InMemoryBulletinBoard;
    use crate::test_utils::contexts;
    use ark_bn254::G1Projective;
    use rand::{rngs::StdRng, SeedableRng};

    #[tokio::test]
    async fn every_party_sees_the_same_keys() {
        let board = InMemoryBulletinBoard::new();
        let handles: Vec<_> = contexts("plain", 3, 2)
            .into_iter()
            .map(|ctx| {
                let board = board.clone();
                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(ctx.party() as u64);
                    exchange_plain_keys::<G1Projective, _, _>(&ctx, &board, &mut rng).await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        for (i, keys) in results.iter().enumerate() {
            assert_eq!(keys.public_keys(), results[0].public_keys());
            assert_eq!(keys.public_key(i as u32 + 1), keys.own().public_key);
        }
    }

    #[tokio::test]
    async fn malformed_key_becomes_identity() {
        let board = InMemoryBulletinBoard::new();
        let ctxs = contexts("plain-bad", 2, 1);
        board
            .publish(2, &ctxs[1].tag("plain_keys"), ByteTree::leaf(vec![0xFF; 3]))
            .await
            .unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let keys = exchange_plain_keys::<G1Projective, _, _>(&ctxs[0], &board, &mut rng)
            .await
            .unwrap();
        assert_eq!(keys.public_key(2), G1Projective::default());
    }

    #[tokio::test]
    async fn stored_keys_parse_back() {
        let board = InMemoryBulletinBoard::new();
        let ctx = contexts("plain-stored", 1, 1).remove(0);
        let mut rng = StdRng::seed_from_u64(9);
        let keys = exchange_plain_keys::<G1Projective, _, _>(&ctx, &board, &mut rng)
            .await
            .unwrap();

        let published = board.wait_for(1, &ctx.tag("plain_keys")).await.unwrap();
        assert_eq!(
            element_from_leaf::<G1Projective>(&published).unwrap(),
            keys.own().public_key
        );

        let restored = PlainKeys::<G1Projective>::from_byte_tree(&keys.to_byte_tree()).unwrap();
        assert_eq!(restored.own().private_key, keys.own().private_key);
        assert_eq!(restored.own().public_key, keys.own().public_key);
        assert_eq!(restored.public_keys(), keys.public_keys());
        assert!(PlainKeys::<G1Projective>::from_byte_tree(&ByteTree::leaf(vec![0])).is_err());
    }
}
