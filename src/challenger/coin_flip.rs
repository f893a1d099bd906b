use std::sync::Arc;

use ark_ec::CurveGroup;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;

use super::Challenger;
use crate::arithm::random_scalar;
use crate::bulletin_board::{BulletinBoard, Tag};
use crate::byte_tree::{element_from_leaf, element_leaf, parse_or_default, ByteTree, ToByteTree};
use crate::crypto::{canonical_serialize_bytes, RandomOracle};
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;
use crate::protocol::plain_keys::PlainKeys;
use crate::vss::{recover_secret, Deal, Polynomial, PolynomialInExponent};

const LOG_TARGET: &str = "verimix::challenger::coin_flip";

/// Jointly generated randomness: every dealer shares a random scalar with Feldman
/// VSS, then opens it. Openings that do not match the commitment are recovered
/// from the parties' shares, so no single dealer can bias or block the coin.
pub struct CoinFlipChallenger<G: CurveGroup, B: BulletinBoard> {
    ctx: Arc<ProtocolContext>,
    board: B,
    keys: PlainKeys<G>,
    rng: Mutex<StdRng>,
}

impl<G: CurveGroup, B: BulletinBoard> CoinFlipChallenger<G, B> {
    pub fn new(ctx: Arc<ProtocolContext>, board: B, keys: PlainKeys<G>, rng: StdRng) -> Self {
        Self {
            ctx,
            board,
            keys,
            rng: Mutex::new(rng),
        }
    }

    fn deal(&self, statdist: u32) -> (G::ScalarField, Deal<G>) {
        let threshold = self.ctx.threshold() as usize;
        let mut rng = self.rng.lock();
        let secret = random_scalar(&mut *rng, statdist);
        let poly = Polynomial::random_with_constant(secret, threshold, &mut *rng, statdist);
        let deal = Deal::new(
            &poly,
            self.keys.public_keys(),
            self.ctx.parameters().hash,
            &mut *rng,
            statdist,
        );
        (secret, deal)
    }

    /// Reconstruct the secrets of dealers whose openings were rejected.
    async fn recover(
        &self,
        tag: &Tag,
        failed: &[u32],
        dealt: &[(PolynomialInExponent<G>, G::ScalarField)],
    ) -> Result<Vec<G::ScalarField>, ProtocolError> {
        let threshold = self.ctx.threshold() as usize;
        let own_shares = ByteTree::node(
            failed
                .iter()
                .map(|l| element_leaf(&dealt[*l as usize - 1].1))
                .collect(),
        );
        self.board.publish(self.ctx.party(), tag, own_shares).await?;

        let mut collected: Vec<Vec<(u32, G::ScalarField)>> = vec![Vec::new(); failed.len()];
        for i in self.ctx.all_parties() {
            let tree = self.board.wait_for(i, tag).await?;
            let Ok(children) = tree.children_exact(failed.len()) else {
                tracing::warn!(target: LOG_TARGET, party = i, "Ignoring malformed recovery shares");
                continue;
            };
            for (pos, l) in failed.iter().enumerate() {
                let commitment = &dealt[*l as usize - 1].0;
                if let Ok(share) = element_from_leaf::<G::ScalarField>(&children[pos]) {
                    if commitment.verify_share(i, &share) {
                        collected[pos].push((i, share));
                    }
                }
            }
        }

        let mut recovered = Vec::with_capacity(failed.len());
        for (pos, l) in failed.iter().enumerate() {
            if collected[pos].len() >= threshold {
                recovered.push(recover_secret(&collected[pos], threshold)?);
            } else {
                tracing::warn!(
                    target: LOG_TARGET,
                    dealer = l,
                    valid_shares = collected[pos].len(),
                    "Dealer secret unrecoverable, contributing zero"
                );
            }
        }
        Ok(recovered)
    }
}

#[async_trait]
impl<G, B> Challenger for CoinFlipChallenger<G, B>
where
    G: CurveGroup,
    B: BulletinBoard,
{
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = self.ctx.party(), %tag))]
    async fn challenge(
        &self,
        tag: &Tag,
        _data: &ByteTree,
        bitlen: u32,
        statdist: u32,
    ) -> Result<Vec<u8>, ProtocolError> {
        let threshold = self.ctx.threshold() as usize;
        let parties = self.ctx.parties() as usize;
        let hash = self.ctx.parameters().hash;
        let deal_tag = tag.child("coin_deal");
        let open_tag = tag.child("coin_open");

        let own_secret = if self.ctx.is_dealer() {
            let (secret, deal) = self.deal(statdist);
            self.board
                .publish(self.ctx.party(), &deal_tag, deal.to_byte_tree())
                .await?;
            Some(secret)
        } else {
            None
        };

        let own_index = self.ctx.party() as usize - 1;
        let mut dealt = Vec::with_capacity(threshold);
        for l in self.ctx.dealers() {
            let tree = self.board.wait_for(l, &deal_tag).await?;
            let deal = parse_or_default(
                Deal::<G>::parse(&tree, threshold, parties),
                || Deal::trivial(threshold, parties),
                "coin deal",
            );
            let share = deal.shares[own_index].decrypt(&self.keys.own().private_key, hash);
            dealt.push((deal.commitment, share));
        }

        if let Some(secret) = own_secret {
            self.board
                .publish(self.ctx.party(), &open_tag, element_leaf(&secret))
                .await?;
        }

        let mut contributions = Vec::with_capacity(threshold);
        let mut failed = Vec::new();
        for (l, (commitment, _)) in self.ctx.dealers().zip(&dealt) {
            let tree = self.board.wait_for(l, &open_tag).await?;
            match element_from_leaf::<G::ScalarField>(&tree) {
                Ok(secret) if G::generator() * secret == commitment.constant() => {
                    contributions.push(secret)
                }
                _ => failed.push(l),
            }
        }
        if !failed.is_empty() {
            tracing::warn!(target: LOG_TARGET, ?failed, "Recovering rejected coin openings");
            contributions.extend(self.recover(&tag.child("coin_recover"), &failed, &dealt).await?);
        }

        let coin: G::ScalarField = contributions.iter().sum();
        let seed = ByteTree::node(vec![
            ByteTree::leaf(self.ctx.random_oracle_prefix().to_vec()),
            ByteTree::leaf(tag.as_str().as_bytes().to_vec()),
            ByteTree::leaf(canonical_serialize_bytes(&coin)),
        ]);
        tracing::trace!(target: LOG_TARGET, contributions = contributions.len(), "Coin flipped");
        Ok(RandomOracle::new(hash, bitlen).digest(&seed.to_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin_board::InMemoryBulletinBoard;
    use crate::protocol::plain_keys::exchange_plain_keys;
    use crate::test_utils::contexts;
    use ark_bn254::G1Projective;
    use rand::SeedableRng;

    async fn setup(
        ctx: ProtocolContext,
        board: &InMemoryBulletinBoard,
        seed: u64,
    ) -> CoinFlipChallenger<G1Projective, InMemoryBulletinBoard> {
        let ctx = Arc::new(ctx);
        let mut rng = StdRng::seed_from_u64(seed + ctx.party() as u64);
        let keys = exchange_plain_keys::<G1Projective, _, _>(&ctx, board, &mut rng)
            .await
            .unwrap();
        CoinFlipChallenger::new(ctx, board.clone(), keys, rng)
    }

    #[tokio::test]
    async fn all_parties_agree_on_the_coin() {
        let board = InMemoryBulletinBoard::new();
        let handles: Vec<_> = contexts("coin", 3, 2)
            .into_iter()
            .map(|ctx| {
                let board = board.clone();
                tokio::spawn(async move {
                    let challenger = setup(ctx, &board, 100).await;
                    let tag = challenger.ctx.tag("coin-test");
                    challenger
                        .challenge(&tag, &ByteTree::empty(), 100, 40)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut coins = Vec::new();
        for handle in handles {
            coins.push(handle.await.unwrap());
        }
        assert_eq!(coins[0].len(), 13);
        assert_eq!(coins[0][0] & 0xF0, 0);
        assert!(coins.iter().all(|c| *c == coins[0]));
    }

    #[tokio::test]
    async fn recovers_a_rejected_opening() {
        let board = InMemoryBulletinBoard::new();
        let handles: Vec<_> = contexts("coin-recover", 3, 2)
            .into_iter()
            .map(|ctx| {
                let board = board.clone();
                tokio::spawn(async move {
                    let challenger = setup(ctx, &board, 7).await;
                    let ctx = challenger.ctx.clone();
                    let tag = ctx.tag("coin-test");
                    if ctx.party() != 2 {
                        let coin = challenger
                            .challenge(&tag, &ByteTree::empty(), 64, 40)
                            .await
                            .unwrap();
                        return Some(coin);
                    }

                    // Dealer 2 deals honestly but publishes a garbage opening.
                    let (_, deal) = challenger.deal(40);
                    board
                        .publish(2, &tag.child("coin_deal"), deal.to_byte_tree())
                        .await
                        .unwrap();
                    board
                        .publish(2, &tag.child("coin_open"), ByteTree::leaf(vec![0xAB]))
                        .await
                        .unwrap();
                    let mut dealt = Vec::new();
                    for l in ctx.dealers() {
                        let tree = board.wait_for(l, &tag.child("coin_deal")).await.unwrap();
                        let deal = Deal::<G1Projective>::parse(&tree, 2, 3).unwrap();
                        let share = deal.shares[1]
                            .decrypt(&challenger.keys.own().private_key, ctx.parameters().hash);
                        dealt.push((deal.commitment, share));
                    }
                    let recovered = challenger
                        .recover(&tag.child("coin_recover"), &[2], &dealt)
                        .await
                        .unwrap();
                    assert_eq!(recovered.len(), 1);
                    None
                })
            })
            .collect();

        let mut coins = Vec::new();
        for handle in handles {
            if let Some(coin) = handle.await.unwrap() {
                coins.push(coin);
            }
        }
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0], coins[1]);
        assert_eq!(coins[0].len(), 8);
    }
}
