//! Joint Feldman key generation with complaint resolution.
//!
//! The first `threshold` parties deal a random polynomial each. Receivers
//! complain about shares that do not match the dealer's commitments, accused
//! dealers reveal the disputed shares in public, and every dealer that fails
//! to answer a complaint correctly is disqualified. All honest parties see the
//! same board, so they agree on the qualified set and the joint key.

use std::collections::{BTreeMap, BTreeSet};

use ark_ec::CurveGroup;
use ark_ff::PrimeField;
use rand::RngCore;
use zeroize::Zeroize;

use crate::bulletin_board::{BulletinBoard, PartyIndex};
use crate::byte_tree::{
    element_from_leaf, element_leaf, parse_or_default, ByteTree, ByteTreeError, FromByteTree,
    ToByteTree,
};
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;
use crate::protocol::plain_keys::PlainKeys;
use crate::vss::{Deal, Polynomial, PolynomialInExponent};

const LOG_TARGET: &str = "verimix::protocol::dkg";

/// This party's view of the distributed key.
#[derive(Clone, Debug)]
pub struct DkgOutput<G: CurveGroup> {
    commitment: PolynomialInExponent<G>,
    party_public_keys: Vec<G>,
    secret_share: G::ScalarField,
    qualified_dealers: Vec<PartyIndex>,
}

impl<G: CurveGroup> DkgOutput<G> {
    pub fn new(
        commitment: PolynomialInExponent<G>,
        secret_share: G::ScalarField,
        qualified_dealers: Vec<PartyIndex>,
        parties: u32,
    ) -> Self {
        let party_public_keys = (1..=parties).map(|i| commitment.evaluate(i)).collect();
        Self {
            commitment,
            party_public_keys,
            secret_share,
            qualified_dealers,
        }
    }

    /// Key under which the mix-net input is encrypted.
    pub fn joint_public_key(&self) -> G {
        self.commitment.constant()
    }

    /// `g*x_i`, used to check party `i`'s decryption factors.
    pub fn party_public_key(&self, party: PartyIndex) -> G {
        self.party_public_keys[party as usize - 1]
    }

    pub fn party_public_keys(&self) -> &[G] {
        &self.party_public_keys
    }

    pub fn secret_share(&self) -> G::ScalarField {
        self.secret_share
    }

    pub fn qualified_dealers(&self) -> &[PartyIndex] {
        &self.qualified_dealers
    }

    pub fn commitment(&self) -> &PolynomialInExponent<G> {
        &self.commitment
    }
}

impl<G: CurveGroup> Drop for DkgOutput<G> {
    fn drop(&mut self) {
        self.secret_share.zeroize();
    }
}

impl<G: CurveGroup> ToByteTree for DkgOutput<G> {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![
            self.commitment.to_byte_tree(),
            element_leaf(&self.secret_share),
            ByteTree::node(self.qualified_dealers.iter().copied().map(ByteTree::from_u32).collect()),
            ByteTree::from_u32(self.party_public_keys.len() as u32),
        ])
    }
}

impl<G: CurveGroup> FromByteTree for DkgOutput<G> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        let children = tree.children_exact(4)?;
        Ok(Self::new(
            PolynomialInExponent::from_byte_tree(&children[0])?,
            element_from_leaf(&children[1])?,
            parse_indices(&children[2])?,
            children[3].as_u32()?,
        ))
    }
}

fn parse_indices(tree: &ByteTree) -> Result<Vec<PartyIndex>, ByteTreeError> {
    tree.children()?.iter().map(ByteTree::as_u32).collect()
}

fn parse_reveal<F: PrimeField>(tree: &ByteTree) -> Result<Vec<(PartyIndex, F)>, ByteTreeError> {
    tree.children()?
        .iter()
        .map(|entry| {
            let pair = entry.children_exact(2)?;
            Ok((pair[0].as_u32()?, element_from_leaf(&pair[1])?))
        })
        .collect()
}

#[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = ctx.party()))]
pub async fn run_dkg<G, B, R>(
    ctx: &ProtocolContext,
    board: &B,
    keys: &PlainKeys<G>,
    rng: &mut R,
) -> Result<DkgOutput<G>, ProtocolError>
where
    G: CurveGroup,
    B: BulletinBoard + ?Sized,
    R: RngCore + ?Sized,
{
    let threshold = ctx.threshold() as usize;
    let parties = ctx.parties() as usize;
    let params = ctx.parameters();
    let own = ctx.party();
    let tag = ctx.tag("dkg");
    let deal_tag = tag.child("deal");
    let complaints_tag = tag.child("complaints");
    let reveal_tag = tag.child("reveal");

    let polynomial = if ctx.is_dealer() {
        let poly = Polynomial::<G::ScalarField>::random(threshold, rng, params.rbitlen);
        let deal = Deal::new(&poly, keys.public_keys(), params.hash, rng, params.rbitlen);
        board.publish(own, &deal_tag, deal.to_byte_tree()).await?;
        Some(poly)
    } else {
        None
    };

    let mut commitments = Vec::with_capacity(threshold);
    let mut shares: Vec<Option<G::ScalarField>> = Vec::with_capacity(threshold);
    let mut disqualified = BTreeSet::new();
    let mut complaints = Vec::new();
    for l in ctx.dealers() {
        let tree = board.wait_for(l, &deal_tag).await?;
        match Deal::<G>::parse(&tree, threshold, parties) {
            Ok(deal) => {
                let share =
                    deal.shares[own as usize - 1].decrypt(&keys.own().private_key, params.hash);
                if deal.commitment.verify_share(own, &share) {
                    shares.push(Some(share));
                } else {
                    tracing::warn!(target: LOG_TARGET, dealer = l, "Share does not match commitment, complaining");
                    complaints.push(l);
                    shares.push(None);
                }
                commitments.push(deal.commitment);
            }
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, dealer = l, %err, "Malformed deal, disqualifying dealer");
                disqualified.insert(l);
                commitments.push(PolynomialInExponent::trivial(threshold));
                shares.push(None);
            }
        }
    }

    board
        .publish(
            own,
            &complaints_tag,
            ByteTree::node(complaints.iter().copied().map(ByteTree::from_u32).collect()),
        )
        .await?;

    let mut accusations: BTreeMap<PartyIndex, BTreeSet<PartyIndex>> = BTreeMap::new();
    for i in ctx.all_parties() {
        let tree = board.wait_for(i, &complaints_tag).await?;
        for l in parse_or_default(parse_indices(&tree), Vec::new, "dkg complaints") {
            if ctx.dealers().contains(&l) {
                accusations.entry(l).or_default().insert(i);
            }
        }
    }

    // Dealers always answer, possibly with an empty list.
    if let Some(poly) = polynomial {
        let answers = accusations
            .get(&own)
            .map(|accusers| {
                accusers
                    .iter()
                    .map(|i| {
                        ByteTree::node(vec![ByteTree::from_u32(*i), element_leaf(&poly.evaluate(*i))])
                    })
                    .collect()
            })
            .unwrap_or_default();
        board.publish(own, &reveal_tag, ByteTree::node(answers)).await?;
    }

    for (l, accusers) in &accusations {
        if disqualified.contains(l) {
            continue;
        }
        let tree = board.wait_for(*l, &reveal_tag).await?;
        let revealed = parse_or_default(
            parse_reveal::<G::ScalarField>(&tree),
            Vec::new,
            "dkg reveal",
        );
        let commitment = &commitments[*l as usize - 1];
        for i in accusers {
            match revealed.iter().find(|(index, _)| index == i) {
                Some((_, share)) if commitment.verify_share(*i, share) => {
                    if *i == own {
                        shares[*l as usize - 1] = Some(*share);
                    }
                }
                _ => {
                    tracing::warn!(target: LOG_TARGET, dealer = l, accuser = i, "Complaint upheld, disqualifying dealer");
                    disqualified.insert(*l);
                    break;
                }
            }
        }
    }

    let qualified: Vec<PartyIndex> = ctx.dealers().filter(|l| !disqualified.contains(l)).collect();
    if qualified.is_empty() {
        return Err(ProtocolError::NoQualifiedDealers);
    }

    // A qualified dealer's share was verified either directly or through its reveal.
    let secret_share: G::ScalarField = qualified
        .iter()
        .filter_map(|l| shares[*l as usize - 1])
        .sum();
    let combined = PolynomialInExponent::combine(
        threshold,
        qualified.iter().map(|l| &commitments[*l as usize - 1]),
    );
    shares.zeroize();

    let output = DkgOutput::new(combined, secret_share, qualified, ctx.parties());
    debug_assert_eq!(G::generator() * output.secret_share(), output.party_public_key(own));
    tracing::info!(
        target: LOG_TARGET,
        qualified = ?output.qualified_dealers(),
        "Joint key established"
    );
    Ok(output)
}
