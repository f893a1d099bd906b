//! Independent generators: group elements with no known discrete-log relation
//! to `g` or to each other, used as the bases of permutation commitments.

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_serialize::CanonicalSerialize;
use async_trait::async_trait;
use rand::RngCore;

use crate::arithm::{add_arrays, random_scalars};
use crate::bulletin_board::BulletinBoard;
use crate::byte_tree::{
    element_from_leaf, element_leaf, elements_from_node, elements_node, parse_or_default,
    ByteTree, ByteTreeError, FromByteTree, ToByteTree,
};
use crate::challenger::{challenge_scalar, Challenger};
use crate::config::HashFunction;
use crate::crypto::Prg;
use crate::error::ProtocolError;
use crate::proofs::{verify_exponents, verify_exponents_combined, ExponentsProver};
use crate::protocol::context::ProtocolContext;
use crate::shuffle::batch_vector;

const LOG_TARGET: &str = "verimix::protocol::generators";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndependentGenerators<G: CurveGroup>(Vec<G>);

impl<G: CurveGroup> IndependentGenerators<G> {
    pub fn new(generators: Vec<G>) -> Self {
        Self(generators)
    }

    pub fn as_slice(&self) -> &[G] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<G> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<G: CurveGroup> ToByteTree for IndependentGenerators<G> {
    fn to_byte_tree(&self) -> ByteTree {
        elements_node(&self.0)
    }
}

impl<G: CurveGroup> FromByteTree for IndependentGenerators<G> {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        Ok(Self(elements_from_node(tree, None)?))
    }
}

#[async_trait]
pub trait IndependentGeneratorsSource<G: CurveGroup>: Send {
    async fn generate(&mut self, n: usize) -> Result<IndependentGenerators<G>, ProtocolError>;
}

/// Non-interactive derivation by expanding a hash of the session into curve points.
#[derive(Clone, Debug)]
pub struct RandomOracleGenerators {
    hash: HashFunction,
    seed: Vec<u8>,
}

impl RandomOracleGenerators {
    pub fn new(hash: HashFunction, prefix: &[u8], sid: &str) -> Self {
        Self {
            hash,
            seed: hash.digest_parts(&[prefix, sid.as_bytes()]),
        }
    }

    pub fn from_context(ctx: &ProtocolContext) -> Self {
        Self::new(ctx.parameters().hash, ctx.random_oracle_prefix(), ctx.sid())
    }

    /// Try-and-increment: candidate x-coordinates are drawn from the PRG until
    /// one lies on the curve; the cofactor is cleared and the identity skipped.
    pub fn derive<G: CurveGroup>(&self, n: usize) -> Vec<G> {
        let mut prg = Prg::new(self.hash, &self.seed);
        let len = G::Affine::generator().compressed_size();
        let mut generators = Vec::with_capacity(n);
        let mut attempts = 0usize;
        while generators.len() < n {
            attempts += 1;
            let Some(point) = G::Affine::from_random_bytes(&prg.next_bytes(len)) else {
                continue;
            };
            let point = point.clear_cofactor();
            if !point.is_zero() {
                generators.push(point.into_group());
            }
        }
        tracing::trace!(target: LOG_TARGET, n, attempts, "Derived generators from the random oracle");
        generators
    }
}

#[async_trait]
impl<G: CurveGroup> IndependentGeneratorsSource<G> for RandomOracleGenerators {
    async fn generate(&mut self, n: usize) -> Result<IndependentGenerators<G>, ProtocolError> {
        Ok(IndependentGenerators(self.derive(n)))
    }
}

/// Interactive derivation: every dealer contributes random parts `g*x` and proves
/// knowledge of the exponents.
pub struct VssGenerators<'a, B: ?Sized, R: ?Sized> {
    ctx: &'a ProtocolContext,
    board: &'a B,
    challenger: &'a dyn Challenger,
    rng: &'a mut R,
}

impl<'a, B: ?Sized, R: ?Sized> VssGenerators<'a, B, R> {
    pub fn new(
        ctx: &'a ProtocolContext,
        board: &'a B,
        challenger: &'a dyn Challenger,
        rng: &'a mut R,
    ) -> Self {
        Self {
            ctx,
            board,
            challenger,
            rng,
        }
    }
}

#[async_trait]
impl<'a, G, B, R> IndependentGeneratorsSource<G> for VssGenerators<'a, B, R>
where
    G: CurveGroup,
    B: BulletinBoard + ?Sized,
    R: RngCore + Send + ?Sized,
{
    async fn generate(&mut self, n: usize) -> Result<IndependentGenerators<G>, ProtocolError> {
        derive_generators_vss(self.ctx, self.board, self.challenger, n, &mut *self.rng).await
    }
}

/// All dealers' proofs share one batching seed and one challenge, so the
/// common all-honest case costs a single combined check. Only when that fails
/// is every proof checked on its own; parts with a rejected proof are replaced
/// by the identity before the parts are summed.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = ctx.party(), n))]
pub async fn derive_generators_vss<G, B, R>(
    ctx: &ProtocolContext,
    board: &B,
    challenger: &dyn Challenger,
    n: usize,
    rng: &mut R,
) -> Result<IndependentGenerators<G>, ProtocolError>
where
    G: CurveGroup,
    B: BulletinBoard + ?Sized,
    R: RngCore + Send + ?Sized,
{
    let params = ctx.parameters();
    let own = ctx.party();
    let tag = ctx.tag(&format!("generators-{n}"));

    let exponents = if ctx.is_dealer() {
        let x: Vec<G::ScalarField> = random_scalars(n, rng, params.rbitlen);
        let g = G::generator();
        let own_parts: Vec<G> = x.iter().map(|xi| g * xi).collect();
        board
            .publish(own, &tag.child("parts"), elements_node(&own_parts))
            .await?;
        Some(x)
    } else {
        None
    };

    let mut parts = Vec::with_capacity(ctx.threshold() as usize);
    let mut well_formed = Vec::with_capacity(ctx.threshold() as usize);
    for l in ctx.dealers() {
        let tree = board.wait_for(l, &tag.child("parts")).await?;
        match elements_from_node::<G>(&tree, Some(n)) {
            Ok(p) => {
                parts.push(p);
                well_formed.push(true);
            }
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, party = l, %err, "Malformed generator parts");
                parts.push(vec![G::zero(); n]);
                well_formed.push(false);
            }
        }
    }

    let instance = ByteTree::node(parts.iter().map(|p| elements_node(p)).collect());
    let seed = challenger
        .challenge(&tag.child("batch"), &instance, params.seed_bits, params.rbitlen)
        .await?;
    let e = batch_vector::<G::ScalarField>(params.hash, &seed, n, params.ebitlen);

    let prover = match exponents {
        Some(x) => {
            let (prover, commitment) = ExponentsProver::<G>::commit(x, rng, params.rbitlen);
            board
                .publish(own, &tag.child("commitment"), element_leaf(&commitment))
                .await?;
            Some(prover)
        }
        None => None,
    };

    let mut commitments = Vec::with_capacity(parts.len());
    for l in ctx.dealers() {
        let tree = board.wait_for(l, &tag.child("commitment")).await?;
        commitments.push(parse_or_default(
            element_from_leaf::<G>(&tree),
            G::zero,
            "generator proof commitment",
        ));
    }

    let transcript = ByteTree::node(vec![instance, elements_node(&commitments)]);
    let v: G::ScalarField = challenge_scalar(
        challenger,
        &tag.child("challenge"),
        &transcript,
        params.vbitlen,
        params.rbitlen,
    )
    .await?;

    if let Some(prover) = prover {
        board
            .publish(own, &tag.child("reply"), element_leaf(&prover.reply(&e, v)))
            .await?;
    }

    let mut replies = Vec::with_capacity(parts.len());
    for l in ctx.dealers() {
        let tree = board.wait_for(l, &tag.child("reply")).await?;
        replies.push(parse_or_default(
            element_from_leaf::<G::ScalarField>(&tree),
            G::ScalarField::zero,
            "generator proof reply",
        ));
    }

    let all_valid = well_formed.iter().all(|ok| *ok)
        && verify_exponents_combined(&parts, &e, &commitments, v, &replies);
    if !all_valid {
        tracing::warn!(target: LOG_TARGET, "Combined generator proof rejected, checking parties individually");
        for (pos, l) in ctx.dealers().enumerate() {
            let accepted = well_formed[pos]
                && verify_exponents(&parts[pos], &e, &commitments[pos], v, &replies[pos]);
            if !accepted {
                tracing::warn!(target: LOG_TARGET, party = l, "Generator parts rejected, substituting identity");
                parts[pos] = vec![G::zero(); n];
            }
        }
    }

    let generators = parts
        .iter()
        .fold(vec![G::zero(); n], |acc, p| add_arrays(&acc, p));
    tracing::debug!(target: LOG_TARGET, "Independent generators derived");
    Ok(IndependentGenerators(generators))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin_board::InMemoryBulletinBoard;
    use crate::challenger::RandomOracleChallenger;
    use crate::test_utils::contexts;
    use ark_bn254::{Fr, G1Affine, G1Projective};
    use ark_ec::PrimeGroup;
    use ark_grumpkin::Projective as GrumpkinProjective;
    use rand::{rngs::StdRng, SeedableRng};

    type G = G1Projective;

    #[test]
    fn random_oracle_generators_are_deterministic_per_session() {
        let a = RandomOracleGenerators::new(HashFunction::Sha256, b"prefix", "sid-1");
        let b = RandomOracleGenerators::new(HashFunction::Sha256, b"prefix", "sid-1");
        let c = RandomOracleGenerators::new(HashFunction::Sha256, b"prefix", "sid-2");

        let ha: Vec<G> = a.derive(8);
        assert_eq!(ha, b.derive::<G>(8));
        assert_ne!(ha, c.derive::<G>(8));
        assert_eq!(ha[..3], a.derive::<G>(3)[..]);

        for h in &ha {
            let affine: G1Affine = h.into_affine();
            assert!(!affine.is_zero());
            assert!(affine.is_on_curve());
            assert!(affine.is_in_correct_subgroup_assuming_on_curve());
        }
    }

    #[test]
    fn random_oracle_generators_on_grumpkin() {
        let source = RandomOracleGenerators::new(HashFunction::Sha3_256, b"prefix", "sid");
        let h: Vec<GrumpkinProjective> = source.derive(4);
        assert_eq!(h.len(), 4);
        assert_ne!(h[0], h[1]);
    }

    #[test]
    fn persisted_form_is_stable() {
        let h = IndependentGenerators::new(
            RandomOracleGenerators::new(HashFunction::Sha256, b"p", "s").derive::<G>(5),
        );
        let restored = IndependentGenerators::<G>::from_byte_tree(&h.to_byte_tree()).unwrap();
        assert_eq!(restored, h);
    }

    async fn run_party(
        ctx: ProtocolContext,
        board: InMemoryBulletinBoard,
        n: usize,
    ) -> IndependentGenerators<G> {
        let challenger = RandomOracleChallenger::from_context(&ctx);
        let mut rng = StdRng::seed_from_u64(40 + ctx.party() as u64);
        let mut source = VssGenerators::new(&ctx, &board, &challenger, &mut rng);
        IndependentGeneratorsSource::<G>::generate(&mut source, n)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn vss_parties_agree_on_generators() {
        let board = InMemoryBulletinBoard::new();
        let handles: Vec<_> = contexts("gens", 3, 2)
            .into_iter()
            .map(|ctx| tokio::spawn(run_party(ctx, board.clone(), 6)))
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results[0].len(), 6);
        assert!(results.iter().all(|h| *h == results[0]));
        assert!(results[0].as_slice().iter().all(|h| !h.is_zero()));
    }

    #[tokio::test]
    async fn invalid_proof_excludes_the_parts() {
        let n = 4;
        let board = InMemoryBulletinBoard::new();
        let ctxs = contexts("gens-cheat", 3, 2);

        // Party 2 publishes parts but cannot answer the challenge.
        let tag = ctxs[1].tag("generators-4");
        let mut rng = StdRng::seed_from_u64(5);
        let bogus: Vec<G> = random_scalars::<Fr, _>(n, &mut rng, 64)
            .into_iter()
            .map(|x| G::generator() * x)
            .collect();
        board.publish(2, &tag.child("parts"), elements_node(&bogus)).await.unwrap();
        board
            .publish(2, &tag.child("commitment"), element_leaf(&G::generator()))
            .await
            .unwrap();
        board
            .publish(2, &tag.child("reply"), element_leaf(&Fr::from(3u64)))
            .await
            .unwrap();

        let first = tokio::spawn(run_party(ctxs[0].clone(), board.clone(), n));
        let third = tokio::spawn(run_party(ctxs[2].clone(), board.clone(), n));
        let first = first.await.unwrap();
        let third = third.await.unwrap();
        assert_eq!(first, third);

        let honest_parts: Vec<G> =
            elements_from_node(&board.wait_for(1, &tag.child("parts")).await.unwrap(), Some(n))
                .unwrap();
        assert_eq!(first.as_slice(), honest_parts.as_slice());
    }
}
