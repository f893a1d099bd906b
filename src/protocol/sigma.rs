//! Generic driver running a batched sigma protocol over the bulletin board.
//!
//! Message flow for a proof tagged `T` by party `l`:
//! 1. everyone derives the batching seed from the instance (`T/batch`);
//! 2. `l` publishes its commitment under `T/commitment`;
//! 3. everyone derives the challenge from instance and commitment (`T/challenge`);
//! 4. `l` publishes its reply under `T/reply`.

use ark_ec::CurveGroup;
use rand::RngCore;

use crate::bulletin_board::{BulletinBoard, PartyIndex, Tag};
use crate::byte_tree::ByteTree;
use crate::challenger::{challenge_scalar, Challenger};
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;

const LOG_TARGET: &str = "verimix::protocol::sigma";

pub trait Prover<G: CurveGroup>: Sized + Send {
    type Committed: Reply<G>;

    /// Encoding of the public statement.
    fn instance_tree(&self) -> ByteTree;

    fn commit<R: RngCore + ?Sized>(self, batch_seed: &[u8], rng: &mut R) -> (Self::Committed, ByteTree);
}

pub trait Reply<G: CurveGroup>: Send {
    fn reply(self, challenge: G::ScalarField) -> ByteTree;
}

pub trait Verifier<G: CurveGroup>: Sized + Send {
    fn instance_tree(&self) -> ByteTree;

    /// Malformed commitments or replies make this return `false`, never an error.
    fn verify(
        self,
        batch_seed: &[u8],
        commitment: &ByteTree,
        challenge: G::ScalarField,
        reply: &ByteTree,
    ) -> bool;
}

/// Prover messages of one proof, as exported for offline verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigmaTranscript {
    pub commitment: ByteTree,
    pub reply: ByteTree,
}

impl SigmaTranscript {
    pub fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(vec![self.commitment.clone(), self.reply.clone()])
    }
}

async fn batch_seed(
    ctx: &ProtocolContext,
    challenger: &dyn Challenger,
    tag: &Tag,
    instance: &ByteTree,
) -> Result<Vec<u8>, ProtocolError> {
    let params = ctx.parameters();
    challenger
        .challenge(&tag.child("batch"), instance, params.seed_bits, params.rbitlen)
        .await
}

async fn challenge<G: CurveGroup>(
    ctx: &ProtocolContext,
    challenger: &dyn Challenger,
    tag: &Tag,
    instance: &ByteTree,
    commitment: &ByteTree,
) -> Result<G::ScalarField, ProtocolError> {
    let params = ctx.parameters();
    let transcript = ByteTree::node(vec![instance.clone(), commitment.clone()]);
    challenge_scalar(
        challenger,
        &tag.child("challenge"),
        &transcript,
        params.vbitlen,
        params.rbitlen,
    )
    .await
}

#[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = ctx.party(), %tag))]
pub async fn prove<G, P, B, R>(
    ctx: &ProtocolContext,
    board: &B,
    challenger: &dyn Challenger,
    tag: &Tag,
    prover: P,
    rng: &mut R,
) -> Result<SigmaTranscript, ProtocolError>
where
    G: CurveGroup,
    P: Prover<G>,
    B: BulletinBoard + ?Sized,
    R: RngCore + Send + ?Sized,
{
    let instance = prover.instance_tree();
    let seed = batch_seed(ctx, challenger, tag, &instance).await?;
    let (committed, commitment) = prover.commit(&seed, rng);
    board
        .publish(ctx.party(), &tag.child("commitment"), commitment.clone())
        .await?;

    let v = challenge::<G>(ctx, challenger, tag, &instance, &commitment).await?;
    let reply = committed.reply(v);
    board
        .publish(ctx.party(), &tag.child("reply"), reply.clone())
        .await?;
    tracing::debug!(target: LOG_TARGET, "Proof published");
    Ok(SigmaTranscript { commitment, reply })
}

/// Verify the proof party `prover` publishes under `tag`.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = ctx.party(), prover = prover, %tag))]
pub async fn verify<G, V, B>(
    ctx: &ProtocolContext,
    board: &B,
    challenger: &dyn Challenger,
    tag: &Tag,
    prover: PartyIndex,
    verifier: V,
) -> Result<(bool, SigmaTranscript), ProtocolError>
where
    G: CurveGroup,
    V: Verifier<G>,
    B: BulletinBoard + ?Sized,
{
    let instance = verifier.instance_tree();
    let seed = batch_seed(ctx, challenger, tag, &instance).await?;
    let commitment = board.wait_for(prover, &tag.child("commitment")).await?;
    let v = challenge::<G>(ctx, challenger, tag, &instance, &commitment).await?;
    let reply = board.wait_for(prover, &tag.child("reply")).await?;

    let accepted = verifier.verify(&seed, &commitment, v, &reply);
    tracing::debug!(target: LOG_TARGET, accepted, "Proof checked");
    Ok((accepted, SigmaTranscript { commitment, reply }))
}
