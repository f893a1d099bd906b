//! Threshold decryption of the mixed list with proofs of correct decryption factors.

use ark_ec::CurveGroup;
use rand::RngCore;

use crate::bulletin_board::{BulletinBoard, PartyIndex};
use crate::byte_tree::{elements_from_node, elements_node, ByteTree};
use crate::challenger::Challenger;
use crate::elgamal::ElGamalCiphertext;
use crate::error::ProtocolError;
use crate::proofs::{DecryptionFactorsProver, DecryptionFactorsVerifier};
use crate::protocol::context::ProtocolContext;
use crate::protocol::dkg::DkgOutput;
use crate::protocol::export::ProofExport;
use crate::protocol::sigma;
use crate::vss::lagrange_coefficients_at_zero;

const LOG_TARGET: &str = "verimix::protocol::decryption";

/// Every party publishes `c1_i * x_j` and proves it in turn. The factors of the
/// first `threshold` parties whose proofs are accepted are interpolated in the
/// exponent and stripped from the ciphertexts.
///
/// `round` names the board tags and the export directory; it must be fresh for
/// every call within a session.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = ctx.party(), round = %round, n = ciphertexts.len()))]
pub async fn threshold_decrypt<G, B, R>(
    ctx: &ProtocolContext,
    board: &B,
    challenger: &dyn Challenger,
    round: &str,
    dkg: &DkgOutput<G>,
    ciphertexts: &[ElGamalCiphertext<G>],
    export: &ProofExport,
    rng: &mut R,
) -> Result<Vec<G>, ProtocolError>
where
    G: CurveGroup,
    B: BulletinBoard + ?Sized,
    R: RngCore + Send + ?Sized,
{
    let own = ctx.party();
    let n = ciphertexts.len();
    let tag = ctx.tag(round);
    let factors_tag = tag.child("factors");
    let c1: Vec<G> = ciphertexts.iter().map(|ct| ct.c1).collect();

    let own_factors: Vec<G> = c1.iter().map(|c| *c * dkg.secret_share()).collect();
    board
        .publish(own, &factors_tag, elements_node(&own_factors))
        .await?;

    let mut accepted: Vec<(PartyIndex, Vec<G>)> = Vec::new();
    let mut exports = Vec::new();
    for l in ctx.all_parties() {
        let proof_tag = tag.child(l);
        if l == own {
            let prover = DecryptionFactorsProver::new(
                ctx.parameters().clone(),
                dkg.secret_share(),
                c1.clone(),
                own_factors.clone(),
            );
            let transcript = sigma::prove(ctx, board, challenger, &proof_tag, prover, rng).await?;
            exports.push(export.spawn_write(
                round,
                l,
                ByteTree::node(vec![elements_node(&own_factors), transcript.to_byte_tree()]),
            ));
            accepted.push((l, own_factors.clone()));
            continue;
        }

        let tree = board.wait_for(l, &factors_tag).await?;
        let (factors, well_formed) = match elements_from_node::<G>(&tree, Some(n)) {
            Ok(factors) => (factors, true),
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, party = l, %err, "Malformed decryption factors");
                (vec![G::zero(); n], false)
            }
        };
        let verifier = DecryptionFactorsVerifier::new(
            ctx.parameters().clone(),
            dkg.party_public_key(l),
            c1.clone(),
            factors.clone(),
        );
        let (valid, transcript) =
            sigma::verify(ctx, board, challenger, &proof_tag, l, verifier).await?;
        exports.push(export.spawn_write(
            round,
            l,
            ByteTree::node(vec![tree, transcript.to_byte_tree()]),
        ));
        if valid && well_formed {
            accepted.push((l, factors));
        } else {
            tracing::error!(target: LOG_TARGET, party = l, "Decryption factor proof rejected");
        }
    }

    for handle in exports {
        handle.join().await?;
    }

    let threshold = ctx.threshold() as usize;
    if accepted.len() < threshold {
        return Err(ProtocolError::InsufficientDecryptionFactors {
            accepted: accepted.len(),
            threshold,
        });
    }
    accepted.truncate(threshold);

    let indices: Vec<PartyIndex> = accepted.iter().map(|(l, _)| *l).collect();
    let lambdas = lagrange_coefficients_at_zero::<G::ScalarField>(&indices)?;
    let plaintexts = ciphertexts
        .iter()
        .enumerate()
        .map(|(i, ct)| {
            let combined: G = accepted
                .iter()
                .zip(&lambdas)
                .map(|((_, factors), lambda)| factors[i] * lambda)
                .sum();
            ct.remove_factor(combined)
        })
        .collect();
    tracing::info!(target: LOG_TARGET, combined = ?indices, "Decrypted mixed list");
    Ok(plaintexts)
}
