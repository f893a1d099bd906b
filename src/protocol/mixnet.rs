//! Per-party driver wiring key setup, generator derivation, verifiable mixing
//! and threshold decryption together.

use std::sync::Arc;

use ark_ec::CurveGroup;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::arithm::{random_scalars, Permutation};
use crate::bulletin_board::BulletinBoard;
use crate::byte_tree::{elements_from_node, elements_node, ByteTree, ByteTreeError};
use crate::challenger::{Challenger, CoinFlipChallenger, RandomOracleChallenger};
use crate::config::{ChallengeMode, GeneratorStrategy};
use crate::elgamal::{ciphertexts_from_tree, ciphertexts_to_tree, shuffle_ciphertexts, ElGamalCiphertext};
use crate::error::ProtocolError;
use crate::protocol::context::ProtocolContext;
use crate::protocol::decryption::threshold_decrypt;
use crate::protocol::dkg::{run_dkg, DkgOutput};
use crate::protocol::export::ProofExport;
use crate::protocol::generators::{
    IndependentGenerators, IndependentGeneratorsSource, RandomOracleGenerators, VssGenerators,
};
use crate::protocol::plain_keys::{exchange_plain_keys, PlainKeys};
use crate::protocol::session::{Persisted, SessionStore};
use crate::protocol::sigma;
use crate::shuffle::{commit_permutation, ShuffleError, ShuffleProver, ShuffleVerifier};

const LOG_TARGET: &str = "verimix::protocol::mixnet";

type Ciphertexts<G> = Vec<ElGamalCiphertext<G>>;

/// One party of a mix-net session.
///
/// Steps must run in order: [`plain_keys`](Self::plain_keys), [`dkg`](Self::dkg),
/// then any number of [`shuffle`](Self::shuffle) and [`decrypt`](Self::decrypt)
/// calls. Completed setup steps and the round counters are persisted, so a
/// restarted party resumes without reusing the tags of earlier rounds.
pub struct MixServer<G: CurveGroup, B: BulletinBoard + Clone + 'static> {
    ctx: Arc<ProtocolContext>,
    board: B,
    session: SessionStore,
    export: ProofExport,
    challenger: Arc<dyn Challenger>,
    rng: StdRng,
    plain_keys: Option<PlainKeys<G>>,
    dkg: Option<DkgOutput<G>>,
}

impl<G: CurveGroup, B: BulletinBoard + Clone + 'static> MixServer<G, B> {
    pub fn new(ctx: ProtocolContext, board: B, rng: StdRng) -> Result<Self, ProtocolError> {
        ctx.parameters().validate_for::<G::ScalarField>()?;
        let export = if ctx.parameters().export_proofs {
            ProofExport::to_dir(ctx.session_dir().join(format!("proofs-p{}", ctx.party())))
        } else {
            ProofExport::disabled()
        };
        let challenger = Arc::new(RandomOracleChallenger::from_context(&ctx));
        Ok(Self {
            session: SessionStore::new(&ctx),
            ctx: Arc::new(ctx),
            board,
            export,
            challenger,
            rng,
            plain_keys: None,
            dkg: None,
        })
    }

    pub fn context(&self) -> &ProtocolContext {
        &self.ctx
    }

    /// Joint public key, once the DKG has run.
    pub fn public_key(&self) -> Option<G> {
        self.dkg.as_ref().map(DkgOutput::joint_public_key)
    }

    pub fn dkg_output(&self) -> Option<&DkgOutput<G>> {
        self.dkg.as_ref()
    }

    /// Claim the next round of `kind` and record it before anything is published.
    async fn next_round(&self, kind: &str) -> Result<String, ProtocolError> {
        let name = format!("{kind}_rounds");
        let completed = match self.session.load::<ByteTree>(&name).await? {
            Some(tree) => tree.as_u32()?,
            None => 0,
        };
        let round = completed + 1;
        self.session.store(&name, &ByteTree::from_u32(round)).await?;
        tracing::debug!(target: LOG_TARGET, kind, round, "Starting round");
        Ok(format!("{kind}-{round}"))
    }

    fn fork_rng(&mut self) -> StdRng {
        let mut seed = [0u8; 32];
        self.rng.fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }

    /// Exchange plain keys and, in coin-flip mode, switch challenges over to
    /// joint coin flipping, which encrypts its shares under those keys.
    pub async fn plain_keys(&mut self) -> Result<Persisted<PlainKeys<G>>, ProtocolError> {
        let ctx = self.ctx.clone();
        let board = &self.board;
        let rng = &mut self.rng;
        let keys = self
            .session
            .load_or_compute("plain_keys", || async move {
                exchange_plain_keys::<G, _, _>(&ctx, board, rng).await
            })
            .await?;

        if self.ctx.parameters().challenges == ChallengeMode::CoinFlip {
            let coin_rng = self.fork_rng();
            self.challenger = Arc::new(CoinFlipChallenger::new(
                self.ctx.clone(),
                self.board.clone(),
                keys.value().clone(),
                coin_rng,
            ));
        }
        self.plain_keys = Some(keys.value().clone());
        Ok(keys)
    }

    pub async fn dkg(&mut self) -> Result<Persisted<DkgOutput<G>>, ProtocolError> {
        let keys = self.plain_keys.as_ref().ok_or(ProtocolError::MissingPrerequisite {
            step: "dkg",
            required: "plain_keys",
        })?;
        let ctx = self.ctx.clone();
        let board = &self.board;
        let rng = &mut self.rng;
        let output = self
            .session
            .load_or_compute("dkg", || async move { run_dkg(&ctx, board, keys, rng).await })
            .await?;
        self.dkg = Some(output.value().clone());
        Ok(output)
    }

    /// Independent generators for lists of `n` ciphertexts, using the configured strategy.
    pub async fn generators(
        &mut self,
        n: usize,
    ) -> Result<Persisted<IndependentGenerators<G>>, ProtocolError> {
        let strategy = self.ctx.parameters().generators;
        let ctx = self.ctx.clone();
        let board = &self.board;
        let challenger = self.challenger.clone();
        let rng = &mut self.rng;
        self.session
            .load_or_compute(&format!("generators-{n}"), || async move {
                let mut source: Box<dyn IndependentGeneratorsSource<G> + '_> = match strategy {
                    GeneratorStrategy::RandomOracle => {
                        Box::new(RandomOracleGenerators::from_context(&ctx))
                    }
                    GeneratorStrategy::Vss => {
                        Box::new(VssGenerators::new(&ctx, board, challenger.as_ref(), rng))
                    }
                };
                source.generate(n).await
            })
            .await
    }

    /// Mix `input` through every dealer in turn, each proving its shuffle.
    ///
    /// A round whose proof is rejected is skipped: the list stays as it was
    /// before that round.
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(party = self.ctx.party(), n = input.len()))]
    pub async fn shuffle(&mut self, input: Ciphertexts<G>) -> Result<Ciphertexts<G>, ProtocolError> {
        let public_key = self.public_key().ok_or(ProtocolError::MissingPrerequisite {
            step: "shuffle",
            required: "dkg",
        })?;
        let n = input.len();
        if n == 0 {
            return Err(ShuffleError::Empty.into());
        }
        let h = self.generators(n).await?.into_inner().into_inner();

        let round = self.next_round("mix").await?;
        let base = self.ctx.tag(&round);
        let own = self.ctx.party();
        let params = self.ctx.parameters().clone();
        let statdist = params.rbitlen;

        let mut current = input;
        let mut exports = Vec::new();
        for l in self.ctx.dealers() {
            let tag = base.child(l);
            if l == own {
                let permutation = Permutation::random(n, &mut self.rng, statdist);
                let (u, r) = commit_permutation(&h, &permutation, &mut self.rng, statdist);
                let s = random_scalars(n, &mut self.rng, statdist);
                let output = shuffle_ciphertexts(&current, &s, &permutation, public_key);
                let published = ByteTree::node(vec![elements_node(&u), ciphertexts_to_tree(&output)]);
                self.board.publish(own, &tag.child("output"), published.clone()).await?;

                let prover = ShuffleProver::new(params.clone())
                    .precompute(h.clone(), permutation, r)?
                    .set_instance(public_key, current, output.clone(), s)?;
                let transcript = sigma::prove(
                    &self.ctx,
                    &self.board,
                    self.challenger.as_ref(),
                    &tag,
                    prover,
                    &mut self.rng,
                )
                .await?;
                exports.push(self.export.spawn_write(
                    &round,
                    l,
                    ByteTree::node(vec![published, transcript.to_byte_tree()]),
                ));
                tracing::info!(target: LOG_TARGET, "Published own shuffle");
                current = output;
                continue;
            }

            let published = self.board.wait_for(l, &tag.child("output")).await?;
            let (u, output, well_formed) = match parse_mix_output::<G>(&published, n) {
                Ok((u, output)) => (u, output, true),
                Err(err) => {
                    tracing::warn!(target: LOG_TARGET, mixer = l, %err, "Malformed shuffle output");
                    (vec![G::zero(); n], current.clone(), false)
                }
            };
            let verifier = ShuffleVerifier::new(params.clone())
                .precompute(h.clone())?
                .set_instance(public_key, current.clone(), output.clone())?
                .set_permutation_commitment(u)?;
            let (valid, transcript) = sigma::verify(
                &self.ctx,
                &self.board,
                self.challenger.as_ref(),
                &tag,
                l,
                verifier,
            )
            .await?;
            exports.push(self.export.spawn_write(
                &round,
                l,
                ByteTree::node(vec![published, transcript.to_byte_tree()]),
            ));
            if valid && well_formed {
                tracing::info!(target: LOG_TARGET, mixer = l, "Shuffle accepted");
                current = output;
            } else {
                tracing::error!(target: LOG_TARGET, mixer = l, "Shuffle proof rejected, keeping previous list");
            }
        }

        for handle in exports {
            handle.join().await?;
        }
        Ok(current)
    }

    pub async fn decrypt(&mut self, ciphertexts: &[ElGamalCiphertext<G>]) -> Result<Vec<G>, ProtocolError> {
        let dkg = self.dkg.as_ref().ok_or(ProtocolError::MissingPrerequisite {
            step: "decrypt",
            required: "dkg",
        })?;
        let round = self.next_round("decrypt").await?;
        threshold_decrypt(
            &self.ctx,
            &self.board,
            self.challenger.as_ref(),
            &round,
            dkg,
            ciphertexts,
            &self.export,
            &mut self.rng,
        )
        .await
    }

    /// Shuffle then decrypt.
    pub async fn mix(&mut self, input: Ciphertexts<G>) -> Result<Vec<G>, ProtocolError> {
        let mixed = self.shuffle(input).await?;
        self.decrypt(&mixed).await
    }
}

fn parse_mix_output<G: CurveGroup>(
    tree: &ByteTree,
    n: usize,
) -> Result<(Vec<G>, Ciphertexts<G>), ByteTreeError> {
    let children = tree.children_exact(2)?;
    Ok((
        elements_from_node(&children[0], Some(n))?,
        ciphertexts_from_tree(&children[1], Some(n))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin_board::InMemoryBulletinBoard;
    use crate::config::ProtocolParameters;
    use crate::test_utils::{contexts_with, random_ciphertexts, setup_test_tracing};
    use ark_bn254::G1Projective;
    use ark_std::UniformRand;

    type G = G1Projective;

    async fn setup_servers(
        sid: &str,
        k: u32,
        t: u32,
        params: ProtocolParameters,
    ) -> (InMemoryBulletinBoard, Vec<MixServer<G, InMemoryBulletinBoard>>) {
        let board = InMemoryBulletinBoard::new();
        let handles: Vec<_> = contexts_with(sid, k, t, params)
            .into_iter()
            .map(|ctx| {
                let board = board.clone();
                tokio::spawn(async move {
                    let rng = StdRng::seed_from_u64(1000 + ctx.party() as u64);
                    let mut server = MixServer::<G, _>::new(ctx, board, rng)?;
                    server.plain_keys().await?;
                    server.dkg().await?;
                    Ok::<_, ProtocolError>(server)
                })
            })
            .collect();
        let mut servers = Vec::new();
        for handle in handles {
            servers.push(handle.await.unwrap().unwrap());
        }
        (board, servers)
    }

    fn encrypt(pk: G, n: usize) -> (Vec<G>, Ciphertexts<G>) {
        let mut rng = StdRng::seed_from_u64(77);
        let messages: Vec<G> = (0..n).map(|_| G::rand(&mut rng)).collect();
        let cts = messages
            .iter()
            .map(|m| ElGamalCiphertext::encrypt(*m, UniformRand::rand(&mut rng), pk))
            .collect();
        (messages, cts)
    }

    type Servers = Vec<MixServer<G, InMemoryBulletinBoard>>;

    async fn mix_all(servers: Servers, input: Ciphertexts<G>) -> (Servers, Vec<Vec<G>>) {
        let handles: Vec<_> = servers
            .into_iter()
            .map(|mut server| {
                let input = input.clone();
                tokio::spawn(async move {
                    let output = server.mix(input).await;
                    (server, output)
                })
            })
            .collect();
        let mut servers = Vec::new();
        let mut results = Vec::new();
        for handle in handles {
            let (server, output) = handle.await.unwrap();
            servers.push(server);
            results.push(output.unwrap());
        }
        (servers, results)
    }

    async fn shuffle_all(servers: Servers, input: Ciphertexts<G>) -> (Servers, Vec<Ciphertexts<G>>) {
        let handles: Vec<_> = servers
            .into_iter()
            .map(|mut server| {
                let input = input.clone();
                tokio::spawn(async move {
                    let output = server.shuffle(input).await;
                    (server, output)
                })
            })
            .collect();
        let mut servers = Vec::new();
        let mut outputs = Vec::new();
        for handle in handles {
            let (server, output) = handle.await.unwrap();
            servers.push(server);
            outputs.push(output.unwrap());
        }
        (servers, outputs)
    }

    fn assert_same_multiset(mut a: Vec<G>, mut b: Vec<G>) {
        let key = |p: &G| p.into_affine().to_string();
        a.sort_by_key(key);
        b.sort_by_key(key);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn end_to_end_mix_with_random_oracle_challenges() {
        setup_test_tracing();
        let (_, servers) = setup_servers("mix-ro", 3, 2, ProtocolParameters::default()).await;
        let (messages, input) = encrypt(servers[0].public_key().unwrap(), 6);

        let (_, results) = mix_all(servers, input).await;
        for result in &results {
            assert_eq!(result, &results[0]);
        }
        assert_same_multiset(results[0].clone(), messages);
    }

    #[tokio::test]
    async fn end_to_end_mix_with_coin_flips_and_vss_generators() {
        let params = ProtocolParameters::default()
            .with_challenges(ChallengeMode::CoinFlip)
            .with_generators(GeneratorStrategy::Vss);
        let (_, servers) = setup_servers("mix-coin", 3, 2, params).await;
        let (messages, input) = encrypt(servers[0].public_key().unwrap(), 4);

        let (_, results) = mix_all(servers, input).await;
        assert!(results.iter().all(|r| r == &results[0]));
        assert_same_multiset(results[0].clone(), messages);
    }

    #[tokio::test]
    async fn repeated_mixes_use_fresh_rounds() {
        let params = ProtocolParameters::default().with_export_proofs(true);
        let (_, servers) = setup_servers("mix-repeat", 3, 2, params).await;
        let pk = servers[0].public_key().unwrap();
        let dir = servers[0].context().session_dir().to_path_buf();

        let (first_messages, first_input) = encrypt(pk, 3);
        let (servers, first) = mix_all(servers, first_input).await;
        assert_same_multiset(first[0].clone(), first_messages);

        let mut rng = StdRng::seed_from_u64(78);
        let second_messages: Vec<G> = (0..3).map(|_| G::rand(&mut rng)).collect();
        let second_input = second_messages
            .iter()
            .map(|m| ElGamalCiphertext::encrypt(*m, UniformRand::rand(&mut rng), pk))
            .collect();
        let (_, second) = mix_all(servers, second_input).await;
        assert!(second.iter().all(|r| r == &second[0]));
        assert_same_multiset(second[0].clone(), second_messages);

        for round in ["mix-1", "mix-2", "decrypt-1", "decrypt-2"] {
            assert!(dir.join("proofs-p1").join(round).join("2.bt").exists(), "{round}");
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn rejected_shuffle_keeps_the_previous_list() {
        let (board, mut servers) = setup_servers("mix-reject", 3, 2, ProtocolParameters::default()).await;
        let pk = servers[0].public_key().unwrap();
        let (_, input) = encrypt(pk, 3);

        // Party 1 replaces the list instead of shuffling it.
        let mixer = servers.remove(0);
        let ctx = mixer.context().clone();
        let mut rng = StdRng::seed_from_u64(4);
        let forged = random_ciphertexts(3, &pk, &mut rng);
        let tag = ctx.tag("mix-1").child(1);
        let forged_u = vec![G::rand(&mut rng); 3];
        board
            .publish(
                1,
                &tag.child("output"),
                ByteTree::node(vec![elements_node(&forged_u), ciphertexts_to_tree(&forged)]),
            )
            .await
            .unwrap();
        board.publish(1, &tag.child("commitment"), ByteTree::empty()).await.unwrap();
        board.publish(1, &tag.child("reply"), ByteTree::empty()).await.unwrap();

        let handles: Vec<_> = servers
            .into_iter()
            .map(|mut server| {
                let input = input.clone();
                tokio::spawn(async move { server.shuffle(input).await })
            })
            .collect();
        let mut outputs = Vec::new();
        for handle in handles {
            outputs.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
        assert!(outputs[0].iter().all(|ct| !forged.contains(ct)));
        assert_ne!(outputs[0], input);
    }

    #[tokio::test]
    async fn restarted_party_reloads_its_setup_and_keeps_mixing() {
        let (board, servers) = setup_servers("mix-restart", 2, 1, ProtocolParameters::default()).await;
        let joint = servers[0].public_key();
        let (_, input) = encrypt(joint.unwrap(), 4);
        let (mut servers, first) = shuffle_all(servers, input.clone()).await;
        assert_eq!(first[0], first[1]);

        // Party 1, the only mixer, goes down and comes back on the same board.
        let ctx = servers.remove(0).context().clone();
        let mut restarted =
            MixServer::<G, _>::new(ctx, board, StdRng::seed_from_u64(5)).unwrap();
        assert!(restarted.plain_keys().await.unwrap().was_cached());
        assert!(restarted.dkg().await.unwrap().was_cached());
        assert!(restarted.generators(4).await.unwrap().was_cached());
        assert_eq!(restarted.public_key(), joint);

        servers.insert(0, restarted);
        let (_, second) = shuffle_all(servers, first[0].clone()).await;
        assert_eq!(second[0], second[1]);
        assert_ne!(second[0], first[0]);
    }

    #[tokio::test]
    async fn generators_are_reloaded_from_the_session() {
        let (_, mut servers) = setup_servers("mix-generators", 1, 1, ProtocolParameters::default()).await;
        let server = &mut servers[0];

        let fresh = server.generators(5).await.unwrap();
        assert!(!fresh.was_cached());
        let again = server.generators(5).await.unwrap();
        assert!(again.was_cached());
        assert_eq!(again.into_inner(), fresh.into_inner());

        let other = server.generators(3).await.unwrap();
        assert!(!other.was_cached());
        assert_eq!(other.value().len(), 3);
    }

    #[tokio::test]
    async fn steps_out_of_order_are_rejected() {
        let ctx = contexts_with("mix-order", 1, 1, ProtocolParameters::default()).remove(0);
        let mut server =
            MixServer::<G, _>::new(ctx, InMemoryBulletinBoard::new(), StdRng::seed_from_u64(0))
                .unwrap();
        assert!(matches!(
            server.dkg().await,
            Err(ProtocolError::MissingPrerequisite { step: "dkg", .. })
        ));
        assert!(matches!(
            server.shuffle(vec![]).await,
            Err(ProtocolError::MissingPrerequisite { step: "shuffle", .. })
        ));
    }
}
