use ark_bn254::G1Projective;
use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_grumpkin::Projective as GrumpkinProjective;
use ark_std::test_rng;
use rand::RngCore;

use super::*;
use crate::arithm::{random_scalars, Permutation};
use crate::byte_tree::{ByteTree, ToByteTree};
use crate::config::ProtocolParameters;
use crate::elgamal::{shuffle_ciphertexts, ElGamalCiphertext, ElGamalKeys};
use crate::test_utils::{random_ciphertexts, random_generators};

struct Fixture<G: CurveGroup> {
    params: ProtocolParameters,
    h: Vec<G>,
    keys: ElGamalKeys<G>,
    input: Vec<ElGamalCiphertext<G>>,
    output: Vec<ElGamalCiphertext<G>>,
    permutation: Permutation,
    r: Vec<G::ScalarField>,
    s: Vec<G::ScalarField>,
    u: Vec<G>,
}

fn scenario_parameters() -> ProtocolParameters {
    ProtocolParameters::default()
        .with_ebitlen(100)
        .with_vbitlen(100)
        .with_rbitlen(50)
}

fn fixture<G: CurveGroup, R: RngCore>(n: usize, params: ProtocolParameters, rng: &mut R) -> Fixture<G> {
    let h = random_generators::<G, _>(n, rng);
    let keys = ElGamalKeys::<G>::random(rng);
    let input = random_ciphertexts(n, &keys.public_key, rng);
    let permutation = Permutation::random(n, rng, params.rbitlen);
    let (u, r) = commit_permutation(&h, &permutation, rng, params.rbitlen);
    let s = random_scalars(n, rng, params.rbitlen);
    let output = shuffle_ciphertexts(&input, &s, &permutation, keys.public_key);
    Fixture {
        params,
        h,
        keys,
        input,
        output,
        permutation,
        r,
        s,
        u,
    }
}

/// Run prover and verifier back to back with fresh public coins.
fn prove_and_verify<G: CurveGroup, R: RngCore>(
    fx: &Fixture<G>,
    prover_r: Vec<G::ScalarField>,
    prover_output: Vec<ElGamalCiphertext<G>>,
    rng: &mut R,
) -> bool {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    let v = G::ScalarField::from(rng.next_u64()) * G::ScalarField::from(rng.next_u64());

    let prover = ShuffleProver::<G>::new(fx.params.clone())
        .precompute(fx.h.clone(), fx.permutation.clone(), prover_r)
        .unwrap()
        .set_instance(fx.keys.public_key, fx.input.clone(), prover_output, fx.s.clone())
        .unwrap();
    let (committed, commitment) = prover.commit(&seed, rng);
    let reply = committed.reply(v);

    ShuffleVerifier::<G>::new(fx.params.clone())
        .precompute(fx.h.clone())
        .unwrap()
        .set_instance(fx.keys.public_key, fx.input.clone(), fx.output.clone())
        .unwrap()
        .set_permutation_commitment(fx.u.clone())
        .unwrap()
        .set_batch_vector(&seed)
        .set_challenge(&commitment.to_byte_tree(), v)
        .verify(&reply.to_byte_tree())
}

#[test]
fn honest_shuffle_of_one_hundred_ciphertexts_is_accepted() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(100, scenario_parameters(), &mut rng);
    assert!(prove_and_verify(&fx, fx.r.clone(), fx.output.clone(), &mut rng));
}

#[test]
fn doubled_commitment_randomness_is_rejected() {
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(100, scenario_parameters(), &mut rng);
    let doubled: Vec<_> = fx.r.iter().map(|r| *r + r).collect();
    assert!(!prove_and_verify(&fx, doubled, fx.output.clone(), &mut rng));
}

#[test]
fn output_from_another_permutation_is_rejected() {
    let mut rng = test_rng();
    let mut fx = fixture::<G1Projective, _>(8, scenario_parameters(), &mut rng);
    let other = Permutation::random(8, &mut rng, 50);
    fx.output = shuffle_ciphertexts(&fx.input, &fx.s, &other, fx.keys.public_key);
    assert!(!prove_and_verify(&fx, fx.r.clone(), fx.output.clone(), &mut rng));
}

#[test]
fn tampered_output_ciphertext_is_rejected() {
    let mut rng = test_rng();
    let mut fx = fixture::<G1Projective, _>(8, scenario_parameters(), &mut rng);
    let honest_output = fx.output.clone();
    fx.output[3] = fx.output[3].add_encryption_layer(
        <G1Projective as ark_ec::PrimeGroup>::ScalarField::from(1u64),
        fx.keys.public_key,
    );
    assert!(!prove_and_verify(&fx, fx.r.clone(), honest_output, &mut rng));
}

#[test]
fn single_ciphertext_shuffle_is_accepted() {
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(1, scenario_parameters(), &mut rng);
    assert!(prove_and_verify(&fx, fx.r.clone(), fx.output.clone(), &mut rng));
}

#[test]
fn engine_is_generic_over_the_group() {
    let mut rng = test_rng();
    let fx = fixture::<GrumpkinProjective, _>(12, ProtocolParameters::default(), &mut rng);
    assert!(prove_and_verify(&fx, fx.r.clone(), fx.output.clone(), &mut rng));
}

#[test]
fn malformed_messages_are_rejected_without_panicking() {
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(4, scenario_parameters(), &mut rng);
    let verifier = || {
        ShuffleVerifier::<G1Projective>::new(fx.params.clone())
            .precompute(fx.h.clone())
            .unwrap()
            .set_instance(fx.keys.public_key, fx.input.clone(), fx.output.clone())
            .unwrap()
            .set_permutation_commitment(fx.u.clone())
            .unwrap()
            .set_batch_vector(b"seed")
    };
    let v = <G1Projective as ark_ec::PrimeGroup>::ScalarField::from(5u64);
    let garbage = ByteTree::leaf(vec![0xFF; 7]);

    assert!(!verifier().set_challenge(&garbage, v).verify(&garbage));
    assert!(!verifier()
        .set_challenge(&ByteTree::empty(), v)
        .verify(&ShuffleReply::<G1Projective>::zero(4).to_byte_tree()));
}

#[test]
fn mismatched_lengths_are_reported() {
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(4, scenario_parameters(), &mut rng);
    let result = ShuffleProver::<G1Projective>::new(fx.params.clone()).precompute(
        fx.h.clone(),
        Permutation::identity(3),
        fx.r.clone(),
    );
    assert!(matches!(result, Err(ShuffleError::LengthMismatch { .. })));
    assert!(matches!(
        ShuffleVerifier::<G1Projective>::new(fx.params.clone()).precompute(Vec::new()),
        Err(ShuffleError::Empty)
    ));
}

fn cc_prove_and_verify<G: CurveGroup, R: RngCore>(
    fx: &Fixture<G>,
    raised_exponent: G::ScalarField,
    raised: RaisedCommitment<G>,
    rng: &mut R,
) -> bool {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    let v = G::ScalarField::from(rng.next_u64());

    let prover = CcShuffleProver::<G>::new(fx.params.clone())
        .precompute(fx.h.clone(), fx.u.clone(), fx.permutation.clone(), fx.r.clone())
        .unwrap()
        .set_instance(
            fx.keys.public_key,
            fx.input.clone(),
            fx.output.clone(),
            fx.s.clone(),
            raised_exponent,
            raised,
        )
        .unwrap();
    let (committed, commitment) = prover.commit(&seed, rng);
    let reply = committed.reply(v);

    CcShuffleVerifier::<G>::new(fx.params.clone())
        .set_instance(
            fx.h.clone(),
            fx.u.clone(),
            raised,
            fx.keys.public_key,
            fx.input.clone(),
            fx.output.clone(),
        )
        .unwrap()
        .verify(&seed, &commitment.to_byte_tree(), v, &reply.to_byte_tree())
}

#[test]
fn commitment_consistent_shuffle_is_accepted() {
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(20, scenario_parameters(), &mut rng);
    let zero = <G1Projective as ark_ec::PrimeGroup>::ScalarField::from(0u64);
    assert!(cc_prove_and_verify(&fx, zero, RaisedCommitment::none(), &mut rng));
}

#[test]
fn raised_commitment_is_folded_into_the_proof() {
    let mut rng = test_rng();
    let fx = fixture::<G1Projective, _>(10, scenario_parameters(), &mut rng);
    let exponent = <G1Projective as ark_ec::PrimeGroup>::ScalarField::rand(&mut rng);
    let raised = RaisedCommitment::commit(exponent, G1Projective::rand(&mut rng));

    assert!(cc_prove_and_verify(&fx, exponent, raised, &mut rng));
    assert!(!cc_prove_and_verify(
        &fx,
        exponent + exponent,
        raised,
        &mut rng
    ));
}

#[test]
fn commitment_consistent_proof_rejects_foreign_commitment() {
    let mut rng = test_rng();
    let mut fx = fixture::<G1Projective, _>(10, scenario_parameters(), &mut rng);
    let other = Permutation::random(10, &mut rng, 50);
    let (u, _) = commit_permutation(&fx.h, &other, &mut rng, 50);
    fx.u = u;
    let zero = <G1Projective as ark_ec::PrimeGroup>::ScalarField::from(0u64);
    assert!(!cc_prove_and_verify(&fx, zero, RaisedCommitment::none(), &mut rng));
}
