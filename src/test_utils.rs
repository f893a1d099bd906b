//! Fixtures shared by the test modules.

use std::path::PathBuf;

use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::bulletin_board::InMemoryBulletinBoard;
use crate::config::ProtocolParameters;
use crate::elgamal::ElGamalCiphertext;
use crate::protocol::context::ProtocolContext;
use crate::protocol::plain_keys::{exchange_plain_keys, PlainKeys};

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }
}

/// Install a test-writer subscriber honouring `RUST_LOG`; later calls are no-ops.
pub fn setup_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh, not yet created directory under the system temp dir.
pub fn temp_session_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("verimix-{name}-{:016x}", rand::random::<u64>()))
}

pub fn contexts(sid: &str, parties: u32, threshold: u32) -> Vec<ProtocolContext> {
    contexts_with(sid, parties, threshold, ProtocolParameters::default())
}

/// One context per party, all sharing a fresh session directory.
pub fn contexts_with(
    sid: &str,
    parties: u32,
    threshold: u32,
    params: ProtocolParameters,
) -> Vec<ProtocolContext> {
    let dir = temp_session_dir(sid);
    (1..=parties)
        .map(|j| {
            ProtocolContext::new(sid, j, parties, threshold, params.clone(), dir.clone())
                .expect("valid test context")
        })
        .collect()
}

/// Run the plain key exchange for every context concurrently.
pub async fn exchange_all_plain_keys<G: CurveGroup>(
    ctxs: &[ProtocolContext],
    board: &InMemoryBulletinBoard,
) -> Vec<PlainKeys<G>> {
    let handles: Vec<_> = ctxs
        .iter()
        .cloned()
        .map(|ctx| {
            let board = board.clone();
            tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(500 + ctx.party() as u64);
                exchange_plain_keys::<G, _, _>(&ctx, &board, &mut rng).await
            })
        })
        .collect();
    let mut keys = Vec::with_capacity(handles.len());
    for handle in handles {
        keys.push(handle.await.expect("key exchange task").expect("key exchange"));
    }
    keys
}

/// Encryptions of uniformly random group elements.
pub fn random_ciphertexts<G: CurveGroup, R: RngCore + ?Sized>(
    n: usize,
    public_key: &G,
    rng: &mut R,
) -> Vec<ElGamalCiphertext<G>> {
    (0..n)
        .map(|_| {
            let message = G::rand(rng);
            ElGamalCiphertext::encrypt(message, G::ScalarField::rand(rng), *public_key)
        })
        .collect()
}

/// Generators with known discrete logs; fine for tests, never for production.
pub fn random_generators<G: CurveGroup, R: RngCore + ?Sized>(n: usize, rng: &mut R) -> Vec<G> {
    (0..n)
        .map(|_| G::generator() * G::ScalarField::rand(rng))
        .collect()
}
