use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use ark_bn254::{Fr as Scalar, G1Projective as Curve};
use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use clap::{Parser, ValueEnum};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use verimix::config::{ChallengeMode, GeneratorStrategy, ProtocolParameters};
use verimix::tokio_tools::join_parties;
use verimix::{ElGamalCiphertext, InMemoryBulletinBoard, MixServer, ProtocolContext};

const LOG_TARGET: &str = "bin::mixnet_demo";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Challenges {
    RandomOracle,
    CoinFlip,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Generators {
    RandomOracle,
    Vss,
}

#[derive(Debug, Parser)]
#[command(name = "mixnet_demo")]
#[command(about = "Run every party of a verifiable mix-net in one process", long_about = None)]
struct Args {
    /// Number of parties
    #[arg(long, env = "MIXNET_PARTIES", default_value_t = 3)]
    parties: u32,

    /// Parties needed to decrypt; the first `threshold` parties also mix
    #[arg(long, env = "MIXNET_THRESHOLD", default_value_t = 2)]
    threshold: u32,

    /// Number of ciphertexts to mix
    #[arg(long, env = "MIXNET_CIPHERTEXTS", default_value_t = 32)]
    ciphertexts: usize,

    /// Session identifier
    #[arg(long, env = "MIXNET_SID", default_value = "demo")]
    sid: String,

    /// JSON parameter file; defaults are used when absent
    #[arg(long, env = "MIXNET_PARAMS")]
    params: Option<PathBuf>,

    /// Override the challenge source
    #[arg(long, value_enum)]
    challenges: Option<Challenges>,

    /// Override the generator derivation strategy
    #[arg(long, value_enum)]
    generators: Option<Generators>,

    /// Directory for session state and exported proofs; reusing one resumes the session
    #[arg(long, env = "MIXNET_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    /// Export proof transcripts for offline verification
    #[arg(long, default_value_t = false)]
    export_proofs: bool,

    /// Optional RNG seed for reproducible runs
    #[arg(long, env = "MIXNET_RNG_SEED")]
    rng_seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let params = build_parameters(&args)?;
    let session_dir = args
        .session_dir
        .clone()
        .unwrap_or_else(|| {
            std::env::temp_dir().join(format!("verimix-{}-{}", args.sid, std::process::id()))
        });
    let mut rng = args
        .rng_seed
        .map(StdRng::seed_from_u64)
        .unwrap_or_else(StdRng::from_entropy);

    info!(
        target: LOG_TARGET,
        parties = args.parties,
        threshold = args.threshold,
        n = args.ciphertexts,
        dir = %session_dir.display(),
        "Starting mix-net session"
    );

    let board = InMemoryBulletinBoard::new();
    let mut servers = Vec::with_capacity(args.parties as usize);
    for j in 1..=args.parties {
        let ctx = ProtocolContext::new(
            args.sid.clone(),
            j,
            args.parties,
            args.threshold,
            params.clone(),
            session_dir.clone(),
        )?;
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        servers.push(MixServer::<Curve, _>::new(ctx, board.clone(), StdRng::from_seed(seed))?);
    }

    let started = Instant::now();
    let servers = run_all(servers, |mut server| async move {
        server.plain_keys().await?;
        server.dkg().await?;
        Ok(server)
    })
    .await?;
    info!(target: LOG_TARGET, elapsed = ?started.elapsed(), "Keys established");

    let public_key = servers[0]
        .public_key()
        .context("key generation produced no public key")?;
    let messages: Vec<Curve> = (0..args.ciphertexts).map(|_| Curve::rand(&mut rng)).collect();
    let input: Vec<ElGamalCiphertext<Curve>> = messages
        .iter()
        .map(|m| ElGamalCiphertext::encrypt(*m, Scalar::rand(&mut rng), public_key))
        .collect();

    let started = Instant::now();
    let outputs = run_all(servers, move |mut server| {
        let input = input.clone();
        async move { server.mix(input).await }
    })
    .await?;
    info!(target: LOG_TARGET, elapsed = ?started.elapsed(), "Mixed and decrypted");

    if outputs.iter().any(|output| output != &outputs[0]) {
        bail!("parties disagree on the decrypted output");
    }
    if sorted_encodings(&messages) != sorted_encodings(&outputs[0]) {
        bail!("decrypted output is not a permutation of the input");
    }
    println!(
        "Mixed {} ciphertexts among {} parties (threshold {}); output verified.",
        args.ciphertexts, args.parties, args.threshold
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::fmt().with_env_filter(filter).with_target(false).compact().init();
}

fn build_parameters(args: &Args) -> Result<ProtocolParameters> {
    let mut params = match &args.params {
        Some(path) => ProtocolParameters::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ProtocolParameters::default(),
    };
    if let Some(challenges) = args.challenges {
        params = params.with_challenges(match challenges {
            Challenges::RandomOracle => ChallengeMode::RandomOracle,
            Challenges::CoinFlip => ChallengeMode::CoinFlip,
        });
    }
    if let Some(generators) = args.generators {
        params = params.with_generators(match generators {
            Generators::RandomOracle => GeneratorStrategy::RandomOracle,
            Generators::Vss => GeneratorStrategy::Vss,
        });
    }
    if args.export_proofs {
        params = params.with_export_proofs(true);
    }
    Ok(params)
}

/// Run one task per party and fail if any of them fails.
async fn run_all<T, F, Fut>(
    servers: Vec<MixServer<Curve, InMemoryBulletinBoard>>,
    step: F,
) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(MixServer<Curve, InMemoryBulletinBoard>) -> Fut,
    Fut: std::future::Future<Output = Result<T, verimix::ProtocolError>> + Send + 'static,
{
    let tasks = servers
        .into_iter()
        .map(|server| (server.context().party(), step(server)))
        .collect();
    let mut outputs = Vec::new();
    for (j, result) in (1u32..).zip(join_parties(tasks).await) {
        let output = result
            .with_context(|| format!("party {j} task panicked"))?
            .with_context(|| format!("party {j} failed"))?;
        outputs.push(output);
    }
    Ok(outputs)
}

fn sorted_encodings(points: &[Curve]) -> Vec<String> {
    let mut encoded: Vec<String> = points
        .iter()
        .map(|p| p.into_affine().to_string())
        .collect();
    encoded.sort();
    encoded
}
