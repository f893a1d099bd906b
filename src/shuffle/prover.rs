use std::marker::PhantomData;

use ark_ec::CurveGroup;
use rand::RngCore;

use super::commitment::commitment_from_randomness;
use super::messages::{shuffle_instance_tree, ShuffleCommitment, ShuffleReply};
use super::{batch_vector, check_len, ShuffleError};
use crate::arithm::{inner_product, msm, random_scalar, random_scalars, Permutation};
use crate::byte_tree::{ByteTree, ToByteTree};
use crate::config::ProtocolParameters;
use crate::elgamal::{msm_ciphertexts, ElGamalCiphertext};
use crate::protocol::sigma::{Prover, Reply};

const LOG_TARGET: &str = "verimix::shuffle::prover";

/// Entry point of the prover state machine.
pub struct ShuffleProver<G: CurveGroup> {
    params: ProtocolParameters,
    _group: PhantomData<G>,
}

/// Holds the permutation, its commitment `u` and the commitment randomness.
pub struct PrecomputedProver<G: CurveGroup> {
    params: ProtocolParameters,
    h: Vec<G>,
    permutation: Permutation,
    r: Vec<G::ScalarField>,
    u: Vec<G>,
}

/// Adds the ciphertext instance and re-encryption randomness.
pub struct InstantiatedProver<G: CurveGroup> {
    precomputed: PrecomputedProver<G>,
    public_key: G,
    input: Vec<ElGamalCiphertext<G>>,
    output: Vec<ElGamalCiphertext<G>>,
    s: Vec<G::ScalarField>,
}

/// Secrets and blinders fixed by the commitment, waiting for the challenge.
pub struct CommittedProver<G: CurveGroup> {
    a: G::ScalarField,
    b: Vec<G::ScalarField>,
    c: G::ScalarField,
    d: G::ScalarField,
    e_prime: Vec<G::ScalarField>,
    f: G::ScalarField,
    alpha: G::ScalarField,
    beta: Vec<G::ScalarField>,
    gamma: G::ScalarField,
    delta: G::ScalarField,
    epsilon: Vec<G::ScalarField>,
    phi: G::ScalarField,
}

impl<G: CurveGroup> ShuffleProver<G> {
    pub fn new(params: ProtocolParameters) -> Self {
        Self {
            params,
            _group: PhantomData,
        }
    }

    /// Commit to `permutation` under the independent generators `h` using randomness `r`.
    ///
    /// The commitment base is the group's standard generator, shared with ElGamal.
    pub fn precompute(
        self,
        h: Vec<G>,
        permutation: Permutation,
        r: Vec<G::ScalarField>,
    ) -> Result<PrecomputedProver<G>, ShuffleError> {
        if h.is_empty() {
            return Err(ShuffleError::Empty);
        }
        check_len("permutation entries", h.len(), permutation.len())?;
        check_len("commitment exponents", h.len(), r.len())?;
        let u = commitment_from_randomness(&h, &permutation, &r);
        Ok(PrecomputedProver {
            params: self.params,
            h,
            permutation,
            r,
            u,
        })
    }
}

impl<G: CurveGroup> PrecomputedProver<G> {
    pub fn permutation_commitment(&self) -> &[G] {
        &self.u
    }

    pub fn set_instance(
        self,
        public_key: G,
        input: Vec<ElGamalCiphertext<G>>,
        output: Vec<ElGamalCiphertext<G>>,
        s: Vec<G::ScalarField>,
    ) -> Result<InstantiatedProver<G>, ShuffleError> {
        let n = self.h.len();
        check_len("input ciphertexts", n, input.len())?;
        check_len("output ciphertexts", n, output.len())?;
        check_len("re-encryption exponents", n, s.len())?;
        Ok(InstantiatedProver {
            precomputed: self,
            public_key,
            input,
            output,
            s,
        })
    }
}

impl<G: CurveGroup> InstantiatedProver<G> {
    pub fn instance_tree(&self) -> ByteTree {
        shuffle_instance_tree(
            &self.precomputed.h,
            &self.precomputed.u,
            &self.public_key,
            &self.input,
            &self.output,
        )
    }

    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(n = self.input.len()))]
    pub fn commit<R: RngCore + ?Sized>(
        self,
        batch_seed: &[u8],
        rng: &mut R,
    ) -> (CommittedProver<G>, ShuffleCommitment<G>) {
        let pre = &self.precomputed;
        let params = &pre.params;
        let statdist = params.rbitlen;
        let n = pre.h.len();
        let g = G::generator();

        let e = batch_vector::<G::ScalarField>(params.hash, batch_seed, n, params.ebitlen);
        let e_prime = pre.permutation.apply_inverse(&e);

        let b: Vec<G::ScalarField> = random_scalars(n, rng, statdist);
        let beta: Vec<G::ScalarField> = random_scalars(n, rng, statdist);
        let epsilon: Vec<G::ScalarField> = random_scalars(n, rng, statdist);
        let alpha = random_scalar(rng, statdist);
        let gamma = random_scalar(rng, statdist);
        let delta = random_scalar(rng, statdist);
        let phi = random_scalar(rng, statdist);

        // Chain B_i = g*b_i + B_{i-1}*e'_i starting from B_{-1} = h_0.
        let mut bridge = Vec::with_capacity(n);
        let mut bridge_prime = Vec::with_capacity(n);
        let mut previous = pre.h[0];
        for i in 0..n {
            bridge_prime.push(g * beta[i] + previous * epsilon[i]);
            let current = g * b[i] + previous * e_prime[i];
            bridge.push(current);
            previous = current;
        }

        // d opens B_{n-1} = g*d + h_0*prod(e').
        let mut d = b[0];
        for i in 1..n {
            d = b[i] + e_prime[i] * d;
        }

        let commitment = ShuffleCommitment {
            b: bridge,
            a_prime: g * alpha + msm(&pre.h, &epsilon),
            b_prime: bridge_prime,
            c_prime: g * gamma,
            d_prime: g * delta,
            f_prime: ElGamalCiphertext::encrypt_zero(phi, self.public_key)
                + msm_ciphertexts(&self.input, &epsilon),
        };
        tracing::debug!(target: LOG_TARGET, "Computed shuffle commitment");

        let committed = CommittedProver {
            a: inner_product(&pre.r, &e_prime),
            b,
            c: pre.r.iter().sum(),
            d,
            f: inner_product(&self.s, &e_prime),
            e_prime,
            alpha,
            beta,
            gamma,
            delta,
            epsilon,
            phi,
        };
        (committed, commitment)
    }
}

impl<G: CurveGroup> CommittedProver<G> {
    /// Every reply has the form `secret * v + blinder`.
    pub fn reply(self, v: G::ScalarField) -> ShuffleReply<G> {
        ShuffleReply {
            k_a: self.a * v + self.alpha,
            k_b: self
                .b
                .iter()
                .zip(&self.beta)
                .map(|(b, beta)| *b * v + beta)
                .collect(),
            k_c: self.c * v + self.gamma,
            k_d: self.d * v + self.delta,
            k_e: self
                .e_prime
                .iter()
                .zip(&self.epsilon)
                .map(|(e, eps)| *e * v + eps)
                .collect(),
            k_f: self.f * v + self.phi,
        }
    }
}

impl<G: CurveGroup> Prover<G> for InstantiatedProver<G> {
    type Committed = CommittedProver<G>;

    fn instance_tree(&self) -> ByteTree {
        InstantiatedProver::instance_tree(self)
    }

    fn commit<R: RngCore + ?Sized>(
        self,
        batch_seed: &[u8],
        rng: &mut R,
    ) -> (Self::Committed, ByteTree) {
        let (committed, commitment) = InstantiatedProver::commit(self, batch_seed, rng);
        (committed, commitment.to_byte_tree())
    }
}

impl<G: CurveGroup> Reply<G> for CommittedProver<G> {
    fn reply(self, challenge: G::ScalarField) -> ByteTree {
        CommittedProver::reply(self, challenge).to_byte_tree()
    }
}
