use std::marker::PhantomData;

use ark_ec::CurveGroup;

use super::messages::{shuffle_instance_tree, ShuffleCommitment, ShuffleReply};
use super::{batch_vector, check_len, ShuffleError};
use crate::arithm::{msm, product, sum};
use crate::byte_tree::ByteTree;
use crate::config::ProtocolParameters;
use crate::elgamal::{msm_ciphertexts, ElGamalCiphertext};
use crate::protocol::sigma::Verifier;

const LOG_TARGET: &str = "verimix::shuffle::verifier";

pub struct ShuffleVerifier<G: CurveGroup> {
    params: ProtocolParameters,
    _group: PhantomData<G>,
}

pub struct PrecomputedVerifier<G: CurveGroup> {
    params: ProtocolParameters,
    h: Vec<G>,
}

pub struct InstantiatedVerifier<G: CurveGroup> {
    precomputed: PrecomputedVerifier<G>,
    public_key: G,
    input: Vec<ElGamalCiphertext<G>>,
    output: Vec<ElGamalCiphertext<G>>,
}

/// The statement is complete once the permutation commitment `u` is known.
pub struct PermutationCommittedVerifier<G: CurveGroup> {
    instance: InstantiatedVerifier<G>,
    u: Vec<G>,
}

/// Batching vector fixed; `A = sum e_i u_i` and `F = sum e_i w'_i` are computed.
pub struct BatchedVerifier<G: CurveGroup> {
    statement: PermutationCommittedVerifier<G>,
    e: Vec<G::ScalarField>,
    a: G,
    f: ElGamalCiphertext<G>,
}

pub struct ChallengedVerifier<G: CurveGroup> {
    batched: BatchedVerifier<G>,
    commitment: ShuffleCommitment<G>,
    v: G::ScalarField,
}

impl<G: CurveGroup> ShuffleVerifier<G> {
    pub fn new(params: ProtocolParameters) -> Self {
        Self {
            params,
            _group: PhantomData,
        }
    }

    pub fn precompute(self, h: Vec<G>) -> Result<PrecomputedVerifier<G>, ShuffleError> {
        if h.is_empty() {
            return Err(ShuffleError::Empty);
        }
        Ok(PrecomputedVerifier {
            params: self.params,
            h,
        })
    }
}

impl<G: CurveGroup> PrecomputedVerifier<G> {
    pub fn set_instance(
        self,
        public_key: G,
        input: Vec<ElGamalCiphertext<G>>,
        output: Vec<ElGamalCiphertext<G>>,
    ) -> Result<InstantiatedVerifier<G>, ShuffleError> {
        let n = self.h.len();
        check_len("input ciphertexts", n, input.len())?;
        check_len("output ciphertexts", n, output.len())?;
        Ok(InstantiatedVerifier {
            precomputed: self,
            public_key,
            input,
            output,
        })
    }
}

impl<G: CurveGroup> InstantiatedVerifier<G> {
    pub fn set_permutation_commitment(
        self,
        u: Vec<G>,
    ) -> Result<PermutationCommittedVerifier<G>, ShuffleError> {
        check_len("permutation commitment elements", self.precomputed.h.len(), u.len())?;
        Ok(PermutationCommittedVerifier { instance: self, u })
    }
}

impl<G: CurveGroup> PermutationCommittedVerifier<G> {
    pub fn instance_tree(&self) -> ByteTree {
        shuffle_instance_tree(
            &self.instance.precomputed.h,
            &self.u,
            &self.instance.public_key,
            &self.instance.input,
            &self.instance.output,
        )
    }

    pub fn set_batch_vector(self, batch_seed: &[u8]) -> BatchedVerifier<G> {
        let params = &self.instance.precomputed.params;
        let e = batch_vector::<G::ScalarField>(params.hash, batch_seed, self.u.len(), params.ebitlen);
        let a = msm(&self.u, &e);
        let f = msm_ciphertexts(&self.instance.output, &e);
        BatchedVerifier {
            statement: self,
            e,
            a,
            f,
        }
    }
}

impl<G: CurveGroup> BatchedVerifier<G> {
    /// Fix the prover's commitment and the challenge `v` derived after it.
    ///
    /// A malformed commitment is replaced by identities and will not verify.
    pub fn set_challenge(self, commitment: &ByteTree, v: G::ScalarField) -> ChallengedVerifier<G> {
        let n = self.e.len();
        ChallengedVerifier {
            commitment: ShuffleCommitment::parse_or_identity(commitment, n),
            batched: self,
            v,
        }
    }
}

impl<G: CurveGroup> ChallengedVerifier<G> {
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(n = self.batched.e.len()))]
    pub fn verify(self, reply: &ByteTree) -> bool {
        let batched = &self.batched;
        let statement = &batched.statement;
        let instance = &statement.instance;
        let h = &instance.precomputed.h;
        let n = h.len();
        let reply = ShuffleReply::<G>::parse_or_zero(reply, n);
        let commitment = &self.commitment;
        let v = self.v;
        let g = G::generator();

        let a_ok = batched.a * v + commitment.a_prime == g * reply.k_a + msm(h, &reply.k_e);

        let mut b_ok = true;
        let mut previous = h[0];
        for i in 0..n {
            if commitment.b[i] * v + commitment.b_prime[i] != g * reply.k_b[i] + previous * reply.k_e[i] {
                b_ok = false;
                break;
            }
            previous = commitment.b[i];
        }

        let c = sum(&statement.u) - sum(h);
        let c_ok = c * v + commitment.c_prime == g * reply.k_c;

        let d = commitment.b[n - 1] - h[0] * product(&batched.e);
        let d_ok = d * v + commitment.d_prime == g * reply.k_d;

        let f_ok = batched.f.scale(v) + commitment.f_prime
            == ElGamalCiphertext::encrypt_zero(reply.k_f, instance.public_key)
                + msm_ciphertexts(&instance.input, &reply.k_e);

        let accepted = a_ok && b_ok && c_ok && d_ok && f_ok;
        if accepted {
            tracing::debug!(target: LOG_TARGET, "Shuffle proof accepted");
        } else {
            tracing::warn!(target: LOG_TARGET, a_ok, b_ok, c_ok, d_ok, f_ok, "Shuffle proof rejected");
        }
        accepted
    }
}

impl<G: CurveGroup> Verifier<G> for PermutationCommittedVerifier<G> {
    fn instance_tree(&self) -> ByteTree {
        PermutationCommittedVerifier::instance_tree(self)
    }

    fn verify(
        self,
        batch_seed: &[u8],
        commitment: &ByteTree,
        challenge: G::ScalarField,
        reply: &ByteTree,
    ) -> bool {
        self.set_batch_vector(batch_seed)
            .set_challenge(commitment, challenge)
            .verify(reply)
    }
}
