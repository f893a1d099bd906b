//! Commitment-consistent proof of shuffle.
//!
//! The permutation commitment `u` was published (and proven well-formed) in an
//! earlier phase, so only the `A` and `F` relations remain: the same permutation
//! committed in `u` links input and output ciphertexts.
//!
//! An outer protocol may fold one more commitment into `A`: `raised_u` with
//! `raised_u = g*raised_exponent + raised_h`. The prover opens `A + raised_u`
//! instead of `A`, which lets unused commitment slots be absorbed.

use std::marker::PhantomData;

use ark_ec::CurveGroup;
use rand::RngCore;

use super::messages::{shuffle_instance_tree, CcCommitment, CcReply};
use super::{batch_vector, check_len, ShuffleError};
use crate::arithm::{inner_product, msm, random_scalar, random_scalars, Permutation};
use crate::byte_tree::{element_leaf, ByteTree, ToByteTree};
use crate::config::ProtocolParameters;
use crate::elgamal::{msm_ciphertexts, ElGamalCiphertext};
use crate::protocol::sigma::{Prover, Reply, Verifier};

const LOG_TARGET: &str = "verimix::shuffle::cc";

/// Public part of the folded-in commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaisedCommitment<G: CurveGroup> {
    pub raised_u: G,
    pub raised_h: G,
}

impl<G: CurveGroup> RaisedCommitment<G> {
    /// Neutral element: folding it in leaves the proof unchanged.
    pub fn none() -> Self {
        Self {
            raised_u: G::zero(),
            raised_h: G::zero(),
        }
    }

    /// Commitment to `exponent` over base `raised_h`.
    pub fn commit(exponent: G::ScalarField, raised_h: G) -> Self {
        Self {
            raised_u: G::generator() * exponent + raised_h,
            raised_h,
        }
    }
}

fn cc_instance_tree<G: CurveGroup>(
    h: &[G],
    u: &[G],
    raised: &RaisedCommitment<G>,
    public_key: &G,
    input: &[ElGamalCiphertext<G>],
    output: &[ElGamalCiphertext<G>],
) -> ByteTree {
    ByteTree::node(vec![
        shuffle_instance_tree(h, u, public_key, input, output),
        element_leaf(&raised.raised_u),
        element_leaf(&raised.raised_h),
    ])
}

pub struct CcShuffleProver<G: CurveGroup> {
    params: ProtocolParameters,
    _group: PhantomData<G>,
}

pub struct CcPrecomputedProver<G: CurveGroup> {
    params: ProtocolParameters,
    h: Vec<G>,
    u: Vec<G>,
    permutation: Permutation,
    r: Vec<G::ScalarField>,
}

pub struct CcInstantiatedProver<G: CurveGroup> {
    precomputed: CcPrecomputedProver<G>,
    public_key: G,
    input: Vec<ElGamalCiphertext<G>>,
    output: Vec<ElGamalCiphertext<G>>,
    s: Vec<G::ScalarField>,
    raised_exponent: G::ScalarField,
    raised: RaisedCommitment<G>,
}

pub struct CcCommittedProver<G: CurveGroup> {
    a: G::ScalarField,
    e_prime: Vec<G::ScalarField>,
    f: G::ScalarField,
    alpha: G::ScalarField,
    epsilon: Vec<G::ScalarField>,
    phi: G::ScalarField,
}

impl<G: CurveGroup> CcShuffleProver<G> {
    pub fn new(params: ProtocolParameters) -> Self {
        Self {
            params,
            _group: PhantomData,
        }
    }

    /// `u` is the externally fixed commitment to `permutation` with randomness `r`.
    pub fn precompute(
        self,
        h: Vec<G>,
        u: Vec<G>,
        permutation: Permutation,
        r: Vec<G::ScalarField>,
    ) -> Result<CcPrecomputedProver<G>, ShuffleError> {
        if h.is_empty() {
            return Err(ShuffleError::Empty);
        }
        check_len("permutation commitment elements", h.len(), u.len())?;
        check_len("permutation entries", h.len(), permutation.len())?;
        check_len("commitment exponents", h.len(), r.len())?;
        Ok(CcPrecomputedProver {
            params: self.params,
            h,
            u,
            permutation,
            r,
        })
    }
}

impl<G: CurveGroup> CcPrecomputedProver<G> {
    pub fn set_instance(
        self,
        public_key: G,
        input: Vec<ElGamalCiphertext<G>>,
        output: Vec<ElGamalCiphertext<G>>,
        s: Vec<G::ScalarField>,
        raised_exponent: G::ScalarField,
        raised: RaisedCommitment<G>,
    ) -> Result<CcInstantiatedProver<G>, ShuffleError> {
        let n = self.h.len();
        check_len("input ciphertexts", n, input.len())?;
        check_len("output ciphertexts", n, output.len())?;
        check_len("re-encryption exponents", n, s.len())?;
        Ok(CcInstantiatedProver {
            precomputed: self,
            public_key,
            input,
            output,
            s,
            raised_exponent,
            raised,
        })
    }
}

impl<G: CurveGroup> CcInstantiatedProver<G> {
    pub fn instance_tree(&self) -> ByteTree {
        cc_instance_tree(
            &self.precomputed.h,
            &self.precomputed.u,
            &self.raised,
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
    ) -> (CcCommittedProver<G>, CcCommitment<G>) {
        let pre = &self.precomputed;
        let params = &pre.params;
        let n = pre.h.len();
        let g = G::generator();

        let e = batch_vector::<G::ScalarField>(params.hash, batch_seed, n, params.ebitlen);
        let e_prime = pre.permutation.apply_inverse(&e);

        let epsilon: Vec<G::ScalarField> = random_scalars(n, rng, params.rbitlen);
        let alpha = random_scalar(rng, params.rbitlen);
        let phi = random_scalar(rng, params.rbitlen);

        let commitment = CcCommitment {
            a_prime: g * alpha + msm(&pre.h, &epsilon),
            f_prime: ElGamalCiphertext::encrypt_zero(phi, self.public_key)
                + msm_ciphertexts(&self.input, &epsilon),
        };
        let committed = CcCommittedProver {
            a: inner_product(&pre.r, &e_prime) + self.raised_exponent,
            f: inner_product(&self.s, &e_prime),
            e_prime,
            alpha,
            epsilon,
            phi,
        };
        (committed, commitment)
    }
}

impl<G: CurveGroup> CcCommittedProver<G> {
    pub fn reply(self, v: G::ScalarField) -> CcReply<G> {
        CcReply {
            k_a: self.a * v + self.alpha,
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

impl<G: CurveGroup> Prover<G> for CcInstantiatedProver<G> {
    type Committed = CcCommittedProver<G>;

    fn instance_tree(&self) -> ByteTree {
        CcInstantiatedProver::instance_tree(self)
    }

    fn commit<R: RngCore + ?Sized>(
        self,
        batch_seed: &[u8],
        rng: &mut R,
    ) -> (Self::Committed, ByteTree) {
        let (committed, commitment) = CcInstantiatedProver::commit(self, batch_seed, rng);
        (committed, commitment.to_byte_tree())
    }
}

impl<G: CurveGroup> Reply<G> for CcCommittedProver<G> {
    fn reply(self, challenge: G::ScalarField) -> ByteTree {
        CcCommittedProver::reply(self, challenge).to_byte_tree()
    }
}

pub struct CcShuffleVerifier<G: CurveGroup> {
    params: ProtocolParameters,
    _group: PhantomData<G>,
}

/// Complete statement of a commitment-consistent shuffle.
pub struct CcInstantiatedVerifier<G: CurveGroup> {
    params: ProtocolParameters,
    h: Vec<G>,
    u: Vec<G>,
    raised: RaisedCommitment<G>,
    public_key: G,
    input: Vec<ElGamalCiphertext<G>>,
    output: Vec<ElGamalCiphertext<G>>,
}

impl<G: CurveGroup> CcShuffleVerifier<G> {
    pub fn new(params: ProtocolParameters) -> Self {
        Self {
            params,
            _group: PhantomData,
        }
    }

    pub fn set_instance(
        self,
        h: Vec<G>,
        u: Vec<G>,
        raised: RaisedCommitment<G>,
        public_key: G,
        input: Vec<ElGamalCiphertext<G>>,
        output: Vec<ElGamalCiphertext<G>>,
    ) -> Result<CcInstantiatedVerifier<G>, ShuffleError> {
        if h.is_empty() {
            return Err(ShuffleError::Empty);
        }
        let n = h.len();
        check_len("permutation commitment elements", n, u.len())?;
        check_len("input ciphertexts", n, input.len())?;
        check_len("output ciphertexts", n, output.len())?;
        Ok(CcInstantiatedVerifier {
            params: self.params,
            h,
            u,
            raised,
            public_key,
            input,
            output,
        })
    }
}

impl<G: CurveGroup> CcInstantiatedVerifier<G> {
    pub fn instance_tree(&self) -> ByteTree {
        cc_instance_tree(
            &self.h,
            &self.u,
            &self.raised,
            &self.public_key,
            &self.input,
            &self.output,
        )
    }

    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(n = self.h.len()))]
    pub fn verify(
        &self,
        batch_seed: &[u8],
        commitment: &ByteTree,
        v: G::ScalarField,
        reply: &ByteTree,
    ) -> bool {
        let n = self.h.len();
        let g = G::generator();
        let e = batch_vector::<G::ScalarField>(self.params.hash, batch_seed, n, self.params.ebitlen);
        let a = msm(&self.u, &e) + self.raised.raised_u;
        let f = msm_ciphertexts(&self.output, &e);

        let commitment = CcCommitment::<G>::parse_or_identity(commitment);
        let reply = CcReply::<G>::parse_or_zero(reply, n);

        let a_ok = a * v + commitment.a_prime
            == g * reply.k_a + msm(&self.h, &reply.k_e) + self.raised.raised_h * v;
        let f_ok = f.scale(v) + commitment.f_prime
            == ElGamalCiphertext::encrypt_zero(reply.k_f, self.public_key)
                + msm_ciphertexts(&self.input, &reply.k_e);

        if !(a_ok && f_ok) {
            tracing::warn!(target: LOG_TARGET, a_ok, f_ok, "Commitment-consistent shuffle proof rejected");
        }
        a_ok && f_ok
    }
}

impl<G: CurveGroup> Verifier<G> for CcInstantiatedVerifier<G> {
    fn instance_tree(&self) -> ByteTree {
        CcInstantiatedVerifier::instance_tree(self)
    }

    fn verify(
        self,
        batch_seed: &[u8],
        commitment: &ByteTree,
        challenge: G::ScalarField,
        reply: &ByteTree,
    ) -> bool {
        CcInstantiatedVerifier::verify(&self, batch_seed, commitment, challenge, reply)
    }
}
