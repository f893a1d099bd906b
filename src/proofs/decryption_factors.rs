//! Batched Chaum-Pedersen proof that decryption factors `d_i = c1_i * x` use the
//! secret `x` behind the public key `y = g*x`.
//!
//! With `C = sum e_i c1_i` and `D = sum e_i d_i`, the prover shows
//! `log_g y = log_C D`.

use ark_ec::CurveGroup;
use rand::RngCore;
use zeroize::Zeroize;

use crate::arithm::{msm, random_scalar};
use crate::byte_tree::{
    element_from_leaf, element_leaf, elements_node, parse_or_default, ByteTree, ByteTreeError,
};
use crate::config::ProtocolParameters;
use crate::protocol::sigma::{Prover, Reply, Verifier};
use crate::shuffle::batch_vector;

const LOG_TARGET: &str = "verimix::proofs::decryption_factors";

#[derive(Clone, Debug)]
struct Statement<G: CurveGroup> {
    params: ProtocolParameters,
    public_key: G,
    c1: Vec<G>,
    factors: Vec<G>,
}

impl<G: CurveGroup> Statement<G> {
    fn instance_tree(&self) -> ByteTree {
        ByteTree::node(vec![
            element_leaf(&self.public_key),
            elements_node(&self.c1),
            elements_node(&self.factors),
        ])
    }

    fn batched_bases(&self, batch_seed: &[u8]) -> (G, G) {
        let e = batch_vector::<G::ScalarField>(
            self.params.hash,
            batch_seed,
            self.c1.len(),
            self.params.ebitlen,
        );
        (msm(&self.c1, &e), msm(&self.factors, &e))
    }
}

pub struct DecryptionFactorsProver<G: CurveGroup> {
    statement: Statement<G>,
    secret: G::ScalarField,
}

pub struct CommittedDecryptionFactors<G: CurveGroup> {
    secret: G::ScalarField,
    w: G::ScalarField,
}

pub struct DecryptionFactorsVerifier<G: CurveGroup> {
    statement: Statement<G>,
}

impl<G: CurveGroup> DecryptionFactorsProver<G> {
    pub fn new(params: ProtocolParameters, secret: G::ScalarField, c1: Vec<G>, factors: Vec<G>) -> Self {
        Self {
            statement: Statement {
                params,
                public_key: G::generator() * secret,
                c1,
                factors,
            },
            secret,
        }
    }
}

impl<G: CurveGroup> DecryptionFactorsVerifier<G> {
    pub fn new(params: ProtocolParameters, public_key: G, c1: Vec<G>, factors: Vec<G>) -> Self {
        Self {
            statement: Statement {
                params,
                public_key,
                c1,
                factors,
            },
        }
    }
}

impl<G: CurveGroup> Prover<G> for DecryptionFactorsProver<G> {
    type Committed = CommittedDecryptionFactors<G>;

    fn instance_tree(&self) -> ByteTree {
        self.statement.instance_tree()
    }

    fn commit<R: RngCore + ?Sized>(self, batch_seed: &[u8], rng: &mut R) -> (Self::Committed, ByteTree) {
        let (c, _) = self.statement.batched_bases(batch_seed);
        let w = random_scalar(rng, self.statement.params.rbitlen);
        let t_g = G::generator() * w;
        let t_h = c * w;
        (
            CommittedDecryptionFactors {
                secret: self.secret,
                w,
            },
            ByteTree::node(vec![element_leaf(&t_g), element_leaf(&t_h)]),
        )
    }
}

impl<G: CurveGroup> Reply<G> for CommittedDecryptionFactors<G> {
    /// `z = w + v * x`.
    fn reply(self, challenge: G::ScalarField) -> ByteTree {
        element_leaf(&(self.w + challenge * self.secret))
    }
}

impl<G: CurveGroup> Drop for CommittedDecryptionFactors<G> {
    fn drop(&mut self) {
        self.secret.zeroize();
        self.w.zeroize();
    }
}

fn parse_commitment<G: CurveGroup>(tree: &ByteTree) -> Result<(G, G), ByteTreeError> {
    let children = tree.children_exact(2)?;
    Ok((element_from_leaf(&children[0])?, element_from_leaf(&children[1])?))
}

impl<G: CurveGroup> Verifier<G> for DecryptionFactorsVerifier<G> {
    fn instance_tree(&self) -> ByteTree {
        self.statement.instance_tree()
    }

    fn verify(
        self,
        batch_seed: &[u8],
        commitment: &ByteTree,
        challenge: G::ScalarField,
        reply: &ByteTree,
    ) -> bool {
        if self.statement.c1.len() != self.statement.factors.len() {
            return false;
        }
        let (c, d) = self.statement.batched_bases(batch_seed);
        let (t_g, t_h) = parse_or_default(
            parse_commitment::<G>(commitment),
            || (G::zero(), G::zero()),
            "decryption factor commitment",
        );
        let z = parse_or_default(
            element_from_leaf::<G::ScalarField>(reply),
            || G::ScalarField::from(0u64),
            "decryption factor reply",
        );

        // g^z = T_g + y^v and C^z = T_h + D^v
        let check1 = G::generator() * z == t_g + self.statement.public_key * challenge;
        let check2 = c * z == t_h + d * challenge;
        tracing::debug!(target: LOG_TARGET, check1, check2, "Decryption factor proof checked");
        check1 && check2
    }
}
