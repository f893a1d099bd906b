//! Auxiliary sigma proofs used by the protocol layer.

pub mod decryption_factors;
pub mod exponents;

pub use decryption_factors::{DecryptionFactorsProver, DecryptionFactorsVerifier};
pub use exponents::{verify_exponents, verify_exponents_combined, ExponentsProver};
