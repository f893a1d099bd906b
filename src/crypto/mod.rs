//! Hash-based primitives: digest dispatch, the counter-mode PRG and the random oracle.

mod hash;
mod prg;
mod random_oracle;

pub use hash::canonical_serialize_bytes;
pub use prg::Prg;
pub use random_oracle::RandomOracle;
pub(crate) use random_oracle::mask_high_bits;
