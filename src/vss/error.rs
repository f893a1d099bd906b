use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VssError {
    #[error("share index 0 is reserved for the secret")]
    ZeroIndex,

    #[error("share index {0} appears more than once")]
    DuplicateIndex(u32),

    #[error("{available} shares available, {threshold} needed")]
    BelowThreshold { available: usize, threshold: usize },
}
