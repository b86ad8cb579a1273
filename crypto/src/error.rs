use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("seed of {len} bytes exceeds the {max}-byte limit")]
    SeedTooLong { len: usize, max: usize },

    #[error("too many seeds: {0}")]
    TooManySeeds(usize),

    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    #[error("no bump seed yields an off-curve address")]
    NoViableBump,
}
