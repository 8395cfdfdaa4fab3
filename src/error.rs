use thiserror::Error;

use crate::{HASH_BYTES, MIX_BYTES};

/// Everything that can go wrong before a hash is computed.
///
/// Hashing itself is total over validated inputs; a nonce that does not
/// verify is reported as `false`, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("epoch {epoch} is beyond the supported maximum of {max}")]
    EpochOutOfRange { epoch: usize, max: usize },

    #[error("cache size {0} is not a non-zero multiple of {} bytes", HASH_BYTES)]
    InvalidCacheSize(usize),

    #[error("dataset size {0} is not a non-zero multiple of {} bytes", MIX_BYTES)]
    InvalidDatasetSize(usize),

    #[error("dataset holds {actual} bytes but {expected} were declared")]
    DatasetTooShort { expected: usize, actual: usize },

    #[error("dataset size {0} cannot hold the ProgPoW cache")]
    ProgPowDatasetTooSmall(usize),

    #[error("failed to allocate {0} bytes")]
    Allocation(usize),

    #[error("dataset generation aborted at {percent}%")]
    Aborted { percent: usize },

    #[error("block {number} does not belong to epoch {epoch}")]
    EpochMismatch { number: u64, epoch: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
