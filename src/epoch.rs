use ethereum_types::H256;

use crate::error::{Error, Result};
use crate::miller_rabin::is_prime;
use crate::{keccak_256, HASH_BYTES, MIX_BYTES};

pub const DATASET_BYTES_INIT: usize = 1073741824; // 2 to the power of 30.
pub const DATASET_BYTES_GROWTH: usize = 8388608; // 2 to the power of 23.
pub const CACHE_BYTES_INIT: usize = 16777216; // 2 to the power of 24.
pub const CACHE_BYTES_GROWTH: usize = 131072; // 2 to the power of 17.

pub const EPOCH_LENGTH: u64 = 30_000;
/// Number of epochs covered by the canonical size tables.
pub const MAX_EPOCH: usize = 2048;

pub fn epoch_of(number: u64) -> usize {
    (number / EPOCH_LENGTH) as usize
}

fn check_epoch(epoch: usize) -> Result<()> {
    if epoch >= MAX_EPOCH {
        return Err(Error::EpochOutOfRange {
            epoch,
            max: MAX_EPOCH - 1,
        });
    }
    Ok(())
}

/// Get the cache size required for the given epoch.
pub fn get_cache_size(epoch: usize) -> Result<usize> {
    check_epoch(epoch)?;
    let mut sz = CACHE_BYTES_INIT + CACHE_BYTES_GROWTH * epoch;
    sz -= HASH_BYTES;
    while !is_prime(sz / HASH_BYTES) {
        sz -= 2 * HASH_BYTES;
    }
    Ok(sz)
}

/// Get the full dataset size for the given epoch.
pub fn get_full_size(epoch: usize) -> Result<usize> {
    check_epoch(epoch)?;
    let mut sz = DATASET_BYTES_INIT + DATASET_BYTES_GROWTH * epoch;
    sz -= MIX_BYTES;
    while !is_prime(sz / MIX_BYTES) {
        sz -= 2 * MIX_BYTES;
    }
    Ok(sz)
}

/// Get the seedhash for a given epoch.
pub fn get_seedhash(epoch: usize) -> H256 {
    let mut s = [0u8; 32];
    for _ in 0..epoch {
        s = keccak_256(&s);
    }
    H256(s)
}

/// Sizes and seed shared by every block of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochParams {
    pub epoch: usize,
    pub cache_size: usize,
    pub full_size: usize,
    pub seed: H256,
}

impl EpochParams {
    pub fn new(epoch: usize) -> Result<Self> {
        Ok(Self {
            epoch,
            cache_size: get_cache_size(epoch)?,
            full_size: get_full_size(epoch)?,
            seed: get_seedhash(epoch),
        })
    }

    pub fn for_block(number: u64) -> Result<Self> {
        Self::new(epoch_of(number))
    }

    pub fn contains(&self, number: u64) -> bool {
        epoch_of(number) == self.epoch
    }
}
