//! Apache-2 licensed Ethash and ProgPoW implementation.
//!
//! The crate covers the epoch parameters, the cache builder, the dataset item
//! deriver and the two hash drivers (classic hashimoto and ProgPoW), each
//! usable in light mode (dataset items derived from the cache on demand) or
//! full mode (a materialized dataset). Both modes produce identical results.

// The reference algorithm used is from https://github.com/ethereum/wiki/wiki/Ethash

mod dag;
mod dataset;
mod epoch;
mod error;
mod miller_rabin;
mod node;
pub mod progpow;

use std::time::Instant;

use byteorder::{ByteOrder, LittleEndian};
use ethereum_types::{H256, U256};
use sha3::{Digest, Keccak256, Keccak512};
use tracing::debug;

pub use crate::dag::{FullDAG, LightDAG};
pub use crate::dataset::{make_dataset, Dataset, DatasetView};
pub use crate::epoch::{
    epoch_of, get_cache_size, get_full_size, get_seedhash, EpochParams, CACHE_BYTES_GROWTH,
    CACHE_BYTES_INIT, DATASET_BYTES_GROWTH, DATASET_BYTES_INIT, EPOCH_LENGTH, MAX_EPOCH,
};
pub use crate::error::{Error, Result};
pub use crate::miller_rabin::is_prime;
pub use crate::node::Node;

pub const HASH_BYTES: usize = 64;
pub const WORD_BYTES: usize = 4;
pub const NODE_WORDS: usize = HASH_BYTES / WORD_BYTES;
pub const MIX_BYTES: usize = 128;
pub const MIX_WORDS: usize = MIX_BYTES / WORD_BYTES;
pub const MIX_NODES: usize = MIX_BYTES / HASH_BYTES;
pub const DATASET_PARENTS: usize = 256;
pub const CACHE_ROUNDS: usize = 3;
pub const ACCESSES: usize = 64;

pub const FNV_PRIME: u32 = 0x01000193;

#[inline]
pub fn fnv(v1: u32, v2: u32) -> u32 {
    v1.wrapping_mul(FNV_PRIME) ^ v2
}

/// Folds `data` into `mix` word by word.
#[inline]
pub fn fnv_mix(mix: &mut [u32], data: &[u32]) {
    for (m, d) in mix.iter_mut().zip(data.iter()) {
        *m = fnv(*m, *d);
    }
}

pub fn keccak_512(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Keccak512::digest(data));
    out
}

pub fn keccak_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Make an Ethash cache using the given seed.
///
/// The length of `cache` picks the number of nodes and must be a non-zero
/// multiple of `HASH_BYTES`.
pub fn make_cache(cache: &mut [u8], seed: H256) -> Result<()> {
    if cache.is_empty() || cache.len() % HASH_BYTES != 0 {
        return Err(Error::InvalidCacheSize(cache.len()));
    }
    let n = cache.len() / HASH_BYTES;
    let started = Instant::now();
    debug!(nodes = n, "building cache");

    cache[..HASH_BYTES].copy_from_slice(&keccak_512(seed.as_bytes()));
    for i in 1..n {
        let (last, next) = cache.split_at_mut(i * HASH_BYTES);
        next[..HASH_BYTES].copy_from_slice(&keccak_512(&last[(i - 1) * HASH_BYTES..]));
    }

    // Each round rewrites the cache in place, so later nodes see earlier
    // nodes of the same round.
    for _ in 0..CACHE_ROUNDS {
        for i in 0..n {
            let v = LittleEndian::read_u32(&cache[i * HASH_BYTES..]) as usize % n;
            let prev = (i + n - 1) % n;
            let mut r = [0u8; HASH_BYTES];
            for (j, b) in r.iter_mut().enumerate() {
                *b = cache[prev * HASH_BYTES + j] ^ cache[v * HASH_BYTES + j];
            }
            cache[i * HASH_BYTES..(i + 1) * HASH_BYTES].copy_from_slice(&keccak_512(&r));
        }
    }

    debug!(nodes = n, elapsed = ?started.elapsed(), "cache built");
    Ok(())
}

/// Derive dataset item `i` from the cache.
///
/// `cache` must be a non-empty multiple of `HASH_BYTES`; every public entry
/// point checks that before calling in here.
pub fn calc_dataset_item(cache: &[u8], i: usize) -> Node {
    let n = cache.len() / HASH_BYTES;
    let mut mix = Node::from_slice(&cache[(i % n) * HASH_BYTES..]);
    mix.set_word(0, mix.word(0) ^ i as u32);
    let mut words = mix.keccak_512().words();

    for j in 0..DATASET_PARENTS {
        let parent = fnv((i ^ j) as u32, words[j % NODE_WORDS]) as usize % n;
        let parent = Node::from_slice(&cache[parent * HASH_BYTES..]);
        fnv_mix(&mut words, &parent.words());
    }

    Node::from_words(&words).keccak_512()
}

/// Output of one hash call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HashResult {
    /// Compared against the difficulty boundary.
    pub result: H256,
    /// Published with the nonce so verifiers can take the quick path.
    pub mix_hash: H256,
}

fn seed_hash(header: H256, nonce: u64) -> [u8; 64] {
    let mut buf = [0u8; 40];
    buf[..32].copy_from_slice(header.as_bytes());
    LittleEndian::write_u64(&mut buf[32..], nonce);
    keccak_512(&buf)
}

fn final_hash(seed: &[u8; 64], mix_hash: &[u8; 32]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(seed);
    hasher.update(mix_hash);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    H256(out)
}

/// "Main" function of Ethash, calculating the mix digest and result given the
/// header and nonce.
///
/// `lookup` returns dataset node `i`, either read from memory or derived
/// from the cache.
pub(crate) fn hashimoto<F: Fn(usize) -> Node>(
    header: H256,
    nonce: u64,
    full_size: usize,
    lookup: F,
) -> HashResult {
    let pages = (full_size / MIX_BYTES) as u32;
    let seed = seed_hash(header, nonce);
    let seed_words = Node::from_bytes(seed).words();
    let seed_head = seed_words[0];

    let mut mix = [0u32; MIX_WORDS];
    for (i, w) in mix.iter_mut().enumerate() {
        *w = seed_words[i % NODE_WORDS];
    }

    for i in 0..ACCESSES {
        let p = (fnv(i as u32 ^ seed_head, mix[i % MIX_WORDS]) % pages) as usize;
        for j in 0..MIX_NODES {
            let node = lookup(p * MIX_NODES + j);
            fnv_mix(&mut mix[j * NODE_WORDS..(j + 1) * NODE_WORDS], &node.words());
        }
    }

    let mut cmix = [0u32; MIX_WORDS / 4];
    for (i, c) in cmix.iter_mut().enumerate() {
        let m = &mix[i * 4..i * 4 + 4];
        *c = fnv(fnv(fnv(m[0], m[1]), m[2]), m[3]);
    }
    let mut mix_hash = [0u8; 32];
    LittleEndian::write_u32_into(&cmix, &mut mix_hash);

    HashResult {
        result: final_hash(&seed, &mix_hash),
        mix_hash: H256(mix_hash),
    }
}

/// Run the classic driver over either kind of dataset view.
pub fn hashimoto_view(
    view: &DatasetView<'_>,
    header: H256,
    nonce: u64,
    full_size: usize,
) -> Result<HashResult> {
    view.validate(full_size)?;
    Ok(match *view {
        DatasetView::Materialized(dataset) => hashimoto(header, nonce, full_size, |i| {
            Node::from_slice(&dataset[i * HASH_BYTES..])
        }),
        DatasetView::CacheOnly(cache) => {
            hashimoto(header, nonce, full_size, |i| calc_dataset_item(cache, i))
        }
    })
}

/// Ethash used by a light client. Only stores the 16MB cache rather than the
/// full dataset.
pub fn hashimoto_light(
    header: H256,
    nonce: u64,
    full_size: usize,
    cache: &[u8],
) -> Result<HashResult> {
    hashimoto_view(&DatasetView::CacheOnly(cache), header, nonce, full_size)
}

/// Ethash used by a full client. Stores the whole dataset in memory.
pub fn hashimoto_full(
    header: H256,
    nonce: u64,
    full_size: usize,
    dataset: &[u8],
) -> Result<HashResult> {
    hashimoto_view(&DatasetView::Materialized(dataset), header, nonce, full_size)
}

/// Recompute `result` from a claimed mix digest without touching the dataset.
pub fn quick_hash(header: H256, nonce: u64, mix_hash: H256) -> H256 {
    let mut mix = [0u8; 32];
    mix.copy_from_slice(mix_hash.as_bytes());
    final_hash(&seed_hash(header, nonce), &mix)
}

pub fn quick_check_difficulty(header: H256, nonce: u64, mix_hash: H256, boundary: H256) -> bool {
    check_difficulty(&quick_hash(header, nonce, mix_hash), &boundary)
}

/// Both values are big-endian 256-bit integers.
pub fn check_difficulty(hash: &H256, boundary: &H256) -> bool {
    U256::from_big_endian(hash.as_bytes()) <= U256::from_big_endian(boundary.as_bytes())
}

/// `2^256 / difficulty`, saturating to `U256::MAX` for a difficulty of 0 or 1.
pub fn boundary_from_difficulty(difficulty: U256) -> U256 {
    if difficulty <= U256::one() {
        return U256::MAX;
    }
    let (q, r) = U256::MAX.div_mod(difficulty);
    if r + U256::one() == difficulty {
        q + U256::one()
    } else {
        q
    }
}

pub fn boundary_to_hash(boundary: U256) -> H256 {
    let mut out = [0u8; 32];
    boundary.to_big_endian(&mut out);
    H256(out)
}
