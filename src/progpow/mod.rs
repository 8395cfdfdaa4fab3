//! ProgPoW, the programmatic variant of Ethash.
//!
//! The fixed accumulation loop is replaced by a program that changes every
//! `PERIOD` blocks. Sixteen lanes of thirty-two registers run the program in
//! lockstep, mixing in words from a small low-latency cache (the first
//! `CACHE_BYTES` of the dataset) and, once per outer iteration, one 256-byte
//! dataset item. The dataset and its derivation are the ones Ethash uses, so
//! the same cache serves both drivers.

mod keccak_f800;
mod kiss99;
mod program;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ethereum_types::H256;
use tracing::trace;

use crate::dataset::DatasetView;
use crate::error::{Error, Result};
use crate::{calc_dataset_item, HashResult, Node, FNV_PRIME, HASH_BYTES, NODE_WORDS, WORD_BYTES};

pub use self::keccak_f800::{keccak_f800, ROUNDS as KECCAK_ROUNDS};
pub use self::kiss99::Kiss99;
pub use self::program::{math, merge, MathOp, MergeOp, MixRngState};

/// Blocks sharing one program.
pub const PERIOD: u64 = 50;
pub const LANES: usize = 16;
pub const REGS: usize = 32;
/// Dataset words each lane consumes per outer iteration.
pub const DAG_LOADS: usize = 4;
pub const CACHE_BYTES: usize = 16 * 1024;
pub const CACHE_WORDS: usize = CACHE_BYTES / WORD_BYTES;
pub const CNT_DAG: usize = 64;
pub const CNT_CACHE: usize = 12;
pub const CNT_MATH: usize = 20;

/// Bytes of dataset read per outer iteration, shared across all lanes.
pub const ITEM_BYTES: usize = LANES * DAG_LOADS * WORD_BYTES;
const ITEM_WORDS: usize = ITEM_BYTES / WORD_BYTES;
const ITEM_NODES: usize = ITEM_BYTES / HASH_BYTES;

const MAX_OPERATIONS: usize = if CNT_CACHE > CNT_MATH { CNT_CACHE } else { CNT_MATH };

pub const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;

#[inline]
pub fn fnv1a(h: u32, d: u32) -> u32 {
    (h ^ d).wrapping_mul(FNV_PRIME)
}

pub fn prog_seed(block_number: u64) -> u64 {
    block_number / PERIOD
}

/// Keccak-f[800] over the header, a 64-bit seed and a 256-bit digest.
pub fn keccak_progpow_256(header: H256, nonce: u64, digest: H256) -> H256 {
    let mut st = [0u32; 25];
    LittleEndian::read_u32_into(header.as_bytes(), &mut st[..8]);
    st[8] = nonce as u32;
    st[9] = (nonce >> 32) as u32;
    LittleEndian::read_u32_into(digest.as_bytes(), &mut st[10..18]);

    keccak_f800(&mut st);

    let mut out = [0u8; 32];
    LittleEndian::write_u32_into(&st[..8], &mut out);
    H256(out)
}

/// The 64-bit seed every lane is expanded from.
pub fn keccak_progpow_64(header: H256, nonce: u64) -> u64 {
    let h = keccak_progpow_256(header, nonce, H256::zero());
    BigEndian::read_u64(&h.as_bytes()[..8])
}

/// Recompute `result` from a claimed mix digest without touching the dataset.
pub fn quick_hash(header: H256, nonce: u64, mix_hash: H256) -> H256 {
    keccak_progpow_256(header, keccak_progpow_64(header, nonce), mix_hash)
}

type Mix = [[u32; REGS]; LANES];

fn init_mix(seed: u64) -> Mix {
    let z = fnv1a(FNV_OFFSET_BASIS, seed as u32);
    let w = fnv1a(z, (seed >> 32) as u32);

    let mut mix = [[0u32; REGS]; LANES];
    for (l, regs) in mix.iter_mut().enumerate() {
        let jsr = fnv1a(w, l as u32);
        let jcong = fnv1a(jsr, l as u32);
        let mut rng = Kiss99::new(z, w, jsr, jcong);
        for reg in regs.iter_mut() {
            *reg = rng.next_u32();
        }
    }
    mix
}

/// The low-latency cache: the first `CACHE_BYTES` of the dataset as words.
#[derive(Clone, PartialEq, Eq)]
pub struct L1Cache {
    words: Vec<u32>,
}

impl L1Cache {
    pub fn build(view: &DatasetView<'_>, full_size: usize) -> Result<Self> {
        check_sizes(view, full_size)?;
        Ok(Self::from_lookup(|i| view.item(i)))
    }

    fn from_lookup<F: Fn(usize) -> Node>(lookup: F) -> Self {
        let mut words = vec![0u32; CACHE_WORDS];
        for (i, chunk) in words.chunks_mut(NODE_WORDS).enumerate() {
            chunk.copy_from_slice(&lookup(i).words());
        }
        trace!(words = CACHE_WORDS, "progpow l1 cache built");
        Self { words }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl core::fmt::Debug for L1Cache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("L1Cache").field("words", &self.words.len()).finish()
    }
}

fn check_sizes(view: &DatasetView<'_>, full_size: usize) -> Result<()> {
    view.validate(full_size)?;
    if full_size < CACHE_BYTES {
        return Err(Error::ProgPowDatasetTooSmall(full_size));
    }
    Ok(())
}

fn round<F: Fn(usize) -> Node>(
    l1: &[u32],
    num_items: u32,
    r: usize,
    mix: &mut Mix,
    mut state: MixRngState,
    lookup: &F,
) {
    let item_index = (mix[r % LANES][0] % num_items) as usize;
    let mut item = [0u32; ITEM_WORDS];
    for (k, chunk) in item.chunks_mut(NODE_WORDS).enumerate() {
        chunk.copy_from_slice(&lookup(item_index * ITEM_NODES + k).words());
    }

    for i in 0..MAX_OPERATIONS {
        if i < CNT_CACHE {
            let src = state.next_src();
            let dst = state.next_dst();
            let op = MergeOp::from_selector(state.rng());
            for regs in mix.iter_mut() {
                let data = l1[regs[src] as usize % CACHE_WORDS];
                regs[dst] = op.apply(regs[dst], data);
            }
        }
        if i < CNT_MATH {
            let (src1, src2) = state.src_pair();
            let math = MathOp::from_selector(state.rng());
            let dst = state.next_dst();
            let op = MergeOp::from_selector(state.rng());
            for regs in mix.iter_mut() {
                let data = math.apply(regs[src1], regs[src2]);
                regs[dst] = op.apply(regs[dst], data);
            }
        }
    }

    // The dataset words land last so their latency can hide behind the math.
    let mut dsts = [0usize; DAG_LOADS];
    let mut ops = [MergeOp::MulAdd; DAG_LOADS];
    for i in 0..DAG_LOADS {
        dsts[i] = if i == 0 { 0 } else { state.next_dst() };
        ops[i] = MergeOp::from_selector(state.rng());
    }
    for (l, regs) in mix.iter_mut().enumerate() {
        let offset = ((l ^ r) % LANES) * DAG_LOADS;
        for i in 0..DAG_LOADS {
            regs[dsts[i]] = ops[i].apply(regs[dsts[i]], item[offset + i]);
        }
    }
}

fn hash_mix<F: Fn(usize) -> Node>(
    l1: &[u32],
    full_size: usize,
    block_number: u64,
    seed: u64,
    lookup: F,
) -> H256 {
    let num_items = (full_size / ITEM_BYTES) as u32;
    let mut mix = init_mix(seed);
    let state = MixRngState::new(prog_seed(block_number));

    for r in 0..CNT_DAG {
        round(l1, num_items, r, &mut mix, state.clone(), &lookup);
    }

    let mut digest = [FNV_OFFSET_BASIS; 8];
    for (l, regs) in mix.iter().enumerate() {
        let lane_hash = regs.iter().fold(FNV_OFFSET_BASIS, |h, &v| fnv1a(h, v));
        digest[l % 8] = fnv1a(digest[l % 8], lane_hash);
    }

    let mut out = [0u8; 32];
    LittleEndian::write_u32_into(&digest, &mut out);
    H256(out)
}

/// Run ProgPoW with an already built low-latency cache.
///
/// `l1` must come from the same dataset `view` refers to.
pub fn hash_with_l1(
    view: &DatasetView<'_>,
    l1: &L1Cache,
    full_size: usize,
    block_number: u64,
    header: H256,
    nonce: u64,
) -> Result<HashResult> {
    check_sizes(view, full_size)?;
    let seed = keccak_progpow_64(header, nonce);
    let l1 = l1.words();

    let mix_hash = match *view {
        DatasetView::Materialized(dataset) => hash_mix(l1, full_size, block_number, seed, |i| {
            Node::from_slice(&dataset[i * HASH_BYTES..])
        }),
        DatasetView::CacheOnly(cache) => {
            hash_mix(l1, full_size, block_number, seed, |i| calc_dataset_item(cache, i))
        }
    };

    Ok(HashResult {
        result: keccak_progpow_256(header, seed, mix_hash),
        mix_hash,
    })
}

pub fn progpow_view(
    view: &DatasetView<'_>,
    full_size: usize,
    block_number: u64,
    header: H256,
    nonce: u64,
) -> Result<HashResult> {
    let l1 = L1Cache::build(view, full_size)?;
    hash_with_l1(view, &l1, full_size, block_number, header, nonce)
}

/// ProgPoW from the cache alone. Rebuilds the low-latency cache on every
/// call; keep a `LightDAG` around to amortize it.
pub fn progpow_light(
    cache: &[u8],
    full_size: usize,
    block_number: u64,
    header: H256,
    nonce: u64,
) -> Result<HashResult> {
    progpow_view(&DatasetView::CacheOnly(cache), full_size, block_number, header, nonce)
}

pub fn progpow_full(
    dataset: &[u8],
    full_size: usize,
    block_number: u64,
    header: H256,
    nonce: u64,
) -> Result<HashResult> {
    progpow_view(&DatasetView::Materialized(dataset), full_size, block_number, header, nonce)
}
