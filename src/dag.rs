use std::ops::ControlFlow;

use ethereum_types::H256;
use tracing::debug;

use crate::dataset::{alloc_zeroed, check_full_size, Dataset, DatasetView};
use crate::epoch::{epoch_of, EpochParams};
use crate::error::{Error, Result};
use crate::progpow::{self, L1Cache};
use crate::{check_difficulty, quick_check_difficulty, HashResult, Node};

/// Everything a light client keeps for one epoch: the cache, and the
/// ProgPoW low-latency cache derived from it.
#[derive(Debug, Clone)]
pub struct LightDAG {
    params: EpochParams,
    cache: Vec<u8>,
    l1: Option<L1Cache>,
}

impl LightDAG {
    /// Build the cache for the epoch containing block `number`.
    pub fn new(number: u64) -> Result<Self> {
        Self::with_params(EpochParams::for_block(number)?)
    }

    /// Build a cache with explicit sizes, bypassing the epoch schedule.
    pub fn with_sizes(
        epoch: usize,
        cache_size: usize,
        full_size: usize,
        seed: H256,
    ) -> Result<Self> {
        Self::with_params(EpochParams {
            epoch,
            cache_size,
            full_size,
            seed,
        })
    }

    pub fn with_params(params: EpochParams) -> Result<Self> {
        check_full_size(params.full_size)?;
        let mut cache = alloc_zeroed(params.cache_size)?;
        crate::make_cache(&mut cache, params.seed)?;

        // Datasets too small for ProgPoW can still serve the classic driver.
        let view = DatasetView::CacheOnly(&cache);
        let l1 = L1Cache::build(&view, params.full_size).ok();
        debug!(epoch = params.epoch, progpow = l1.is_some(), "light dag ready");

        Ok(Self { params, cache, l1 })
    }

    pub fn params(&self) -> &EpochParams {
        &self.params
    }

    pub fn epoch(&self) -> usize {
        self.params.epoch
    }

    pub fn cache(&self) -> &[u8] {
        &self.cache
    }

    pub fn cache_size(&self) -> usize {
        self.params.cache_size
    }

    pub fn full_size(&self) -> usize {
        self.params.full_size
    }

    pub fn is_valid_for(&self, number: u64) -> bool {
        epoch_of(number) == self.params.epoch
    }

    pub fn view(&self) -> DatasetView<'_> {
        DatasetView::CacheOnly(&self.cache)
    }

    pub fn calc_dataset_item(&self, i: usize) -> Node {
        crate::calc_dataset_item(&self.cache, i)
    }

    pub fn hashimoto(&self, header: H256, nonce: u64) -> HashResult {
        crate::hashimoto(header, nonce, self.params.full_size, |i| {
            crate::calc_dataset_item(&self.cache, i)
        })
    }

    pub fn progpow(&self, number: u64, header: H256, nonce: u64) -> Result<HashResult> {
        let l1 = self.l1_for(number)?;
        progpow::hash_with_l1(&self.view(), l1, self.params.full_size, number, header, nonce)
    }

    /// Check a sealed nonce. The quick hash filters out bad boundaries and
    /// forged mix digests before the full light recomputation.
    pub fn verify(&self, header: H256, nonce: u64, mix_hash: H256, boundary: H256) -> bool {
        if !quick_check_difficulty(header, nonce, mix_hash, boundary) {
            return false;
        }
        let out = self.hashimoto(header, nonce);
        out.mix_hash == mix_hash && check_difficulty(&out.result, &boundary)
    }

    /// ProgPoW counterpart of `verify`. Errors only when this context cannot
    /// hash block `number` at all.
    pub fn verify_progpow(
        &self,
        number: u64,
        header: H256,
        nonce: u64,
        mix_hash: H256,
        boundary: H256,
    ) -> Result<bool> {
        let l1 = self.l1_for(number)?;
        if !check_difficulty(&progpow::quick_hash(header, nonce, mix_hash), &boundary) {
            return Ok(false);
        }
        let full_size = self.params.full_size;
        let out = progpow::hash_with_l1(&self.view(), l1, full_size, number, header, nonce)?;
        Ok(out.mix_hash == mix_hash && check_difficulty(&out.result, &boundary))
    }

    fn l1_for(&self, number: u64) -> Result<&L1Cache> {
        if !self.is_valid_for(number) {
            return Err(Error::EpochMismatch {
                number,
                epoch: self.params.epoch,
            });
        }
        self.l1
            .as_ref()
            .ok_or(Error::ProgPowDatasetTooSmall(self.params.full_size))
    }
}

/// A light context plus its materialized dataset.
#[derive(Debug, Clone)]
pub struct FullDAG {
    light: LightDAG,
    dataset: Dataset,
}

impl FullDAG {
    pub fn new(light: LightDAG) -> Result<Self> {
        Self::with_progress(light, |_| ControlFlow::Continue(()))
    }

    /// Materialize the dataset, reporting progress in percent. Returning
    /// `Break` from `progress` aborts with `Error::Aborted`.
    pub fn with_progress<P>(light: LightDAG, progress: P) -> Result<Self>
    where
        P: FnMut(usize) -> ControlFlow<()>,
    {
        let dataset = Dataset::generate(&light.cache, light.params.full_size, progress)?;
        Ok(Self { light, dataset })
    }

    pub fn light(&self) -> &LightDAG {
        &self.light
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn epoch(&self) -> usize {
        self.light.epoch()
    }

    pub fn full_size(&self) -> usize {
        self.light.full_size()
    }

    pub fn view(&self) -> DatasetView<'_> {
        self.dataset.view()
    }

    pub fn hashimoto(&self, header: H256, nonce: u64) -> HashResult {
        crate::hashimoto(header, nonce, self.full_size(), |i| self.dataset.item(i))
    }

    pub fn progpow(&self, number: u64, header: H256, nonce: u64) -> Result<HashResult> {
        let l1 = self.light.l1_for(number)?;
        progpow::hash_with_l1(&self.view(), l1, self.full_size(), number, header, nonce)
    }

    /// Scan up to `max_attempts` nonces from `start_nonce` with the classic
    /// driver, returning the first that meets `boundary`.
    pub fn search(
        &self,
        header: H256,
        start_nonce: u64,
        boundary: H256,
        max_attempts: u64,
    ) -> Option<(u64, HashResult)> {
        let mut nonce = start_nonce;
        for _ in 0..max_attempts {
            let out = self.hashimoto(header, nonce);
            if check_difficulty(&out.result, &boundary) {
                return Some((nonce, out));
            }
            nonce = nonce.wrapping_add(1);
        }
        None
    }
}
