use std::ops::ControlFlow;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::{calc_dataset_item, Node, HASH_BYTES, MIX_BYTES};

/// Where dataset nodes come from during one hash call.
#[derive(Debug, Clone, Copy)]
pub enum DatasetView<'a> {
    /// Every node already computed, laid out back to back.
    Materialized(&'a [u8]),
    /// Only the cache; nodes are derived on each access.
    CacheOnly(&'a [u8]),
}

impl<'a> DatasetView<'a> {
    /// Dataset node `i`. Call `validate` first.
    pub fn item(&self, i: usize) -> Node {
        match *self {
            DatasetView::Materialized(dataset) => Node::from_slice(&dataset[i * HASH_BYTES..]),
            DatasetView::CacheOnly(cache) => calc_dataset_item(cache, i),
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, DatasetView::Materialized(_))
    }

    /// Checks that every node below `full_size` can be served.
    pub fn validate(&self, full_size: usize) -> Result<()> {
        check_full_size(full_size)?;
        match *self {
            DatasetView::Materialized(dataset) if dataset.len() < full_size => {
                Err(Error::DatasetTooShort {
                    expected: full_size,
                    actual: dataset.len(),
                })
            }
            DatasetView::Materialized(_) => Ok(()),
            DatasetView::CacheOnly(cache) => check_cache_size(cache.len()),
        }
    }
}

pub(crate) fn check_cache_size(len: usize) -> Result<()> {
    if len == 0 || len % HASH_BYTES != 0 {
        return Err(Error::InvalidCacheSize(len));
    }
    Ok(())
}

pub(crate) fn check_full_size(len: usize) -> Result<()> {
    if len == 0 || len % MIX_BYTES != 0 {
        return Err(Error::InvalidDatasetSize(len));
    }
    Ok(())
}

/// A zeroed buffer, or `Error::Allocation` if the memory is not available.
pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::Allocation(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Make an Ethash dataset using the given cache.
pub fn make_dataset(dataset: &mut [u8], cache: &[u8]) -> Result<()> {
    fill(dataset, cache, |_| ControlFlow::Continue(()))
}

#[cfg(feature = "parallel")]
fn fill_batch(batch: &mut [u8], cache: &[u8], first: usize) {
    use rayon::prelude::*;

    batch
        .par_chunks_mut(HASH_BYTES)
        .enumerate()
        .for_each(|(k, out)| out.copy_from_slice(calc_dataset_item(cache, first + k).as_bytes()));
}

#[cfg(not(feature = "parallel"))]
fn fill_batch(batch: &mut [u8], cache: &[u8], first: usize) {
    for (k, out) in batch.chunks_mut(HASH_BYTES).enumerate() {
        out.copy_from_slice(calc_dataset_item(cache, first + k).as_bytes());
    }
}

fn fill<P>(dataset: &mut [u8], cache: &[u8], mut progress: P) -> Result<()>
where
    P: FnMut(usize) -> ControlFlow<()>,
{
    check_full_size(dataset.len())?;
    check_cache_size(cache.len())?;

    let items = dataset.len() / HASH_BYTES;
    let batch_items = (items + 99) / 100;
    let started = Instant::now();
    debug!(items, batch_items, "materializing dataset");

    for (b, batch) in dataset.chunks_mut(batch_items * HASH_BYTES).enumerate() {
        let first = b * batch_items;
        fill_batch(batch, cache, first);

        let done = first + batch.len() / HASH_BYTES;
        let percent = done * 100 / items;
        trace!(done, items, percent, "dataset batch complete");
        if progress(percent).is_break() {
            warn!(percent, "dataset generation aborted");
            return Err(Error::Aborted { percent });
        }
    }

    debug!(items, elapsed = ?started.elapsed(), "dataset materialized");
    Ok(())
}

/// An owned, fully materialized dataset.
///
/// Only ever constructed complete: an aborted or failed build returns an
/// error and drops the partial buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Dataset {
    data: Vec<u8>,
}

impl Dataset {
    /// Derive every node of a `full_size` byte dataset from `cache`.
    ///
    /// `progress` is called after each batch of roughly one percent of the
    /// nodes with the completed percentage; returning `Break` aborts.
    pub fn generate<P>(cache: &[u8], full_size: usize, progress: P) -> Result<Self>
    where
        P: FnMut(usize) -> ControlFlow<()>,
    {
        check_full_size(full_size)?;
        check_cache_size(cache.len())?;

        let mut data = alloc_zeroed(full_size)?;
        fill(&mut data, cache, progress)?;
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn item(&self, i: usize) -> Node {
        Node::from_slice(&self.data[i * HASH_BYTES..])
    }

    pub fn view(&self) -> DatasetView<'_> {
        DatasetView::Materialized(&self.data)
    }
}

impl AsRef<[u8]> for Dataset {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl core::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dataset").field("len", &self.data.len()).finish()
    }
}
