//! Expanding-window k-nearest search over bin-bucketed features.
//!
//! Works against any [`BinnedSource`]: the on-disk window index or the
//! in-memory [`MemoryBins`] equivalent. Results are groups of features at
//! the same distance, never a truncated flat list, so ties are always
//! returned together.

use std::collections::HashSet;

use crate::error::Error;
use crate::feature::{FeatureType, GenomicFeature};
use crate::region::GenomicRegion;
use crate::store::decode_granularity;
use crate::store::window_index::bin_of;

/// A bin-bucketed collection of addressable gene subtrees.
pub trait BinnedSource {
    /// Spatial bin width in base pairs.
    fn window_size(&self) -> u32;

    /// Number of bins covered by this source.
    fn bin_count(&self) -> u32;

    /// Addresses listed in one bin; empty for out-of-range bins.
    fn bin_addresses(&mut self, bin: u32) -> Result<Vec<u32>, Error>;

    /// Materialize the subtree at `address` at the requested granularity.
    fn decode_at(
        &mut self,
        address: u32,
        granularity: FeatureType,
    ) -> Result<Vec<GenomicFeature>, Error>;
}

/// Features sharing one distance from the query region.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceGroup {
    pub distance: u32,
    pub features: Vec<GenomicFeature>,
}

/// Distance measure between a query region and a candidate feature.
pub type DistanceFn = fn(&GenomicRegion, &GenomicFeature) -> u32;

/// Distance from the region midpoint to the feature's transcription-anchored
/// start (`start` on the sense strand, `end` on the antisense strand).
#[must_use]
pub fn anchored_distance(region: &GenomicRegion, feature: &GenomicFeature) -> u32 {
    region.midpoint().abs_diff(feature.anchored_start())
}

/// Distance from the region midpoint to the feature span; zero when the
/// midpoint falls inside the feature.
#[must_use]
pub fn span_distance(region: &GenomicRegion, feature: &GenomicFeature) -> u32 {
    region.distance_to_span(feature.start, feature.end)
}

/// Find the `n` nearest distance groups around `region`.
///
/// Starts with the bin range containing the region and widens symmetrically
/// one bin per side until `n` distinct distances were seen or the source's
/// full bin range is exhausted, then returns the `n` smallest groups in
/// ascending distance order. Addresses are decoded at most once across
/// widenings.
pub fn nearest_k<S: BinnedSource>(
    source: &mut S,
    region: &GenomicRegion,
    n: usize,
    type_filter: Option<FeatureType>,
    distance: DistanceFn,
) -> Result<Vec<DistanceGroup>, Error> {
    let bin_count = source.bin_count();
    if bin_count == 0 || n == 0 {
        return Ok(Vec::new());
    }
    let max_bin = bin_count - 1;
    let window_size = source.window_size();
    let granularity = decode_granularity(type_filter);

    let mut lo = bin_of(region.start, window_size).min(max_bin);
    let mut hi = bin_of(region.end, window_size).min(max_bin);
    let mut seen: HashSet<u32> = HashSet::new();
    let mut groups: Vec<DistanceGroup> = Vec::new();

    loop {
        for bin in lo..=hi {
            for address in source.bin_addresses(bin)? {
                if !seen.insert(address) {
                    continue;
                }
                for feature in source.decode_at(address, granularity)? {
                    if type_filter.is_some_and(|t| feature.feature_type() != t) {
                        continue;
                    }
                    let d = distance(region, &feature);
                    match groups.iter().position(|g| g.distance == d) {
                        Some(i) => groups[i].features.push(feature),
                        None => groups.push(DistanceGroup {
                            distance: d,
                            features: vec![feature],
                        }),
                    }
                }
            }
        }

        if groups.len() >= n || (lo == 0 && hi == max_bin) {
            break;
        }
        lo = lo.saturating_sub(1);
        hi = (hi + 1).min(max_bin);
    }

    groups.sort_by_key(|g| g.distance);
    groups.truncate(n);
    Ok(groups)
}

/// In-memory bin-bucketed feature collection.
///
/// Addresses are indices into the backing vector; gene subtrees are
/// materialized by cloning instead of decoding.
pub struct MemoryBins {
    window_size: u32,
    bin_count: u32,
    bins: Vec<Vec<u32>>,
    genes: Vec<GenomicFeature>,
}

impl MemoryBins {
    pub fn new(window_size: u32, genes: Vec<GenomicFeature>) -> Result<Self, Error> {
        if window_size == 0 {
            return Err(Error::Validation("window size must be non-zero".to_string()));
        }
        let bin_count = genes
            .iter()
            .map(|g| bin_of(g.end, window_size) + 1)
            .max()
            .unwrap_or(0);

        let mut bins = vec![Vec::new(); bin_count as usize];
        for (index, gene) in genes.iter().enumerate() {
            let address = u32::try_from(index).map_err(|_| {
                Error::Validation(format!("feature index {index} exceeds u32 address space"))
            })?;
            for bin in bin_of(gene.start, window_size)..=bin_of(gene.end, window_size) {
                bins[bin as usize].push(address);
            }
        }

        Ok(Self {
            window_size,
            bin_count,
            bins,
            genes,
        })
    }
}

impl BinnedSource for MemoryBins {
    fn window_size(&self) -> u32 {
        self.window_size
    }

    fn bin_count(&self) -> u32 {
        self.bin_count
    }

    fn bin_addresses(&mut self, bin: u32) -> Result<Vec<u32>, Error> {
        Ok(self
            .bins
            .get(bin as usize)
            .cloned()
            .unwrap_or_default())
    }

    fn decode_at(
        &mut self,
        address: u32,
        granularity: FeatureType,
    ) -> Result<Vec<GenomicFeature>, Error> {
        let gene = self.genes.get(address as usize).ok_or_else(|| {
            Error::Format(format!("unknown in-memory feature address {address}"))
        })?;
        Ok(gene.at_depth(granularity))
    }
}
