//! Window-indexed companion file: fixed-width spatial bins over one
//! chromosome's gene subtrees.
//!
//! Layout: header, bin-address table (one u32 per bin, 0 when the bin is
//! empty), encoded gene subtrees, then the bin list blobs
//! `{count: u32, addresses: u32[count]}`. A gene spanning several bins is
//! listed in each of them; readers deduplicate by address before decoding.

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Error;
use crate::feature::{FeatureType, GenomicFeature};
use crate::region::GenomicRegion;
use crate::store::binary_io::{BinaryRead, BinaryWrite};
use crate::store::decode_granularity;
use crate::store::entity_tree::EntityTreeCodec;
use crate::store::header::{WindowHeader, BIN_TABLE_OFFSET};
use crate::store::nearest::{anchored_distance, nearest_k, span_distance, BinnedSource, DistanceGroup};
use crate::store::string_pool::checked_address;

/// Bin index of a coordinate for the given window size.
#[must_use]
pub(super) fn bin_of(coord: i32, window_size: u32) -> u32 {
    (coord.max(0) as u32) / window_size
}

/// Writes a window-indexed file for one chromosome.
pub struct WindowIndexWriter;

impl WindowIndexWriter {
    /// Write a complete window file.
    ///
    /// All genes must lie on a single chromosome. Bin count is derived from
    /// the furthest feature end.
    pub fn write<W: Write + Seek>(
        writer: &mut W,
        window_size: u32,
        genes: &[GenomicFeature],
    ) -> Result<(), Error> {
        if window_size == 0 {
            return Err(Error::Validation("window size must be non-zero".to_string()));
        }
        if let Some(first) = genes.first() {
            if let Some(stray) = genes.iter().find(|g| g.chromosome() != first.chromosome()) {
                return Err(Error::Validation(format!(
                    "window file covers one chromosome: got '{}' and '{}'",
                    first.chromosome(),
                    stray.chromosome()
                )));
            }
        }

        let bin_count = genes
            .iter()
            .map(|g| bin_of(g.end, window_size) + 1)
            .max()
            .unwrap_or(0);

        WindowHeader {
            window_size,
            bin_count,
        }
        .write(writer)?;

        // Placeholder table, backpatched once the blob addresses are known.
        for _ in 0..bin_count {
            writer.write_u32(0)?;
        }

        let mut bins: Vec<Vec<u32>> = vec![Vec::new(); bin_count as usize];
        for gene in genes {
            let address = EntityTreeCodec::encode(writer, gene)?;
            for bin in bin_of(gene.start, window_size)..=bin_of(gene.end, window_size) {
                bins[bin as usize].push(address);
            }
        }

        let mut table = vec![0u32; bin_count as usize];
        for (bin, addresses) in bins.iter().enumerate() {
            if addresses.is_empty() {
                continue;
            }
            table[bin] = checked_address(writer.stream_position()?)?;
            writer.write_u32(u32::try_from(addresses.len()).map_err(|_| {
                Error::Validation(format!("bin {bin} address count exceeds u32::MAX"))
            })?)?;
            for &address in addresses {
                writer.write_u32(address)?;
            }
        }

        writer.seek(SeekFrom::Start(BIN_TABLE_OFFSET))?;
        for address in table {
            writer.write_u32(address)?;
        }
        writer.seek(SeekFrom::End(0))?;

        Ok(())
    }
}

/// Reader over a window-indexed file.
pub struct WindowIndex<R> {
    handle: R,
    window_size: u32,
    bin_count: u32,
}

impl<R: Read + Seek> WindowIndex<R> {
    /// Open a window file, validating its header.
    pub fn open(mut handle: R) -> Result<Self, Error> {
        handle.seek(SeekFrom::Start(0))?;
        let header = WindowHeader::read(&mut handle)?;
        Ok(Self {
            handle,
            window_size: header.window_size,
            bin_count: header.bin_count,
        })
    }

    #[must_use]
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    #[must_use]
    pub fn bin_count(&self) -> u32 {
        self.bin_count
    }

    /// Gene addresses listed in one bin; empty for out-of-range bins.
    pub fn bin_addresses(&mut self, bin: u32) -> Result<Vec<u32>, Error> {
        if bin >= self.bin_count {
            return Ok(Vec::new());
        }
        self.handle
            .seek(SeekFrom::Start(BIN_TABLE_OFFSET + u64::from(bin) * 4))?;
        let blob_address = self.handle.read_u32()?;
        if blob_address == 0 {
            return Ok(Vec::new());
        }

        self.handle.seek(SeekFrom::Start(u64::from(blob_address)))?;
        let count = self.handle.read_u32()?;
        let mut addresses = Vec::with_capacity(count as usize);
        for _ in 0..count {
            addresses.push(self.handle.read_u32()?);
        }
        Ok(addresses)
    }

    /// Decode the gene subtree at `address` at the requested granularity.
    pub fn decode_at(
        &mut self,
        address: u32,
        granularity: FeatureType,
    ) -> Result<Vec<GenomicFeature>, Error> {
        self.handle.seek(SeekFrom::Start(u64::from(address)))?;
        EntityTreeCodec::decode(&mut self.handle, granularity)
    }

    /// Features overlapping `region` by at least `min_overlap_bp` base
    /// pairs, optionally restricted to one feature type.
    ///
    /// A feature crossing several bins appears exactly once.
    pub fn find(
        &mut self,
        region: &GenomicRegion,
        type_filter: Option<FeatureType>,
        min_overlap_bp: i32,
    ) -> Result<Vec<GenomicFeature>, Error> {
        if self.bin_count == 0 {
            return Ok(Vec::new());
        }
        let granularity = decode_granularity(type_filter);
        let lo = bin_of(region.start, self.window_size);
        let hi = bin_of(region.end, self.window_size).min(self.bin_count - 1);
        if lo > hi {
            return Ok(Vec::new());
        }

        let mut seen: HashSet<u32> = HashSet::new();
        let mut results = Vec::new();
        for bin in lo..=hi {
            for address in self.bin_addresses(bin)? {
                if !seen.insert(address) {
                    continue;
                }
                for feature in self.decode_at(address, granularity)? {
                    if type_filter.is_some_and(|t| feature.feature_type() != t) {
                        continue;
                    }
                    if region.overlap_bp(feature.start, feature.end) >= min_overlap_bp {
                        results.push(feature);
                    }
                }
            }
        }
        Ok(results)
    }

    /// The feature(s) closest to `region`: overlapping features first, and
    /// when none overlap, the nearest features found by widening the bin
    /// window. All features at the minimal distance are returned.
    pub fn closest(
        &mut self,
        region: &GenomicRegion,
        type_filter: Option<FeatureType>,
        min_overlap_bp: i32,
    ) -> Result<Vec<GenomicFeature>, Error> {
        let overlapping = self.find(region, type_filter, min_overlap_bp)?;
        if overlapping.is_empty() {
            let groups = nearest_k(self, region, 1, type_filter, span_distance)?;
            return Ok(groups.into_iter().next().map(|g| g.features).unwrap_or_default());
        }

        let minimum = overlapping
            .iter()
            .map(|f| span_distance(region, f))
            .min()
            .unwrap_or(0);
        Ok(overlapping
            .into_iter()
            .filter(|f| span_distance(region, f) == minimum)
            .collect())
    }

    /// The `n` nearest distance groups around `region`, widening the bin
    /// window as needed (see [`nearest_k`]).
    pub fn nth_closest(
        &mut self,
        region: &GenomicRegion,
        n: usize,
        type_filter: Option<FeatureType>,
    ) -> Result<Vec<DistanceGroup>, Error> {
        nearest_k(self, region, n, type_filter, anchored_distance)
    }
}

impl<R: Read + Seek> BinnedSource for WindowIndex<R> {
    fn window_size(&self) -> u32 {
        self.window_size
    }

    fn bin_count(&self) -> u32 {
        self.bin_count
    }

    fn bin_addresses(&mut self, bin: u32) -> Result<Vec<u32>, Error> {
        WindowIndex::bin_addresses(self, bin)
    }

    fn decode_at(
        &mut self,
        address: u32,
        granularity: FeatureType,
    ) -> Result<Vec<GenomicFeature>, Error> {
        WindowIndex::decode_at(self, address, granularity)
    }
}
