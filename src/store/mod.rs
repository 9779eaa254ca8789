//! The annotation store: companion-file formats, indexes, and the query
//! façade.
//!
//! A store is a directory of companion files: one window-indexed file per
//! chromosome (`{assembly}.{chromosome}.w{window}.gfb`) and one
//! radix-indexed file per assembly (`{assembly}.rgfb`). Queries open the
//! relevant file lazily, compute candidate bins or walk the trie, and
//! decode only the touched byte ranges.

pub mod binary_io;
pub mod entity;
pub mod entity_tree;
pub mod header;
pub mod nearest;
pub mod radix_index;
pub mod string_pool;
pub mod window_index;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::Error;
use crate::feature::{FeatureType, GenomicFeature};
use crate::region::GenomicRegion;
use nearest::DistanceGroup;
use radix_index::{matches_text, RadixIndex};
use window_index::WindowIndex;

/// Companion-file name for one chromosome's window index.
#[must_use]
pub fn window_file_name(assembly: &str, chromosome: &str, window_size: u32) -> String {
    format!("{assembly}.{chromosome}.w{window_size}.gfb")
}

/// Companion-file name for an assembly's radix index.
#[must_use]
pub fn radix_file_name(assembly: &str) -> String {
    format!("{assembly}.rgfb")
}

/// Decode granularity implied by a type filter; levels outside the stored
/// hierarchy fall back to whole-gene decoding.
pub(crate) fn decode_granularity(type_filter: Option<FeatureType>) -> FeatureType {
    match type_filter {
        Some(FeatureType::Transcript) => FeatureType::Transcript,
        Some(FeatureType::Exon) => FeatureType::Exon,
        _ => FeatureType::Gene,
    }
}

/// Read-only query façade over one assembly's companion files.
///
/// Index handles are opened on first touch and kept for the store's
/// lifetime. A missing companion file is routine (unplaced contigs rarely
/// have one) and reads as "no data". Queries take `&mut self` because each
/// one is a sequence of non-atomic seek/read pairs on a shared handle;
/// concurrent readers should open independent stores.
pub struct AnnotationStore {
    data_dir: PathBuf,
    assembly: String,
    window_size: u32,
    windows: HashMap<String, Option<WindowIndex<File>>>,
    radix: Option<Option<RadixIndex<File>>>,
}

impl AnnotationStore {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        assembly: impl Into<String>,
        window_size: u32,
    ) -> Result<Self, Error> {
        let assembly = assembly.into();
        if assembly.is_empty() {
            return Err(Error::Validation("assembly name must not be empty".to_string()));
        }
        if window_size == 0 {
            return Err(Error::Validation("window size must be non-zero".to_string()));
        }
        Ok(Self {
            data_dir: data_dir.into(),
            assembly,
            window_size,
            windows: HashMap::new(),
            radix: None,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, Error> {
        Self::new(
            config.data_dir.clone(),
            config.genome_assembly.clone(),
            config.window_size,
        )
    }

    #[must_use]
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    #[must_use]
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn window_index(&mut self, chromosome: &str) -> Result<Option<&mut WindowIndex<File>>, Error> {
        let index = match self.windows.entry(chromosome.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self
                    .data_dir
                    .join(window_file_name(&self.assembly, chromosome, self.window_size));
                entry.insert(open_index(&path)?.map(WindowIndex::open).transpose()?)
            }
        };
        Ok(index.as_mut())
    }

    fn radix_index(&mut self) -> Result<Option<&mut RadixIndex<File>>, Error> {
        if self.radix.is_none() {
            let path = self.data_dir.join(radix_file_name(&self.assembly));
            self.radix = Some(open_index(&path)?.map(RadixIndex::open).transpose()?);
        }
        Ok(self.radix.as_mut().and_then(Option::as_mut))
    }

    /// Features overlapping `region` by at least `min_overlap_bp` base
    /// pairs.
    pub fn find(
        &mut self,
        region: &GenomicRegion,
        type_filter: Option<FeatureType>,
        min_overlap_bp: i32,
    ) -> Result<Vec<GenomicFeature>, Error> {
        match self.window_index(&region.chromosome)? {
            Some(index) => index.find(region, type_filter, min_overlap_bp),
            None => Ok(Vec::new()),
        }
    }

    /// The feature(s) closest to `region`, overlap first, ties together.
    pub fn closest(
        &mut self,
        region: &GenomicRegion,
        type_filter: Option<FeatureType>,
        min_overlap_bp: i32,
    ) -> Result<Vec<GenomicFeature>, Error> {
        match self.window_index(&region.chromosome)? {
            Some(index) => index.closest(region, type_filter, min_overlap_bp),
            None => Ok(Vec::new()),
        }
    }

    /// The `n` nearest distance groups around `region`, widening the bin
    /// window over sparse chromosomes.
    pub fn nth_closest(
        &mut self,
        region: &GenomicRegion,
        n: usize,
        type_filter: Option<FeatureType>,
    ) -> Result<Vec<DistanceGroup>, Error> {
        match self.window_index(&region.chromosome)? {
            Some(index) => index.nth_closest(region, n, type_filter),
            None => Ok(Vec::new()),
        }
    }

    /// Features whose indexed identifier starts with `text`
    /// (case-insensitive); with `exact`, only features carrying a property
    /// value equal to `text` case-insensitively.
    pub fn search(
        &mut self,
        text: &str,
        type_filter: Option<FeatureType>,
        exact: bool,
    ) -> Result<Vec<GenomicFeature>, Error> {
        let granularity = decode_granularity(type_filter);
        let Some(radix) = self.radix_index()? else {
            return Ok(Vec::new());
        };

        let mut seen: HashSet<u32> = HashSet::new();
        let mut results = Vec::new();
        for address in radix.search(text)? {
            if !seen.insert(address) {
                continue;
            }
            for feature in radix.decode_at(address, granularity)? {
                if type_filter.is_some_and(|t| feature.feature_type() != t) {
                    continue;
                }
                if exact && !matches_text(&feature, text) {
                    continue;
                }
                results.push(feature);
            }
        }
        Ok(results)
    }

    /// Every feature in the store at the requested granularity.
    pub fn all_features(
        &mut self,
        type_filter: Option<FeatureType>,
    ) -> Result<Vec<GenomicFeature>, Error> {
        let granularity = decode_granularity(type_filter);
        let Some(radix) = self.radix_index()? else {
            return Ok(Vec::new());
        };

        let mut seen: HashSet<u32> = HashSet::new();
        let mut results = Vec::new();
        for address in radix.all_addresses()? {
            if !seen.insert(address) {
                continue;
            }
            for feature in radix.decode_at(address, granularity)? {
                if type_filter.is_some_and(|t| feature.feature_type() != t) {
                    continue;
                }
                results.push(feature);
            }
        }
        Ok(results)
    }
}

/// Open a companion file; absent files read as "no data".
fn open_index(path: &Path) -> Result<Option<File>, Error> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::radix_index::{RadixIndexWriter, DEFAULT_IDENTIFIER_KEYS};
    use crate::store::window_index::WindowIndexWriter;
    use crate::strand::Strand;
    use std::fs;
    use tempfile::TempDir;

    const ASSEMBLY: &str = "GRCh38";
    const WINDOW: u32 = 1_000;

    fn named_gene(id: u32, chromosome: &str, name: &str, start: i32, end: i32) -> GenomicFeature {
        let mut gene =
            GenomicFeature::new(FeatureType::Gene, chromosome, start, end, Strand::Sense).unwrap();
        gene.id = id;
        gene.set_property("gene_name", name);
        gene
    }

    /// Writes a two-chromosome store: two windowed genes on chr1 plus the
    /// BCL cluster on chr3.
    fn build_store(dir: &Path) -> AnnotationStore {
        let chr1 = vec![
            named_gene(1, "chr1", "A", 500, 1_500),
            named_gene(2, "chr1", "B", 2_500, 2_600),
        ];
        let chr3 = vec![
            named_gene(3, "chr3", "BCL6", 187_721_377, 187_745_727),
            named_gene(4, "chr3", "BCL6B", 187_900_000, 187_950_000),
            named_gene(5, "chr3", "BCL2", 188_100_000, 188_200_000),
        ];

        for genes in [&chr1, &chr3] {
            let chromosome = genes[0].chromosome().to_string();
            let path = dir.join(window_file_name(ASSEMBLY, &chromosome, WINDOW));
            let mut file = fs::File::create(path).unwrap();
            WindowIndexWriter::write(&mut file, WINDOW, genes).unwrap();
        }

        let all: Vec<GenomicFeature> = chr1.into_iter().chain(chr3).collect();
        let mut file = fs::File::create(dir.join(radix_file_name(ASSEMBLY))).unwrap();
        RadixIndexWriter::write(&mut file, &all, DEFAULT_IDENTIFIER_KEYS).unwrap();

        AnnotationStore::new(dir, ASSEMBLY, WINDOW).unwrap()
    }

    fn names(features: &[GenomicFeature]) -> Vec<String> {
        let mut names: Vec<String> = features
            .iter()
            .map(|f| f.property("gene_name").unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn find_scenario() {
        let dir = TempDir::new().unwrap();
        let mut store = build_store(dir.path());

        let region = GenomicRegion::new("chr1", 1_400, 1_600).unwrap();
        let found = store.find(&region, Some(FeatureType::Gene), 1).unwrap();
        assert_eq!(names(&found), vec!["A"]);
    }

    #[test]
    fn closest_scenario() {
        let dir = TempDir::new().unwrap();
        let mut store = build_store(dir.path());

        let region = GenomicRegion::new("chr1", 1_800, 1_800).unwrap();
        let closest = store.closest(&region, Some(FeatureType::Gene), 1).unwrap();
        assert_eq!(names(&closest), vec!["A"]);
    }

    #[test]
    fn nth_closest_counts_distance_groups() {
        let dir = TempDir::new().unwrap();
        let mut store = build_store(dir.path());

        let region = GenomicRegion::new("chr1", 1_800, 1_800).unwrap();
        let groups = store.nth_closest(&region, 2, Some(FeatureType::Gene)).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].distance < groups[1].distance);
    }

    #[test]
    fn prefix_and_exact_search() {
        let dir = TempDir::new().unwrap();
        let mut store = build_store(dir.path());

        let prefix = store.search("bcl6", Some(FeatureType::Gene), false).unwrap();
        assert_eq!(names(&prefix), vec!["BCL6", "BCL6B"]);

        let exact = store.search("bcl6", Some(FeatureType::Gene), true).unwrap();
        assert_eq!(names(&exact), vec!["BCL6"]);
    }

    #[test]
    fn all_features_lists_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = build_store(dir.path());

        let all = store.all_features(Some(FeatureType::Gene)).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn missing_chromosome_file_reads_as_no_data() {
        let dir = TempDir::new().unwrap();
        let mut store = build_store(dir.path());

        let region = GenomicRegion::new("chrUn_KI270302v1", 1, 1_000).unwrap();
        assert!(store.find(&region, None, 1).unwrap().is_empty());
        assert!(store.closest(&region, None, 1).unwrap().is_empty());
        assert!(store.nth_closest(&region, 3, None).unwrap().is_empty());
    }

    #[test]
    fn missing_radix_file_reads_as_no_data() {
        let dir = TempDir::new().unwrap();
        let mut store = AnnotationStore::new(dir.path(), ASSEMBLY, WINDOW).unwrap();
        assert!(store.search("bcl6", None, false).unwrap().is_empty());
        assert!(store.all_features(None).unwrap().is_empty());
    }

    #[test]
    fn corrupt_header_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(window_file_name(ASSEMBLY, "chr1", WINDOW));
        fs::write(&path, b"not a companion file").unwrap();

        let mut store = AnnotationStore::new(dir.path(), ASSEMBLY, WINDOW).unwrap();
        let region = GenomicRegion::new("chr1", 1, 1_000).unwrap();
        assert!(matches!(
            store.find(&region, None, 1),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn file_names_follow_convention() {
        assert_eq!(
            window_file_name("GRCh38", "chr1", 1_000),
            "GRCh38.chr1.w1000.gfb"
        );
        assert_eq!(radix_file_name("GRCh38"), "GRCh38.rgfb");
    }

    #[test]
    fn rejects_empty_configuration() {
        assert!(AnnotationStore::new("/tmp", "", WINDOW).is_err());
        assert!(AnnotationStore::new("/tmp", ASSEMBLY, 0).is_err());
    }
}
