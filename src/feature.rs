//! Genomic annotation features and the gene-transcript-exon hierarchy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::Error;
use crate::strand::Strand;

/// Kind of a genomic annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeatureType {
    Gene = 0,
    Transcript = 1,
    Exon = 2,
    Utr5 = 3,
    Utr3 = 4,
    Region = 5,
}

impl FeatureType {
    #[must_use]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FeatureType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Gene),
            1 => Ok(Self::Transcript),
            2 => Ok(Self::Exon),
            3 => Ok(Self::Utr5),
            4 => Ok(Self::Utr3),
            5 => Ok(Self::Region),
            _ => Err(Error::Parse(format!("invalid feature type byte: {value}"))),
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gene => "gene",
            Self::Transcript => "transcript",
            Self::Exon => "exon",
            Self::Utr5 => "5' UTR",
            Self::Utr3 => "3' UTR",
            Self::Region => "region",
        };
        write!(f, "{name}")
    }
}

/// One genomic annotation record with its child records.
///
/// Coordinates are 1-based and inclusive. `feature_type` and `chromosome`
/// are fixed at construction; properties, tags, and children accumulate
/// afterwards. Property keys are lower-cased on insert. Child order is
/// preserved through encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicFeature {
    /// Opaque record identifier carried through the binary format.
    pub id: u32,
    feature_type: FeatureType,
    chromosome: String,
    pub start: i32,
    pub end: i32,
    pub strand: Strand,
    properties: BTreeMap<String, String>,
    tags: BTreeSet<String>,
    children: Vec<GenomicFeature>,
}

impl GenomicFeature {
    pub fn new(
        feature_type: FeatureType,
        chromosome: impl Into<String>,
        start: i32,
        end: i32,
        strand: Strand,
    ) -> Result<Self, Error> {
        if start > end {
            return Err(Error::Validation(format!(
                "feature start {start} is after end {end}"
            )));
        }
        Ok(Self {
            id: 0,
            feature_type,
            chromosome: chromosome.into(),
            start,
            end,
            strand,
            properties: BTreeMap::new(),
            tags: BTreeSet::new(),
            children: Vec::new(),
        })
    }

    #[must_use]
    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    #[must_use]
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Set a property; the key is lower-cased.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_lowercase(), value.into());
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn add_child(&mut self, child: GenomicFeature) {
        self.children.push(child);
    }

    #[must_use]
    pub fn children(&self) -> &[GenomicFeature] {
        &self.children
    }

    /// Midpoint of the feature span, rounded toward the start.
    #[must_use]
    pub fn midpoint(&self) -> i32 {
        ((i64::from(self.start) + i64::from(self.end)) / 2) as i32
    }

    /// Transcription-anchored coordinate: `start` on the sense strand,
    /// `end` on the antisense strand.
    #[must_use]
    pub fn anchored_start(&self) -> i32 {
        if self.strand.is_antisense() {
            self.end
        } else {
            self.start
        }
    }

    /// Collect the nodes of `feature_type` from this subtree.
    ///
    /// Returns clones of this node if the type matches, otherwise descends
    /// into children. An exon-level request on a gene yields every exon.
    #[must_use]
    pub fn at_depth(&self, feature_type: FeatureType) -> Vec<GenomicFeature> {
        if self.feature_type == feature_type {
            return vec![self.clone()];
        }
        self.children
            .iter()
            .flat_map(|child| child.at_depth(feature_type))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene() -> GenomicFeature {
        GenomicFeature::new(FeatureType::Gene, "chr1", 100, 900, Strand::Sense).unwrap()
    }

    #[test]
    fn type_byte_round_trip() {
        for feature_type in [
            FeatureType::Gene,
            FeatureType::Transcript,
            FeatureType::Exon,
            FeatureType::Utr5,
            FeatureType::Utr3,
            FeatureType::Region,
        ] {
            let back = FeatureType::try_from(feature_type.to_byte()).unwrap();
            assert_eq!(feature_type, back);
        }
    }

    #[test]
    fn unknown_type_byte_is_an_error() {
        assert!(FeatureType::try_from(6).is_err());
        assert!(FeatureType::try_from(255).is_err());
    }

    #[test]
    fn rejects_inverted_interval() {
        let result = GenomicFeature::new(FeatureType::Gene, "chr1", 10, 5, Strand::Sense);
        assert!(result.is_err());
    }

    #[test]
    fn property_keys_are_lower_cased() {
        let mut feature = gene();
        feature.set_property("Gene_Name", "BCL6");
        assert_eq!(feature.property("gene_name"), Some("BCL6"));
        assert_eq!(feature.property("Gene_Name"), None);
    }

    #[test]
    fn tags() {
        let mut feature = gene();
        feature.add_tag("canonical");
        assert!(feature.has_tag("canonical"));
        assert!(!feature.has_tag("mane_select"));
    }

    #[test]
    fn anchored_start_follows_strand() {
        let sense = gene();
        assert_eq!(sense.anchored_start(), 100);

        let antisense =
            GenomicFeature::new(FeatureType::Gene, "chr1", 100, 900, Strand::Antisense).unwrap();
        assert_eq!(antisense.anchored_start(), 900);
    }

    #[test]
    fn at_depth_collects_nested_levels() {
        let mut g = gene();
        let mut tx = GenomicFeature::new(FeatureType::Transcript, "chr1", 100, 500, Strand::Sense)
            .unwrap();
        tx.add_child(
            GenomicFeature::new(FeatureType::Exon, "chr1", 100, 200, Strand::Sense).unwrap(),
        );
        tx.add_child(
            GenomicFeature::new(FeatureType::Exon, "chr1", 400, 500, Strand::Sense).unwrap(),
        );
        g.add_child(tx);

        assert_eq!(g.at_depth(FeatureType::Gene).len(), 1);
        assert_eq!(g.at_depth(FeatureType::Transcript).len(), 1);
        assert_eq!(g.at_depth(FeatureType::Exon).len(), 2);
    }
}
