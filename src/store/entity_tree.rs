//! Codec for nested gene-transcript-exon subtrees.
//!
//! A gene record is followed by a one-byte transcript count and each
//! transcript inline; a transcript by a one-byte exon count and each exon
//! inline; every exon by a single zero byte for its always-empty child
//! count. All pool strings for the subtree are written before the first
//! record so the record bytes stay contiguous.

use std::io::{Read, Seek, Write};

use crate::error::Error;
use crate::feature::{FeatureType, GenomicFeature};
use crate::store::binary_io::{BinaryRead, BinaryWrite};
use crate::store::entity::{EntityCodec, RecordStrings};

/// Encodes and decodes one gene subtree.
pub struct EntityTreeCodec;

impl EntityTreeCodec {
    /// Encode a gene with its transcripts and exons; returns the address of
    /// the gene record.
    pub fn encode<W: Write + Seek>(writer: &mut W, gene: &GenomicFeature) -> Result<u32, Error> {
        let mut strings = Vec::new();
        Self::write_strings(writer, gene, &mut strings)?;

        let mut next = 0usize;
        Self::write_records(writer, gene, &strings, &mut next)
    }

    fn write_strings<W: Write + Seek>(
        writer: &mut W,
        feature: &GenomicFeature,
        strings: &mut Vec<RecordStrings>,
    ) -> Result<(), Error> {
        strings.push(EntityCodec::write_strings(writer, feature)?);
        for child in feature.children() {
            Self::write_strings(writer, child, strings)?;
        }
        Ok(())
    }

    // Records are written in the same pre-order as the strings pass, so
    // `next` indexes into the collected RecordStrings.
    fn write_records<W: Write + Seek>(
        writer: &mut W,
        feature: &GenomicFeature,
        strings: &[RecordStrings],
        next: &mut usize,
    ) -> Result<u32, Error> {
        let address = EntityCodec::encode_record(writer, feature, &strings[*next])?;
        *next += 1;

        let children = feature.children();
        let count = u8::try_from(children.len()).map_err(|_| {
            Error::Validation(format!("child count {} exceeds u8 range", children.len()))
        })?;
        writer.write_u8(count)?;
        for child in children {
            Self::write_records(writer, child, strings, next)?;
        }
        Ok(address)
    }

    /// Decode a gene subtree from the current position at the requested
    /// granularity.
    ///
    /// The entire subtree is consumed from the stream regardless of
    /// granularity so the cursor ends up past it; only nodes of the
    /// requested type are returned, with deeper levels attached as
    /// children.
    pub fn decode<R: Read + Seek>(
        reader: &mut R,
        granularity: FeatureType,
    ) -> Result<Vec<GenomicFeature>, Error> {
        if !matches!(
            granularity,
            FeatureType::Gene | FeatureType::Transcript | FeatureType::Exon
        ) {
            return Err(Error::Validation(format!(
                "unsupported decode granularity: {granularity}"
            )));
        }

        let mut out = Vec::new();
        let mut gene = EntityCodec::decode(reader, FeatureType::Gene)?;

        let transcript_count = reader.read_u8()?;
        for _ in 0..transcript_count {
            let mut transcript = EntityCodec::decode(reader, FeatureType::Transcript)?;

            let exon_count = reader.read_u8()?;
            for _ in 0..exon_count {
                let exon = EntityCodec::decode(reader, FeatureType::Exon)?;
                let exon_children = reader.read_u8()?;
                if exon_children != 0 {
                    return Err(Error::Format(format!(
                        "exon child count must be zero, got {exon_children}"
                    )));
                }
                match granularity {
                    FeatureType::Exon => out.push(exon),
                    _ => transcript.add_child(exon),
                }
            }

            match granularity {
                FeatureType::Transcript => out.push(transcript),
                FeatureType::Gene => gene.add_child(transcript),
                _ => {}
            }
        }

        if granularity == FeatureType::Gene {
            out.push(gene);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::Strand;
    use std::io::{Cursor, SeekFrom};

    fn exon(start: i32, end: i32) -> GenomicFeature {
        GenomicFeature::new(FeatureType::Exon, "chr1", start, end, Strand::Sense).unwrap()
    }

    fn sample_gene() -> GenomicFeature {
        let mut gene =
            GenomicFeature::new(FeatureType::Gene, "chr1", 11_874, 14_409, Strand::Sense).unwrap();
        gene.id = 1;
        gene.set_property("gene_name", "DDX11L1");

        let mut tx1 =
            GenomicFeature::new(FeatureType::Transcript, "chr1", 11_874, 14_409, Strand::Sense)
                .unwrap();
        tx1.id = 2;
        tx1.set_property("transcript_id", "NR_046018.2");
        tx1.add_child(exon(11_874, 12_227));
        tx1.add_child(exon(12_613, 12_721));
        tx1.add_child(exon(13_221, 14_409));

        let mut tx2 =
            GenomicFeature::new(FeatureType::Transcript, "chr1", 12_010, 13_670, Strand::Sense)
                .unwrap();
        tx2.id = 3;
        tx2.add_child(exon(12_010, 12_057));

        gene.add_child(tx1);
        gene.add_child(tx2);
        gene
    }

    fn encoded(gene: &GenomicFeature) -> (Cursor<Vec<u8>>, u32) {
        let mut cursor = Cursor::new(Vec::new());
        let address = EntityTreeCodec::encode(&mut cursor, gene).unwrap();
        (cursor, address)
    }

    #[test]
    fn gene_round_trip_preserves_child_order() {
        let gene = sample_gene();
        let (mut cursor, address) = encoded(&gene);

        cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
        let decoded = EntityTreeCodec::decode(&mut cursor, FeatureType::Gene).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], gene);
    }

    #[test]
    fn transcript_granularity_returns_transcripts_with_exons() {
        let gene = sample_gene();
        let (mut cursor, address) = encoded(&gene);

        cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
        let decoded = EntityTreeCodec::decode(&mut cursor, FeatureType::Transcript).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].children().len(), 3);
        assert_eq!(decoded[1].children().len(), 1);
        assert_eq!(
            decoded[0].property("transcript_id"),
            Some("NR_046018.2")
        );
    }

    #[test]
    fn exon_granularity_flattens() {
        let gene = sample_gene();
        let (mut cursor, address) = encoded(&gene);

        cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
        let decoded = EntityTreeCodec::decode(&mut cursor, FeatureType::Exon).unwrap();
        assert_eq!(decoded.len(), 4);
        assert!(decoded
            .iter()
            .all(|f| f.feature_type() == FeatureType::Exon));
    }

    #[test]
    fn cursor_consumes_whole_subtree_at_every_granularity() {
        let gene = sample_gene();
        let (mut cursor, address) = encoded(&gene);
        let end = cursor.stream_position().unwrap();

        for granularity in [FeatureType::Gene, FeatureType::Transcript, FeatureType::Exon] {
            cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
            let _ = EntityTreeCodec::decode(&mut cursor, granularity).unwrap();
            assert_eq!(cursor.stream_position().unwrap(), end);
        }
    }

    #[test]
    fn childless_gene_round_trip() {
        let gene =
            GenomicFeature::new(FeatureType::Gene, "chr2", 100, 200, Strand::Antisense).unwrap();
        let (mut cursor, address) = encoded(&gene);

        cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
        let decoded = EntityTreeCodec::decode(&mut cursor, FeatureType::Gene).unwrap();
        assert_eq!(decoded[0], gene);

        cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
        let transcripts = EntityTreeCodec::decode(&mut cursor, FeatureType::Transcript).unwrap();
        assert!(transcripts.is_empty());
    }

    #[test]
    fn rejects_non_tree_granularity() {
        let gene = sample_gene();
        let (mut cursor, address) = encoded(&gene);

        cursor.seek(SeekFrom::Start(u64::from(address))).unwrap();
        let result = EntityTreeCodec::decode(&mut cursor, FeatureType::Region);
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
