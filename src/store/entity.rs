//! Codec for a single feature record.
//!
//! Record layout, fields in order: record id (u32), type byte, chromosome
//! name (inline length-prefixed), start (i32), end (i32), strand byte,
//! property count (u8) and count pairs of pool addresses, tag count (u8)
//! and count pool addresses.

use std::io::{Read, Seek, Write};

use crate::error::Error;
use crate::feature::{FeatureType, GenomicFeature};
use crate::store::binary_io::{BinaryRead, BinaryWrite};
use crate::store::string_pool::{checked_address, StringPool};
use crate::strand::Strand;

/// Pool addresses backing one record's text, in encode order.
#[derive(Debug, Default)]
pub(super) struct RecordStrings {
    pub properties: Vec<(u32, u32)>,
    pub tags: Vec<u32>,
}

/// Encodes and decodes one feature record.
pub struct EntityCodec;

impl EntityCodec {
    /// Encode one feature: pool strings first, then the record bytes.
    ///
    /// Returns the address of the record (not of the strings preceding it).
    pub fn encode<W: Write + Seek>(
        writer: &mut W,
        feature: &GenomicFeature,
    ) -> Result<u32, Error> {
        let strings = Self::write_strings(writer, feature)?;
        Self::encode_record(writer, feature, &strings)
    }

    /// Write the pool entries for one feature's properties and tags.
    pub(super) fn write_strings<W: Write + Seek>(
        writer: &mut W,
        feature: &GenomicFeature,
    ) -> Result<RecordStrings, Error> {
        let mut strings = RecordStrings::default();
        for (key, value) in feature.properties() {
            let key_address = StringPool::write(writer, key)?;
            let value_address = StringPool::write(writer, value)?;
            strings.properties.push((key_address, value_address));
        }
        for tag in feature.tags() {
            strings.tags.push(StringPool::write(writer, tag)?);
        }
        Ok(strings)
    }

    /// Write the record bytes, referencing previously written pool entries.
    pub(super) fn encode_record<W: Write + Seek>(
        writer: &mut W,
        feature: &GenomicFeature,
        strings: &RecordStrings,
    ) -> Result<u32, Error> {
        let address = checked_address(writer.stream_position()?)?;

        writer.write_u32(feature.id)?;
        writer.write_u8(feature.feature_type().to_byte())?;
        writer.write_prefixed_string(feature.chromosome())?;
        writer.write_i32(feature.start)?;
        writer.write_i32(feature.end)?;
        writer.write_u8(feature.strand.to_byte())?;

        writer.write_u8(counted_u8(strings.properties.len(), "property")?)?;
        for &(key_address, value_address) in &strings.properties {
            writer.write_u32(key_address)?;
            writer.write_u32(value_address)?;
        }

        writer.write_u8(counted_u8(strings.tags.len(), "tag")?)?;
        for &tag_address in &strings.tags {
            writer.write_u32(tag_address)?;
        }

        Ok(address)
    }

    /// Decode one record from the current position.
    ///
    /// The stored type byte is skipped; the caller supplies the expected
    /// type. Pool references are resolved with the position restored, so the
    /// cursor ends up just past the record.
    pub fn decode<R: Read + Seek>(
        reader: &mut R,
        expected_type: FeatureType,
    ) -> Result<GenomicFeature, Error> {
        let id = reader.read_u32()?;
        let _type_byte = reader.read_u8()?;
        let chromosome = reader.read_prefixed_string()?;
        let start = reader.read_i32()?;
        let end = reader.read_i32()?;
        let strand = Strand::try_from(reader.read_u8()?)?;

        let mut feature = GenomicFeature::new(expected_type, chromosome, start, end, strand)?;
        feature.id = id;

        let property_count = reader.read_u8()?;
        for _ in 0..property_count {
            let key_address = reader.read_u32()?;
            let value_address = reader.read_u32()?;
            let key = resolve(reader, key_address)?;
            let value = resolve(reader, value_address)?;
            feature.set_property(&key, value);
        }

        let tag_count = reader.read_u8()?;
        for _ in 0..tag_count {
            let tag_address = reader.read_u32()?;
            feature.add_tag(resolve(reader, tag_address)?);
        }

        Ok(feature)
    }
}

/// Resolve a pool reference; an unreadable address is a format error.
fn resolve<R: Read + Seek>(reader: &mut R, address: u32) -> Result<String, Error> {
    StringPool::read(reader, address).map_err(|e| match e {
        Error::Io(_) => Error::Format(format!("unresolvable string pool address {address}")),
        other => other,
    })
}

fn counted_u8(count: usize, what: &str) -> Result<u8, Error> {
    u8::try_from(count)
        .map_err(|_| Error::Validation(format!("{what} count {count} exceeds u8 range")))
}
