//! String pool: variable-length UTF-8 strings addressed by absolute file
//! offset.
//!
//! Pool entries share the file with record bytes, so out-of-band reads must
//! leave the stream position where they found it; record decoding continues
//! sequentially right after resolving a reference.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Error;
use crate::store::binary_io::{BinaryRead, BinaryWrite};

/// Reads and writes length-prefixed pool strings.
pub struct StringPool;

impl StringPool {
    /// Append a string at the current position and return its address.
    ///
    /// Fails with a validation error when the string exceeds 255 bytes.
    pub fn write<W: Write + Seek>(writer: &mut W, s: &str) -> Result<u32, Error> {
        let address = checked_address(writer.stream_position()?)?;
        writer.write_prefixed_string(s)?;
        Ok(address)
    }

    /// Read the string at `address`, restoring the stream position.
    pub fn read<R: Read + Seek>(reader: &mut R, address: u32) -> Result<String, Error> {
        let saved = reader.stream_position()?;
        reader.seek(SeekFrom::Start(u64::from(address)))?;
        let result = reader.read_prefixed_string();
        reader.seek(SeekFrom::Start(saved))?;
        result
    }
}

/// Narrow a stream position to the u32 address space of the format.
pub(super) fn checked_address(position: u64) -> Result<u32, Error> {
    u32::try_from(position)
        .map_err(|_| Error::Validation(format!("file offset {position} exceeds u32 address space")))
}
