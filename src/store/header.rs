//! Headers for the two companion-file kinds.
//!
//! Both files share a 5-byte prefix: the check byte at offset 0, three
//! reserved zero bytes, and the version byte at offset 4. They diverge
//! afterwards and are described by two distinct structs:
//!
//! - window file: reserved bytes 5..9, window size (u32) at offset 9, bin
//!   count (u32) at offset 13, bin-address table from offset 17.
//! - radix file: all-records list address (u32) at offset 5, root trie node
//!   at offset 9.

use std::io::{Read, Write};

use crate::error::Error;
use crate::store::binary_io::{BinaryRead, BinaryWrite};

/// First byte of every companion file.
pub const FORMAT_CHECK_BYTE: u8 = 0x47;

/// Current format version for both file kinds.
pub const FORMAT_VERSION: u8 = 1;

/// Offset of the bin-address table in a window file; one u32 per bin.
pub const BIN_TABLE_OFFSET: u64 = 17;

/// Offset of the root trie node in a radix file.
pub const RADIX_ROOT_OFFSET: u32 = 9;

/// Length of a window-file header in bytes.
pub const WINDOW_HEADER_LEN: u64 = BIN_TABLE_OFFSET;

fn write_shared_prefix<W: Write>(writer: &mut W) -> Result<(), Error> {
    writer.write_u8(FORMAT_CHECK_BYTE)?;
    writer.write_all(&[0u8; 3])?;
    writer.write_u8(FORMAT_VERSION)?;
    Ok(())
}

fn read_shared_prefix<R: Read>(reader: &mut R) -> Result<(), Error> {
    let check = reader.read_u8()?;
    if check != FORMAT_CHECK_BYTE {
        return Err(Error::Format(format!(
            "invalid check byte: expected {FORMAT_CHECK_BYTE:#04x}, got {check:#04x}"
        )));
    }
    let mut reserved = [0u8; 3];
    reader.read_exact(&mut reserved)?;
    let version = reader.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(Error::Format(format!(
            "unsupported format version: expected {FORMAT_VERSION}, got {version}"
        )));
    }
    Ok(())
}

/// Header of a window-indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHeader {
    /// Spatial bin width in base pairs.
    pub window_size: u32,
    /// Number of bin-address table entries.
    pub bin_count: u32,
}

impl WindowHeader {
    /// Write the full 17-byte header at the current position.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        write_shared_prefix(writer)?;
        writer.write_all(&[0u8; 4])?;
        writer.write_u32(self.window_size)?;
        writer.write_u32(self.bin_count)?;
        Ok(())
    }

    /// Read and validate a header from the current position.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        read_shared_prefix(reader)?;
        let mut reserved = [0u8; 4];
        reader.read_exact(&mut reserved)?;
        let window_size = reader.read_u32()?;
        let bin_count = reader.read_u32()?;
        if window_size == 0 {
            return Err(Error::Format("window size must be non-zero".to_string()));
        }
        Ok(Self {
            window_size,
            bin_count,
        })
    }
}

/// Header of a radix-indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadixHeader {
    /// Address of the flat all-records list.
    pub all_records_address: u32,
}

impl RadixHeader {
    /// Write the full 9-byte header at the current position.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        write_shared_prefix(writer)?;
        writer.write_u32(self.all_records_address)?;
        Ok(())
    }

    /// Read and validate a header from the current position.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        read_shared_prefix(reader)?;
        let all_records_address = reader.read_u32()?;
        Ok(Self {
            all_records_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn window_header_round_trip() {
        let header = WindowHeader {
            window_size: 1000,
            bin_count: 42,
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, WINDOW_HEADER_LEN);

        let back = WindowHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn radix_header_round_trip() {
        let header = RadixHeader {
            all_records_address: 123_456,
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), RADIX_ROOT_OFFSET as usize);

        let back = RadixHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn field_offsets_match_format() {
        let header = WindowHeader {
            window_size: 1000,
            bin_count: 7,
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf[0], FORMAT_CHECK_BYTE);
        assert_eq!(buf[4], FORMAT_VERSION);
        assert_eq!(u32::from_le_bytes(buf[9..13].try_into().unwrap()), 1000);
        assert_eq!(u32::from_le_bytes(buf[13..17].try_into().unwrap()), 7);

        let radix = RadixHeader {
            all_records_address: 99,
        };
        let mut buf = Vec::new();
        radix.write(&mut buf).unwrap();
        assert_eq!(buf[0], FORMAT_CHECK_BYTE);
        assert_eq!(buf[4], FORMAT_VERSION);
        assert_eq!(u32::from_le_bytes(buf[5..9].try_into().unwrap()), 99);
    }

    #[test]
    fn wrong_check_byte() {
        let mut buf = Vec::new();
        WindowHeader {
            window_size: 1000,
            bin_count: 1,
        }
        .write(&mut buf)
        .unwrap();
        buf[0] = 0x00;

        let result = WindowHeader::read(&mut Cursor::new(buf));
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn unsupported_version() {
        let mut buf = Vec::new();
        RadixHeader {
            all_records_address: 9,
        }
        .write(&mut buf)
        .unwrap();
        buf[4] = 99;

        let result = RadixHeader::read(&mut Cursor::new(buf));
        assert!(matches!(result, Err(Error::Format(_))));
    }
}
