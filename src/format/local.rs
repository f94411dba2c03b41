//! Local file header (30-byte fixed prefix) and data descriptor codecs.

use super::{verify_signature, SIG_DATA_DESCRIPTOR, SIG_LOCAL_HEADER};
use crate::binio::{ByteReader, ByteWriter};
use crate::error::Result;
use crate::flags::GeneralPurposeFlags;

pub const FIXED_SIZE: usize = 30;

/// The local file header's fixed 30-byte prefix. `crc32`/`compressed_size`/
/// `uncompressed_size` may be sentinel placeholders (0, or 0xFFFFFFFF under
/// ZIP64) per spec.md §4.7 — callers consult the entry's ZIP64 extra field
/// or a trailing data descriptor for the authoritative values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    pub version_needed: u16,
    pub flags: GeneralPurposeFlags,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalHeader {
    /// Parse the fixed 30-byte prefix. The caller reads `name_len` bytes of
    /// path and `extra_len` bytes of extra field afterward — readers only
    /// need the fixed fields and total length, since the central directory
    /// holds the trusted size values for streaming-produced archives.
    pub fn parse(data: &[u8]) -> Result<LocalHeader> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_LOCAL_HEADER)?;
        Ok(LocalHeader {
            version_needed: r.read_u16()?,
            flags: GeneralPurposeFlags::new(r.read_u16()?),
            method: r.read_u16()?,
            mod_time: r.read_u16()?,
            mod_date: r.read_u16()?,
            crc32: r.read_u32()?,
            compressed_size: r.read_u32()?,
            uncompressed_size: r.read_u32()?,
            name_len: r.read_u16()?,
            extra_len: r.read_u16()?,
        })
    }

    pub fn write(&self, out: &mut ByteWriter) {
        out.write_u32(SIG_LOCAL_HEADER);
        out.write_u16(self.version_needed);
        out.write_u16(self.flags.raw());
        out.write_u16(self.method);
        out.write_u16(self.mod_time);
        out.write_u16(self.mod_date);
        out.write_u32(self.crc32);
        out.write_u32(self.compressed_size);
        out.write_u32(self.uncompressed_size);
        out.write_u16(self.name_len);
        out.write_u16(self.extra_len);
    }

    /// Total fixed + variable length, given the already-known name/extra
    /// byte lengths.
    pub fn total_len(&self) -> usize {
        FIXED_SIZE + self.name_len as usize + self.extra_len as usize
    }
}

/// A trailing data-descriptor record, in either 32-bit or 64-bit form
/// (spec.md §4.7: ZIP64 entries with a data descriptor emit the 64-bit
/// form so the real sizes aren't truncated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDescriptor {
    Narrow {
        crc32: u32,
        compressed_size: u32,
        uncompressed_size: u32,
    },
    Wide {
        crc32: u32,
        compressed_size: u64,
        uncompressed_size: u64,
    },
}

impl DataDescriptor {
    pub const NARROW_LEN: usize = 16;
    pub const WIDE_LEN: usize = 24;

    pub fn write(&self, out: &mut ByteWriter) {
        out.write_u32(SIG_DATA_DESCRIPTOR);
        match *self {
            DataDescriptor::Narrow {
                crc32,
                compressed_size,
                uncompressed_size,
            } => {
                out.write_u32(crc32);
                out.write_u32(compressed_size);
                out.write_u32(uncompressed_size);
            }
            DataDescriptor::Wide {
                crc32,
                compressed_size,
                uncompressed_size,
            } => {
                out.write_u32(crc32);
                out.write_u64(compressed_size);
                out.write_u64(uncompressed_size);
            }
        }
    }

    pub fn parse_narrow(data: &[u8]) -> Result<DataDescriptor> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_DATA_DESCRIPTOR)?;
        Ok(DataDescriptor::Narrow {
            crc32: r.read_u32()?,
            compressed_size: r.read_u32()?,
            uncompressed_size: r.read_u32()?,
        })
    }

    pub fn parse_wide(data: &[u8]) -> Result<DataDescriptor> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_DATA_DESCRIPTOR)?;
        Ok(DataDescriptor::Wide {
            crc32: r.read_u32()?,
            compressed_size: r.read_u64()?,
            uncompressed_size: r.read_u64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocalHeader {
        LocalHeader {
            version_needed: 20,
            flags: GeneralPurposeFlags::new(0),
            method: 8,
            mod_time: 0,
            mod_date: 0,
            crc32: 0xDEAD_BEEF,
            compressed_size: 100,
            uncompressed_size: 200,
            name_len: 5,
            extra_len: 0,
        }
    }

    #[test]
    fn round_trips() {
        let header = sample();
        let mut w = ByteWriter::new();
        header.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), FIXED_SIZE);
        let parsed = LocalHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = vec![0u8; FIXED_SIZE];
        bytes[0] = 0xFF;
        assert!(LocalHeader::parse(&bytes).is_err());
    }

    #[test]
    fn data_descriptor_narrow_and_wide_round_trip() {
        let narrow = DataDescriptor::Narrow {
            crc32: 1,
            compressed_size: 2,
            uncompressed_size: 3,
        };
        let mut w = ByteWriter::new();
        narrow.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), DataDescriptor::NARROW_LEN);
        assert_eq!(DataDescriptor::parse_narrow(&bytes).unwrap(), narrow);

        let wide = DataDescriptor::Wide {
            crc32: 1,
            compressed_size: 1 << 40,
            uncompressed_size: 1 << 41,
        };
        let mut w = ByteWriter::new();
        wide.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), DataDescriptor::WIDE_LEN);
        assert_eq!(DataDescriptor::parse_wide(&bytes).unwrap(), wide);
    }
}
