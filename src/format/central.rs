//! Central directory header (46-byte fixed prefix) codec.

use super::{verify_signature, SIG_CENTRAL_HEADER};
use crate::binio::{ByteReader, ByteWriter};
use crate::error::{Result, SZipError};
use crate::flags::GeneralPurposeFlags;

pub const FIXED_SIZE: usize = 46;

/// The central directory header's fixed 46-byte prefix. Mirrors the local
/// header plus version-made-by/platform, disk-number-start, attributes,
/// and the local header offset (spec.md §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralHeader {
    pub version_made_by: u16,
    pub platform: u8,
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
    pub comment_len: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
}

impl CentralHeader {
    pub fn parse(data: &[u8]) -> Result<CentralHeader> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_CENTRAL_HEADER)?;
        let version_made_by_raw = r.read_u16()?;
        let platform = (version_made_by_raw >> 8) as u8;
        let version_needed = r.read_u16()?;
        let flags = GeneralPurposeFlags::new(r.read_u16()?);
        let method = r.read_u16()?;
        let mod_time = r.read_u16()?;
        let mod_date = r.read_u16()?;
        let crc32 = r.read_u32()?;
        let compressed_size = r.read_u32()?;
        let uncompressed_size = r.read_u32()?;
        let name_len = r.read_u16()?;
        let extra_len = r.read_u16()?;
        let comment_len = r.read_u16()?;
        let disk_number_start = r.read_u16()?;
        if disk_number_start != 0 && disk_number_start != 0xFFFF {
            return Err(SZipError::MultiDisk(disk_number_start));
        }
        let internal_attrs = r.read_u16()?;
        let external_attrs = r.read_u32()?;
        let local_header_offset = r.read_u32()?;
        Ok(CentralHeader {
            version_made_by: version_made_by_raw & 0x00FF,
            platform,
            version_needed,
            flags,
            method,
            mod_time,
            mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            name_len,
            extra_len,
            comment_len,
            disk_number_start,
            internal_attrs,
            external_attrs,
            local_header_offset,
        })
    }

    pub fn write(&self, out: &mut ByteWriter) {
        out.write_u32(SIG_CENTRAL_HEADER);
        out.write_u16(((self.platform as u16) << 8) | (self.version_made_by & 0x00FF));
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
        out.write_u16(self.comment_len);
        out.write_u16(self.disk_number_start);
        out.write_u16(self.internal_attrs);
        out.write_u32(self.external_attrs);
        out.write_u32(self.local_header_offset);
    }

    /// Total fixed + variable length, given the already-known name/extra/
    /// comment byte lengths.
    pub fn total_len(&self) -> usize {
        FIXED_SIZE + self.name_len as usize + self.extra_len as usize + self.comment_len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CentralHeader {
        CentralHeader {
            version_made_by: 20,
            platform: 3,
            version_needed: 20,
            flags: GeneralPurposeFlags::new(0x0800),
            method: 8,
            mod_time: 0,
            mod_date: 0,
            crc32: 1,
            compressed_size: 2,
            uncompressed_size: 3,
            name_len: 4,
            extra_len: 0,
            comment_len: 0,
            disk_number_start: 0,
            internal_attrs: 0,
            external_attrs: 0o100644 << 16,
            local_header_offset: 128,
        }
    }

    #[test]
    fn round_trips() {
        let header = sample();
        let mut w = ByteWriter::new();
        header.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), FIXED_SIZE);
        let parsed = CentralHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_unexpected_disk_number() {
        let mut header = sample();
        header.disk_number_start = 1;
        let mut w = ByteWriter::new();
        header.write(&mut w);
        assert!(matches!(
            CentralHeader::parse(&w.into_vec()),
            Err(SZipError::MultiDisk(1))
        ));
    }

    #[test]
    fn allows_zip64_disk_sentinel() {
        let mut header = sample();
        header.disk_number_start = 0xFFFF;
        let mut w = ByteWriter::new();
        header.write(&mut w);
        assert!(CentralHeader::parse(&w.into_vec()).is_ok());
    }
}
