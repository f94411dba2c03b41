//! Extra-field codec: the tagged `(tag, size, data)` records that trail
//! the filename in both local and central headers.

use crate::binio::{ByteReader, ByteWriter};
use crate::cp437;
use crate::error::{Result, SZipError};
use log::warn;

pub const TAG_ZIP64: u16 = 0x0001;
pub const TAG_UNICODE_PATH: u16 = 0x7075;
pub const TAG_UNICODE_COMMENT: u16 = 0x6375;

/// A single raw extra-field record before typed interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraRecord {
    pub tag: u16,
    pub payload: Vec<u8>,
}

/// Walk the tag-length-value sequence that makes up an extra field blob.
/// Fails with [`SZipError::InvalidFormat`] if a record's declared size
/// overruns the buffer.
pub fn parse_extra_fields(data: &[u8]) -> Result<Vec<ExtraRecord>> {
    let mut records = Vec::new();
    let mut r = ByteReader::new(data);
    while r.remaining() > 0 {
        if r.remaining() < 4 {
            return Err(SZipError::InvalidFormat(
                "truncated extra field header".to_string(),
            ));
        }
        let tag = r.read_u16()?;
        let size = r.read_u16()? as usize;
        let payload = r.take(size)?.to_vec();
        records.push(ExtraRecord { tag, payload });
    }
    Ok(records)
}

/// Serialize a list of records back to their tag-length-value encoding.
pub fn write_extra_fields(records: &[ExtraRecord]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    for record in records {
        w.write_u16(record.tag);
        w.write_u16(record.payload.len() as u16);
        w.write_bytes(&record.payload);
    }
    w.into_vec()
}

/// Which 32-bit header slots were sentinels, determining which 8-byte
/// fields the ZIP64 extra field carries, in this fixed order: uncompressed
/// size, compressed size, local header offset, disk start number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64Presence {
    pub uncompressed_size: bool,
    pub compressed_size: bool,
    pub local_header_offset: bool,
    pub disk_start_number: bool,
}

/// Decoded ZIP64 extended information, fields present per [`Zip64Presence`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Field {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub local_header_offset: Option<u64>,
    pub disk_start_number: Option<u32>,
}

impl Zip64Field {
    /// Parse a ZIP64 extra field payload, reading only the fields flagged
    /// present by `presence` (the header's 32-bit sentinel positions), in
    /// APPNOTE's fixed order. A payload shorter than the flagged fields
    /// require is a format error.
    pub fn parse(payload: &[u8], presence: Zip64Presence) -> Result<Zip64Field> {
        let mut r = ByteReader::new(payload);
        let mut field = Zip64Field::default();
        if presence.uncompressed_size {
            field.uncompressed_size = Some(r.read_u64().map_err(|_| too_short())?);
        }
        if presence.compressed_size {
            field.compressed_size = Some(r.read_u64().map_err(|_| too_short())?);
        }
        if presence.local_header_offset {
            field.local_header_offset = Some(r.read_u64().map_err(|_| too_short())?);
        }
        if presence.disk_start_number {
            let disk = r.read_u32().map_err(|_| too_short())?;
            if disk != 0 {
                return Err(SZipError::MultiDisk(disk as u16));
            }
            field.disk_start_number = Some(disk);
        }
        Ok(field)
    }

    /// Serialize exactly the fields flagged present, in APPNOTE order.
    /// Called fresh from the entry's current sizes/offset; never a
    /// pass-through of a previously-parsed payload.
    pub fn write(self, presence: Zip64Presence) -> Vec<u8> {
        let mut w = ByteWriter::new();
        if presence.uncompressed_size {
            w.write_u64(self.uncompressed_size.unwrap_or(0));
        }
        if presence.compressed_size {
            w.write_u64(self.compressed_size.unwrap_or(0));
        }
        if presence.local_header_offset {
            w.write_u64(self.local_header_offset.unwrap_or(0));
        }
        if presence.disk_start_number {
            w.write_u32(self.disk_start_number.unwrap_or(0));
        }
        w.into_vec()
    }
}

fn too_short() -> SZipError {
    SZipError::InvalidFormat("zip64 extra field shorter than its declared fields".to_string())
}

/// Decoded Info-ZIP Unicode path/comment field (tags 0x7075 / 0x6375):
/// `{version: u8, crc32_of_cp437_original: u32, utf8_bytes: rest}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicodeExtraField {
    pub crc32_of_original: u32,
    pub utf8_value: String,
}

impl UnicodeExtraField {
    pub fn parse(payload: &[u8]) -> Result<UnicodeExtraField> {
        let mut r = ByteReader::new(payload);
        let version = r.read_u8()?;
        if version != 1 {
            return Err(SZipError::InvalidFormat(format!(
                "unsupported Info-ZIP unicode extra field version {version}"
            )));
        }
        let crc32_of_original = r.read_u32()?;
        let utf8_bytes = r.take(r.remaining())?;
        let utf8_value = String::from_utf8(utf8_bytes.to_vec())
            .map_err(|e| SZipError::Encoding(e.to_string()))?;
        Ok(UnicodeExtraField {
            crc32_of_original,
            utf8_value,
        })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_u8(1);
        w.write_u32(self.crc32_of_original);
        w.write_bytes(self.utf8_value.as_bytes());
        w.into_vec()
    }

    /// Resolve an Info-ZIP Unicode extra field against the header's
    /// current CP437-decoded text: if the stored CRC-32 matches the
    /// CP437-reencoded current text, the field's UTF-8 value overrides it;
    /// otherwise the field is stale (the entry has since been renamed) and
    /// is ignored.
    pub fn resolve(&self, current_cp437_text: &str) -> Option<&str> {
        let cp437_bytes = cp437::encode(current_cp437_text)?;
        let crc = crc32fast::hash(&cp437_bytes);
        if crc == self.crc32_of_original {
            Some(&self.utf8_value)
        } else {
            warn!(
                "Info-ZIP Unicode extra field CRC mismatch for {:?}: stored {:#010x}, recomputed {:#010x}; ignoring stale field",
                current_cp437_text, self.crc32_of_original, crc
            );
            None
        }
    }

    /// Build a fresh Unicode extra field for `text`, keyed to the CP437
    /// encoding of `cp437_text` (the header's base-encoded value).
    pub fn build(cp437_text: &str, utf8_text: &str) -> Option<UnicodeExtraField> {
        let cp437_bytes = cp437::encode(cp437_text)?;
        Some(UnicodeExtraField {
            crc32_of_original: crc32fast::hash(&cp437_bytes),
            utf8_value: utf8_text.to_string(),
        })
    }
}
