//! End-of-central-directory trailer: EOCDR location, ZIP64 locator and
//! EOCDR, and the writer-side decision of when ZIP64 is required.

use super::{verify_signature, SIG_EOCDR, SIG_ZIP64_EOCDL, SIG_ZIP64_EOCDR};
use crate::binio::{ByteReader, ByteWriter};
use crate::error::{Result, SZipError};

pub const EOCDR_MIN_SIZE: usize = 22;
pub const ZIP64_EOCDL_SIZE: usize = 20;
pub const ZIP64_EOCDR_MIN_SIZE: usize = 56;
pub const MAX_COMMENT_LEN: usize = 0xFFFF;

/// The base (32-bit) end-of-central-directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eocdr {
    pub disk_number: u16,
    pub disk_with_cd_start: u16,
    pub entries_this_disk: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Vec<u8>,
}

impl Eocdr {
    pub fn parse(data: &[u8]) -> Result<Eocdr> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_EOCDR)?;
        let disk_number = r.read_u16()?;
        let disk_with_cd_start = r.read_u16()?;
        let entries_this_disk = r.read_u16()?;
        let total_entries = r.read_u16()?;
        let cd_size = r.read_u32()?;
        let cd_offset = r.read_u32()?;
        let comment_len = r.read_u16()? as usize;
        let comment = r.take(comment_len)?.to_vec();
        Ok(Eocdr {
            disk_number,
            disk_with_cd_start,
            entries_this_disk,
            total_entries,
            cd_size,
            cd_offset,
            comment,
        })
    }

    pub fn write(&self, out: &mut ByteWriter) {
        out.write_u32(SIG_EOCDR);
        out.write_u16(self.disk_number);
        out.write_u16(self.disk_with_cd_start);
        out.write_u16(self.entries_this_disk);
        out.write_u16(self.total_entries);
        out.write_u32(self.cd_size);
        out.write_u32(self.cd_offset);
        out.write_u16(self.comment.len() as u16);
        out.write_bytes(&self.comment);
    }
}

/// The ZIP64 locator, a fixed 20-byte record immediately preceding the
/// base EOCDR when ZIP64 is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Eocdl {
    pub disk_with_zip64_eocd: u32,
    pub zip64_eocd_offset: u64,
    pub total_disks: u32,
}

impl Zip64Eocdl {
    pub fn parse(data: &[u8]) -> Result<Zip64Eocdl> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_ZIP64_EOCDL)?;
        let disk_with_zip64_eocd = r.read_u32()?;
        let zip64_eocd_offset = r.read_u64()?;
        let total_disks = r.read_u32()?;
        if disk_with_zip64_eocd != 0 || total_disks != 1 {
            return Err(SZipError::MultiDisk(total_disks as u16));
        }
        Ok(Zip64Eocdl {
            disk_with_zip64_eocd,
            zip64_eocd_offset,
            total_disks,
        })
    }

    pub fn write(&self, out: &mut ByteWriter) {
        out.write_u32(SIG_ZIP64_EOCDL);
        out.write_u32(self.disk_with_zip64_eocd);
        out.write_u64(self.zip64_eocd_offset);
        out.write_u32(self.total_disks);
    }
}

/// The ZIP64 end-of-central-directory record: a 56-byte fixed prefix,
/// optionally followed by an extensible data sector this crate ignores on
/// read and never emits on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Eocdr {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd_start: u32,
    pub entries_this_disk: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64Eocdr {
    pub fn parse(data: &[u8]) -> Result<Zip64Eocdr> {
        let mut r = ByteReader::new(data);
        let signature = r.read_u32()?;
        verify_signature(signature, SIG_ZIP64_EOCDR)?;
        let _record_size = r.read_u64()?; // excludes signature + this field
        let version_made_by = r.read_u16()?;
        let version_needed = r.read_u16()?;
        let disk_number = r.read_u32()?;
        let disk_with_cd_start = r.read_u32()?;
        let entries_this_disk = r.read_u64()?;
        let total_entries = r.read_u64()?;
        let cd_size = r.read_u64()?;
        let cd_offset = r.read_u64()?;
        Ok(Zip64Eocdr {
            version_made_by,
            version_needed,
            disk_number,
            disk_with_cd_start,
            entries_this_disk,
            total_entries,
            cd_size,
            cd_offset,
        })
    }

    pub fn write(&self, out: &mut ByteWriter) {
        out.write_u32(SIG_ZIP64_EOCDR);
        // Fixed fields after this one occupy exactly 44 bytes.
        out.write_u64(44);
        out.write_u16(self.version_made_by);
        out.write_u16(self.version_needed);
        out.write_u32(self.disk_number);
        out.write_u32(self.disk_with_cd_start);
        out.write_u64(self.entries_this_disk);
        out.write_u64(self.total_entries);
        out.write_u64(self.cd_size);
        out.write_u64(self.cd_offset);
    }
}

/// The fully resolved trailer, after combining the base EOCDR with an
/// optional ZIP64 override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub entry_count: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    pub comment: Vec<u8>,
    pub zip64: Option<(u16, u16)>,
}

/// Outcome of attempting to locate the trailer within an in-memory tail
/// window, realizing the `NEEDS_ZIP64_REFILL | ZIP64_INLINE | NO_ZIP64`
/// states from spec.md §4.17.
#[derive(Debug)]
pub enum LocateResult {
    Found(Trailer),
    /// The ZIP64 EOCDR lies outside the supplied window; the caller should
    /// read `length` bytes at absolute file `offset` and retry.
    NeedMoreBytes { offset: u64, length: usize },
}

/// Locate and parse the trailer within `tail`, the last bytes of the
/// archive. `tail_start` is the absolute file offset of `tail[0]`; the
/// caller is expected to have supplied a window ending at end-of-file.
pub fn locate_trailer(tail: &[u8], tail_start: u64) -> Result<LocateResult> {
    let file_size = tail_start + tail.len() as u64;
    let scan_floor = file_size
        .saturating_sub((EOCDR_MIN_SIZE + MAX_COMMENT_LEN) as u64)
        .max(tail_start);
    let scan_ceiling = file_size.saturating_sub(EOCDR_MIN_SIZE as u64).max(tail_start);

    let mut eocdr_at = None;
    let mut pos = scan_ceiling;
    loop {
        let rel = (pos - tail_start) as usize;
        if tail.len() >= rel + 4 && u32::from_le_bytes(tail[rel..rel + 4].try_into().unwrap()) == SIG_EOCDR {
            eocdr_at = Some(pos);
            break;
        }
        if pos == scan_floor {
            break;
        }
        pos -= 1;
    }

    let eocdr_offset = eocdr_at.ok_or_else(|| {
        SZipError::InvalidFormat("end of central directory record not found".to_string())
    })?;
    let eocdr_rel = (eocdr_offset - tail_start) as usize;
    let eocdr = Eocdr::parse(&tail[eocdr_rel..])?;

    let mut zip64 = None;
    if eocdr_offset >= tail_start + ZIP64_EOCDL_SIZE as u64 {
        let locator_rel = eocdr_rel - ZIP64_EOCDL_SIZE;
        let maybe_sig = u32::from_le_bytes(tail[locator_rel..locator_rel + 4].try_into().unwrap());
        if maybe_sig == SIG_ZIP64_EOCDL {
            let locator = Zip64Eocdl::parse(&tail[locator_rel..locator_rel + ZIP64_EOCDL_SIZE])?;
            if locator.zip64_eocd_offset < tail_start {
                return Ok(LocateResult::NeedMoreBytes {
                    offset: locator.zip64_eocd_offset,
                    length: ZIP64_EOCDR_MIN_SIZE,
                });
            }
            let zip64_rel = (locator.zip64_eocd_offset - tail_start) as usize;
            if zip64_rel + ZIP64_EOCDR_MIN_SIZE > tail.len() {
                return Ok(LocateResult::NeedMoreBytes {
                    offset: locator.zip64_eocd_offset,
                    length: ZIP64_EOCDR_MIN_SIZE,
                });
            }
            let record = Zip64Eocdr::parse(&tail[zip64_rel..])?;
            zip64 = Some(record);
        }
    }

    let trailer = match zip64 {
        Some(z) => Trailer {
            entry_count: z.total_entries,
            cd_size: z.cd_size,
            cd_offset: z.cd_offset,
            comment: eocdr.comment,
            zip64: Some((z.version_made_by, z.version_needed)),
        },
        None => Trailer {
            entry_count: eocdr.total_entries as u64,
            cd_size: eocdr.cd_size as u64,
            cd_offset: eocdr.cd_offset as u64,
            comment: eocdr.comment,
            zip64: None,
        },
    };
    Ok(LocateResult::Found(trailer))
}

/// Whether the writer must emit a ZIP64 trailer, per spec.md §4.9.
pub fn requires_zip64_trailer(entry_count: u64, any_entry_zip64: bool, cd_offset: u64) -> bool {
    entry_count > 0xFFFE || any_entry_zip64 || cd_offset >= 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_plain_archive(comment: &[u8]) -> Vec<u8> {
        let mut w = ByteWriter::new();
        let eocdr = Eocdr {
            disk_number: 0,
            disk_with_cd_start: 0,
            entries_this_disk: 3,
            total_entries: 3,
            cd_size: 120,
            cd_offset: 1000,
            comment: comment.to_vec(),
        };
        eocdr.write(&mut w);
        w.into_vec()
    }

    #[test]
    fn locates_eocdr_at_tail_with_no_comment() {
        let bytes = build_plain_archive(b"");
        let result = locate_trailer(&bytes, 0).unwrap();
        match result {
            LocateResult::Found(t) => {
                assert_eq!(t.entry_count, 3);
                assert_eq!(t.cd_offset, 1000);
                assert!(t.zip64.is_none());
            }
            LocateResult::NeedMoreBytes { .. } => panic!("expected Found"),
        }
    }

    #[test]
    fn locates_eocdr_with_comment() {
        let comment = vec![b'x'; 50];
        let bytes = build_plain_archive(&comment);
        let result = locate_trailer(&bytes, 0).unwrap();
        match result {
            LocateResult::Found(t) => assert_eq!(t.comment.len(), 50),
            LocateResult::NeedMoreBytes { .. } => panic!("expected Found"),
        }
    }

    #[test]
    fn missing_eocdr_is_format_error() {
        let bytes = vec![0u8; 100];
        assert!(locate_trailer(&bytes, 0).is_err());
    }

    #[test]
    fn zip64_inline_overrides_base_fields() {
        let mut w = ByteWriter::new();
        let zip64_offset = 0u64;
        let zip64 = Zip64Eocdr {
            version_made_by: 45,
            version_needed: 45,
            disk_number: 0,
            disk_with_cd_start: 0,
            entries_this_disk: 70000,
            total_entries: 70000,
            cd_size: 999_999_999_999,
            cd_offset: 5_000_000_000,
        };
        zip64.write(&mut w);
        let locator = Zip64Eocdl {
            disk_with_zip64_eocd: 0,
            zip64_eocd_offset: zip64_offset,
            total_disks: 1,
        };
        locator.write(&mut w);
        let eocdr = Eocdr {
            disk_number: 0,
            disk_with_cd_start: 0,
            entries_this_disk: 0xFFFF,
            total_entries: 0xFFFF,
            cd_size: 0xFFFF_FFFF,
            cd_offset: 0xFFFF_FFFF,
            comment: vec![],
        };
        eocdr.write(&mut w);
        let bytes = w.into_vec();

        let result = locate_trailer(&bytes, 0).unwrap();
        match result {
            LocateResult::Found(t) => {
                assert_eq!(t.entry_count, 70000);
                assert_eq!(t.cd_offset, 5_000_000_000);
                assert!(t.zip64.is_some());
            }
            LocateResult::NeedMoreBytes { .. } => panic!("expected Found"),
        }
    }

    #[test]
    fn requires_zip64_decision() {
        assert!(requires_zip64_trailer(0xFFFF, false, 0));
        assert!(requires_zip64_trailer(1, true, 0));
        assert!(requires_zip64_trailer(1, false, 0xFFFF_FFFF));
        assert!(!requires_zip64_trailer(1, false, 0));
    }
}
