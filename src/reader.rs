//! Streaming ZIP reader: locates the trailer, walks the central directory,
//! and lazily decompresses entry payloads on demand.
//!
//! Generic over any `Read + Seek` source so the same code serves both the
//! whole-file case (`open`, spec.md §4.13's buffer reader) and an
//! in-memory archive (`from_bytes`). Central-directory values are always
//! trusted over local-header placeholders, per spec.md §4.7.

use crate::attrs::{AttributeView, FileAttributes, Platform};
use crate::cp437;
use crate::dostime::DosDateTime;
use crate::entry::EntryReader;
use crate::error::{Result, SZipError};
use crate::extra::{self, ExtraRecord, UnicodeExtraField, Zip64Field, Zip64Presence};
use crate::flags::GeneralPurposeFlags;
use crate::format::{self, central::{self, CentralHeader}, local::LocalHeader, trailer};
use crate::pipeline::{open_decompressor, CompressionMethod, VerifyingReader};
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Default tail window read when locating the trailer (spec.md §4.14).
const DEFAULT_TAIL_WINDOW: u64 = 1024 * 1024;

/// One member of the archive's central directory, generalizing spec.md
/// §3's "Directory entry" entity.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub comment: String,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub compression_method: u16,
    pub flags: GeneralPurposeFlags,
    pub platform: Platform,
    pub attributes: FileAttributes,
    pub version_made_by: u16,
    pub version_needed: u16,
    /// Local file header offset (ZIP64-resolved).
    pub offset: u64,
    pub extra: Vec<ExtraRecord>,
}

impl ZipEntry {
    /// A path ending in `/` is always a directory, regardless of what the
    /// attribute field says; otherwise defer to the attribute variant's
    /// (possibly unknown) view, per spec.md §3.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.attributes.is_directory() == Some(true)
    }
}

/// Archive-level summary parsed from the trailer (spec.md §3's "Archive
/// trailer" entity).
#[derive(Debug, Clone)]
pub struct Trailer {
    pub comment: String,
    pub entry_count: u64,
    pub cd_offset: u64,
    pub cd_size: u64,
    pub zip64: Option<(u16, u16)>,
}

/// Streaming ZIP archive reader over any seekable byte source.
pub struct StreamingZipReader<S> {
    source: S,
    trailer: Trailer,
    entries: Vec<ZipEntry>,
}

impl StreamingZipReader<BufReader<File>> {
    /// Open a ZIP file and read its central directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut source = BufReader::new(File::open(path)?);
        let trailer = locate_trailer(&mut source)?;
        let entries = read_central_directory(&mut source, &trailer)?;
        Ok(Self {
            source,
            trailer,
            entries,
        })
    }
}

impl StreamingZipReader<Cursor<Vec<u8>>> {
    /// Build a reader over an in-memory archive, per spec.md §4.13's
    /// whole-archive-in-memory buffer reader. Parsing happens synchronously
    /// against the slice; no further I/O occurs until an entry is read.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut source = Cursor::new(bytes);
        let trailer = locate_trailer(&mut source)?;
        let entries = read_central_directory(&mut source, &trailer)?;
        Ok(Self {
            source,
            trailer,
            entries,
        })
    }
}

impl<S: Read + Seek> StreamingZipReader<S> {
    /// The parsed archive trailer (comment, entry count, directory
    /// location).
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// All entries, in central-directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Find an entry by exact path.
    pub fn find_entry(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Open a lazily-decompressing, CRC/size-verifying stream over one
    /// entry's uncompressed bytes.
    pub fn read_entry_streaming(&mut self, entry: &ZipEntry) -> Result<EntryReader<'_>> {
        let payload_offset = locate_payload(&mut self.source, entry)?;
        self.source.seek(SeekFrom::Start(payload_offset))?;
        let method = CompressionMethod::try_from(entry.compression_method)?;
        let limited = (&mut self.source).take(entry.compressed_size);
        let decompressed = open_decompressor(method, limited);
        let verifying = VerifyingReader::new(decompressed, entry.crc32, entry.uncompressed_size);
        Ok(EntryReader::new(Box::new(verifying)))
    }

    /// Fully buffer one entry's decompressed bytes.
    pub fn read_entry(&mut self, entry: &ZipEntry) -> Result<Vec<u8>> {
        self.read_entry_streaming(entry)?.read_to_vec()
    }

    /// Look up and fully buffer an entry by path.
    pub fn read_entry_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| SZipError::EntryNotFound(name.to_string()))?
            .clone();
        self.read_entry(&entry)
    }

    /// Open a streaming entry by path.
    pub fn read_entry_streaming_by_name(&mut self, name: &str) -> Result<EntryReader<'_>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| SZipError::EntryNotFound(name.to_string()))?
            .clone();
        self.read_entry_streaming(&entry)
    }
}

/// Seek past the local header (fixed prefix + name + extra) and return the
/// absolute offset where the compressed payload begins.
fn locate_payload<S: Read + Seek>(source: &mut S, entry: &ZipEntry) -> Result<u64> {
    source.seek(SeekFrom::Start(entry.offset))?;
    let mut fixed = [0u8; format::local::FIXED_SIZE];
    source.read_exact(&mut fixed)?;
    let header = LocalHeader::parse(&fixed)?;
    let payload_offset =
        entry.offset + format::local::FIXED_SIZE as u64 + header.name_len as u64 + header.extra_len as u64;
    Ok(payload_offset)
}

/// Read a tail window ending at end-of-file, expanding it backward as
/// needed to cover a ZIP64 EOCDR that lies outside the window (spec.md
/// §4.9's "need more bytes" signal / §4.14's refill behavior).
fn locate_trailer<S: Read + Seek>(source: &mut S) -> Result<Trailer> {
    let file_size = source.seek(SeekFrom::End(0))?;
    let mut window_start = file_size.saturating_sub(DEFAULT_TAIL_WINDOW.min(file_size));
    loop {
        trace!("scanning tail window starting at offset {window_start}");
        source.seek(SeekFrom::Start(window_start))?;
        let mut buf = vec![0u8; (file_size - window_start) as usize];
        source.read_exact(&mut buf)?;
        match trailer::locate_trailer(&buf, window_start)? {
            trailer::LocateResult::Found(t) => {
                debug!(
                    "located trailer: {} entries, central directory at {:#x}, zip64={}",
                    t.entry_count,
                    t.cd_offset,
                    t.zip64.is_some()
                );
                let comment = decode_text(&t.comment, false, None);
                return Ok(Trailer {
                    comment,
                    entry_count: t.entry_count,
                    cd_offset: t.cd_offset,
                    cd_size: t.cd_size,
                    zip64: t.zip64,
                });
            }
            trailer::LocateResult::NeedMoreBytes { offset, .. } => {
                if offset >= window_start {
                    return Err(SZipError::InvalidFormat(
                        "zip64 end of central directory record location did not advance"
                            .to_string(),
                    ));
                }
                trace!("zip64 eocd locator points outside window, refilling from {offset}");
                window_start = offset;
            }
        }
    }
}

fn read_central_directory<S: Read + Seek>(
    source: &mut S,
    trailer: &Trailer,
) -> Result<Vec<ZipEntry>> {
    source.seek(SeekFrom::Start(trailer.cd_offset))?;
    let mut entries = Vec::with_capacity(trailer.entry_count as usize);
    for _ in 0..trailer.entry_count {
        let mut fixed = [0u8; central::FIXED_SIZE];
        source.read_exact(&mut fixed)?;
        let header = CentralHeader::parse(&fixed)?;

        let mut name_buf = vec![0u8; header.name_len as usize];
        source.read_exact(&mut name_buf)?;
        let mut extra_buf = vec![0u8; header.extra_len as usize];
        source.read_exact(&mut extra_buf)?;
        let mut comment_buf = vec![0u8; header.comment_len as usize];
        source.read_exact(&mut comment_buf)?;

        let extra = extra::parse_extra_fields(&extra_buf)?;
        let presence = Zip64Presence {
            uncompressed_size: header.uncompressed_size == 0xFFFF_FFFF,
            compressed_size: header.compressed_size == 0xFFFF_FFFF,
            local_header_offset: header.local_header_offset == 0xFFFF_FFFF,
            disk_start_number: false,
        };
        let zip64 = extra
            .iter()
            .find(|r| r.tag == extra::TAG_ZIP64)
            .map(|r| Zip64Field::parse(&r.payload, presence))
            .transpose()?
            .unwrap_or_default();

        let uncompressed_size = zip64
            .uncompressed_size
            .unwrap_or(header.uncompressed_size as u64);
        let compressed_size = zip64
            .compressed_size
            .unwrap_or(header.compressed_size as u64);
        let offset = zip64
            .local_header_offset
            .unwrap_or(header.local_header_offset as u64);

        let platform = Platform::try_from(header.platform)?;
        let attributes = FileAttributes::from_external(platform, header.external_attrs);

        let utf8 = header.flags.utf8();
        let unicode_path = extra
            .iter()
            .find(|r| r.tag == extra::TAG_UNICODE_PATH)
            .and_then(|r| UnicodeExtraField::parse(&r.payload).ok());
        let unicode_comment = extra
            .iter()
            .find(|r| r.tag == extra::TAG_UNICODE_COMMENT)
            .and_then(|r| UnicodeExtraField::parse(&r.payload).ok());

        let name = decode_text(&name_buf, utf8, unicode_path.as_ref());
        let comment = decode_text(&comment_buf, utf8, unicode_comment.as_ref());

        trace!(
            "central directory entry {:?}: method={} size={} -> {} at offset {:#x}",
            name,
            header.method,
            compressed_size,
            uncompressed_size,
            offset
        );

        entries.push(ZipEntry {
            name,
            comment,
            modified: DosDateTime::unpack(header.mod_date, header.mod_time),
            crc32: header.crc32,
            compressed_size,
            uncompressed_size,
            compression_method: header.method,
            flags: header.flags,
            platform,
            attributes,
            version_made_by: header.version_made_by,
            version_needed: header.version_needed,
            offset,
            extra,
        });
    }
    Ok(entries)
}

/// Decode a raw path/comment byte string per spec.md §4.6's policy: UTF-8
/// directly when the general-purpose bit is set; otherwise CP437, with an
/// Info-ZIP Unicode extra field override when its stored CRC still matches
/// the CP437 re-encoding.
pub(crate) fn decode_text(
    raw: &[u8],
    utf8_flag: bool,
    unicode_override: Option<&UnicodeExtraField>,
) -> String {
    if utf8_flag {
        return String::from_utf8_lossy(raw).into_owned();
    }
    let cp437_text = cp437::decode(raw);
    if let Some(field) = unicode_override {
        if let Some(resolved) = field.resolve(&cp437_text) {
            return resolved.to_string();
        }
    }
    cp437_text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::StreamingZipWriter;
    use std::io::Write as _;

    fn build_sample(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("sample.zip");
        let mut w = StreamingZipWriter::new(&path).unwrap();
        w.start_entry("hello.txt").unwrap();
        w.write_data(b"hello world").unwrap();
        w.start_entry("dir/").unwrap();
        w.finish().unwrap();
        path
    }

    #[test]
    fn opens_and_lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let reader = StreamingZipReader::open(&path).unwrap();
        assert_eq!(reader.entries().len(), 2);
        assert!(reader.find_entry("hello.txt").is_some());
        assert!(reader.find_entry("dir/").unwrap().is_directory());
    }

    #[test]
    fn round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let mut reader = StreamingZipReader::open(&path).unwrap();
        let data = reader.read_entry_by_name("hello.txt").unwrap();
        assert_eq!(data, b"hello world");
    }

    #[test]
    fn from_bytes_matches_file_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let bytes = std::fs::read(&path).unwrap();
        let mut reader = StreamingZipReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.read_entry_by_name("hello.txt").unwrap(), b"hello world");
    }

    #[test]
    fn empty_archive_with_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.zip");
        let w = StreamingZipWriter::new(&path).unwrap();
        w.finish_with_comment("Gordon is cool").unwrap();
        let reader = StreamingZipReader::open(&path).unwrap();
        assert_eq!(reader.entries().len(), 0);
        assert_eq!(reader.trailer().comment, "Gordon is cool");
    }

    #[test]
    fn corrupted_archive_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.zip");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"not a zip file").unwrap();
        assert!(StreamingZipReader::open(&path).is_err());
    }
}
