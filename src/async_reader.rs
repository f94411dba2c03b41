//! Async streaming ZIP reader, generic over any `AsyncRead + AsyncSeek +
//! Unpin + Send` source (a file, an in-memory cursor, a network stream).
//!
//! Mirrors `reader.rs`'s model exactly: locate the trailer, walk the
//! central directory once at open time, then lazily decompress entry
//! payloads on demand. The only difference is that every I/O call is
//! `.await`ed and the fixed-size record codecs in `format::{local,central,
//! trailer}` are driven by buffers fetched asynchronously instead of
//! synchronously — parsing itself stays the same pure byte-slice code the
//! sync reader uses.

use crate::error::{Result, SZipError};
use crate::extra::{self, UnicodeExtraField, Zip64Field, Zip64Presence};
use crate::format::{self, central::{self, CentralHeader}, local::LocalHeader, trailer};
use crate::pipeline::CompressionMethod;
use crate::reader::{decode_text, Trailer, ZipEntry};
use crate::attrs::{FileAttributes, Platform};
use crate::dostime::DosDateTime;
use async_compression::tokio::bufread::DeflateDecoder;
use log::{debug, trace};
use crc32fast::Hasher as Crc32;
use std::io::SeekFrom;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, BufReader, ReadBuf};

/// Default tail window read when locating the trailer, matching the sync
/// reader's choice.
const DEFAULT_TAIL_WINDOW: u64 = 1024 * 1024;

/// Generic async streaming ZIP reader over any async seekable source.
pub struct GenericAsyncZipReader<R: AsyncRead + AsyncSeek + Unpin + Send> {
    source: BufReader<R>,
    trailer: Trailer,
    entries: Vec<ZipEntry>,
}

/// Convenience alias for the common file-backed case.
pub type AsyncStreamingZipReader = GenericAsyncZipReader<File>;

impl AsyncStreamingZipReader {
    /// Open a ZIP file and read its central directory with a default
    /// buffer size.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_buffer_size(path, None).await
    }

    /// Open a ZIP file with a caller-chosen read buffer size, for tuning
    /// throughput against very large archives.
    pub async fn open_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: Option<usize>,
    ) -> Result<Self> {
        let file = File::open(path).await?;
        GenericAsyncZipReader::new_with_buffer_size(file, buffer_size).await
    }
}

impl<R: AsyncRead + AsyncSeek + Unpin + Send> GenericAsyncZipReader<R> {
    /// Wrap any async seekable source and read its central directory with a
    /// default buffer size.
    pub async fn new(source: R) -> Result<Self> {
        Self::new_with_buffer_size(source, None).await
    }

    /// Wrap any async seekable source with a caller-chosen read buffer
    /// size.
    pub async fn new_with_buffer_size(source: R, buffer_size: Option<usize>) -> Result<Self> {
        let buf_size = buffer_size.unwrap_or(64 * 1024);
        let mut source = BufReader::with_capacity(buf_size, source);
        let trailer = locate_trailer(&mut source).await?;
        let entries = read_central_directory(&mut source, &trailer).await?;
        Ok(Self {
            source,
            trailer,
            entries,
        })
    }

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
    pub async fn read_entry_streaming<'a>(
        &'a mut self,
        entry: &ZipEntry,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send + 'a>> {
        let payload_offset = locate_payload(&mut self.source, entry).await?;
        self.source.seek(SeekFrom::Start(payload_offset)).await?;
        let method = CompressionMethod::try_from(entry.compression_method)?;
        let limited = (&mut self.source).take(entry.compressed_size);
        let verifying: Box<dyn AsyncRead + Unpin + Send + 'a> = match method {
            CompressionMethod::Stored => Box::new(AsyncVerifyingReader::new(
                limited,
                entry.crc32,
                entry.uncompressed_size,
            )),
            CompressionMethod::Deflate => {
                let decoder = DeflateDecoder::new(BufReader::new(limited));
                Box::new(AsyncVerifyingReader::new(
                    decoder,
                    entry.crc32,
                    entry.uncompressed_size,
                ))
            }
        };
        Ok(verifying)
    }

    /// Fully buffer one entry's decompressed bytes.
    pub async fn read_entry(&mut self, entry: &ZipEntry) -> Result<Vec<u8>> {
        let mut stream = self.read_entry_streaming(entry).await?;
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await?;
        Ok(out)
    }

    /// Look up and fully buffer an entry by path.
    pub async fn read_entry_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| SZipError::EntryNotFound(name.to_string()))?
            .clone();
        self.read_entry(&entry).await
    }

    /// Open a streaming entry by path.
    pub async fn read_entry_streaming_by_name<'a>(
        &'a mut self,
        name: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send + 'a>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| SZipError::EntryNotFound(name.to_string()))?
            .clone();
        self.read_entry_streaming(&entry).await
    }
}

/// Wraps a decompressed async byte stream, accumulating CRC-32 and byte
/// count so that consuming the entry to EOF re-verifies it against the
/// declared values, exactly like `pipeline::VerifyingReader` on the sync
/// side (spec.md §4.10's invariant applies equally to the async reader).
struct AsyncVerifyingReader<R> {
    inner: R,
    hasher: Crc32,
    count: u64,
    expected_crc32: u32,
    expected_size: u64,
    checked: bool,
}

impl<R: AsyncRead + Unpin> AsyncVerifyingReader<R> {
    fn new(inner: R, expected_crc32: u32, expected_size: u64) -> Self {
        Self {
            inner,
            hasher: Crc32::new(),
            count: 0,
            expected_crc32,
            expected_size,
            checked: false,
        }
    }

    fn verify(&mut self) -> std::io::Result<()> {
        if self.checked {
            return Ok(());
        }
        self.checked = true;
        if self.count != self.expected_size {
            return Err(to_io_err(SZipError::InvalidFormat(format!(
                "file size mismatch: expected {} bytes, got {}",
                self.expected_size, self.count
            ))));
        }
        let crc = self.hasher.clone().finalize();
        if crc != self.expected_crc32 {
            return Err(to_io_err(SZipError::InvalidFormat(format!(
                "crc32 mismatch: expected {:#010x}, got {:#010x}",
                self.expected_crc32, crc
            ))));
        }
        Ok(())
    }
}

fn to_io_err(e: SZipError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}

impl<R: AsyncRead + Unpin> AsyncRead for AsyncVerifyingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len() - before;
                if n == 0 {
                    if let Err(e) = this.verify() {
                        return Poll::Ready(Err(e));
                    }
                } else {
                    this.hasher.update(&buf.filled()[before..]);
                    this.count += n as u64;
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

/// Seek past the local header (fixed prefix + name + extra) and return the
/// absolute offset where the compressed payload begins.
async fn locate_payload<R: AsyncRead + AsyncSeek + Unpin + Send>(
    source: &mut BufReader<R>,
    entry: &ZipEntry,
) -> Result<u64> {
    source.seek(SeekFrom::Start(entry.offset)).await?;
    let mut fixed = [0u8; format::local::FIXED_SIZE];
    source.read_exact(&mut fixed).await?;
    let header = LocalHeader::parse(&fixed)?;
    let payload_offset = entry.offset
        + format::local::FIXED_SIZE as u64
        + header.name_len as u64
        + header.extra_len as u64;
    Ok(payload_offset)
}

/// Read a tail window ending at end-of-file, expanding it backward as
/// needed to cover a ZIP64 EOCDR outside the window, mirroring the sync
/// reader's `locate_trailer`.
async fn locate_trailer<R: AsyncRead + AsyncSeek + Unpin + Send>(
    source: &mut BufReader<R>,
) -> Result<Trailer> {
    let file_size = source.seek(SeekFrom::End(0)).await?;
    let mut window_start = file_size.saturating_sub(DEFAULT_TAIL_WINDOW.min(file_size));
    loop {
        trace!("scanning tail window starting at offset {window_start}");
        source.seek(SeekFrom::Start(window_start)).await?;
        let mut buf = vec![0u8; (file_size - window_start) as usize];
        source.read_exact(&mut buf).await?;
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

async fn read_central_directory<R: AsyncRead + AsyncSeek + Unpin + Send>(
    source: &mut BufReader<R>,
    trailer: &Trailer,
) -> Result<Vec<ZipEntry>> {
    source.seek(SeekFrom::Start(trailer.cd_offset)).await?;
    let mut entries = Vec::with_capacity(trailer.entry_count as usize);
    for _ in 0..trailer.entry_count {
        let mut fixed = [0u8; central::FIXED_SIZE];
        source.read_exact(&mut fixed).await?;
        let header = CentralHeader::parse(&fixed)?;

        let mut name_buf = vec![0u8; header.name_len as usize];
        source.read_exact(&mut name_buf).await?;
        let mut extra_buf = vec![0u8; header.extra_len as usize];
        source.read_exact(&mut extra_buf).await?;
        let mut comment_buf = vec![0u8; header.comment_len as usize];
        source.read_exact(&mut comment_buf).await?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::StreamingZipWriter;

    fn build_sample(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("async_sample.zip");
        let mut w = StreamingZipWriter::new(&path).unwrap();
        w.start_entry("hello.txt").unwrap();
        w.write_data(b"hello world").unwrap();
        w.start_entry("dir/").unwrap();
        w.finish().unwrap();
        path
    }

    #[tokio::test]
    async fn opens_and_lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let reader = AsyncStreamingZipReader::open(&path).await.unwrap();
        assert_eq!(reader.entries().len(), 2);
        assert!(reader.find_entry("hello.txt").is_some());
        assert!(reader.find_entry("dir/").unwrap().is_directory());
    }

    #[tokio::test]
    async fn round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let mut reader = AsyncStreamingZipReader::open(&path).await.unwrap();
        let data = reader.read_entry_by_name("hello.txt").await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn streaming_read_matches_buffered_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let mut reader = AsyncStreamingZipReader::open(&path).await.unwrap();
        let mut stream = reader
            .read_entry_streaming_by_name("hello.txt")
            .await
            .unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn custom_buffer_size_still_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let reader = AsyncStreamingZipReader::open_with_buffer_size(&path, Some(4096))
            .await
            .unwrap();
        assert_eq!(reader.entries().len(), 2);
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let mut reader = AsyncStreamingZipReader::open(&path).await.unwrap();
        assert!(matches!(
            reader.read_entry_by_name("missing.txt").await,
            Err(SZipError::EntryNotFound(_))
        ));
    }
}
