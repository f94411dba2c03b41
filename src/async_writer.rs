//! Async streaming ZIP writer: the same entry-planning and central-
//! directory/trailer logic as `writer.rs` (via its shared `plan_entry`,
//! `finish_entry`, and `build_central_directory_and_trailer`), driven over
//! an `AsyncWrite` sink instead of a plain `std::fs::File`.
//!
//! Compression itself stays synchronous (`flate2`, same as the sync
//! writer) since it's CPU-bound, not I/O-bound; only header, payload, and
//! trailer bytes actually cross an `.await`. Compressed chunks pass
//! through a [`BoundedBuffer`] (spec.md §4.11) on their way to the output
//! sink, one high-water-mark-sized piece at a time, so the producer never
//! accumulates more than `high_water_mark` unflushed bytes.
//!
//! Every public method here takes `&mut self`, so Rust's borrow checker
//! already gives the single-writer exclusion spec.md models as a
//! semaphore around `start_entry`/`finish` — there's no second caller to
//! serialize against. `semaphore.rs` remains available for callers who
//! want to bound how many archives are being built concurrently, a
//! separate (and separately tested) use case.

use crate::binio::ByteWriter;
use crate::bounded_buffer::BoundedBuffer;
use crate::error::{Result, SZipError};
use crate::format::local;
use crate::pipeline::{self, CompressionMethod};
use crate::writer::{self, EntryOptions, EntryPlan, WrittenEntry};
use crc32fast::Hasher as Crc32Hasher;
use flate2::write::DeflateEncoder;
use std::io::Write as _;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Archive-wide async writer settings, mirroring `writer::WriterConfig`
/// plus the backpressure knob `BoundedBuffer` needs.
#[derive(Debug, Clone)]
pub struct AsyncWriterConfig {
    /// `flate2` compression level, 0 (store-like, fast) through 9 (best).
    pub compression_level: u32,
    /// Largest backlog (in bytes) the internal `BoundedBuffer` lets build
    /// up before the producer is made to wait for the consumer to drain.
    pub high_water_mark: usize,
    pub starting_offset: u64,
}

impl Default for AsyncWriterConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            high_water_mark: 40 * 1024,
            starting_offset: 0,
        }
    }
}

/// The write-side half of the compression pipeline, buffering whatever
/// the compressor has made available since the last call to `push`.
enum Compressor {
    Stored,
    Deflate(DeflateEncoder<Vec<u8>>),
}

impl Compressor {
    fn new(method: CompressionMethod, level: u32) -> Self {
        match method {
            CompressionMethod::Stored => Compressor::Stored,
            CompressionMethod::Deflate => {
                Compressor::Deflate(pipeline::deflate_encoder(Vec::new(), level))
            }
        }
    }

    /// Feed more uncompressed bytes in, returning whatever compressed
    /// bytes are ready to ship. `Deflate` flushes after every call so the
    /// writer can stream chunks as they arrive rather than buffering the
    /// whole entry, at a small compression-ratio cost.
    fn push(&mut self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Compressor::Stored => Ok(data.to_vec()),
            Compressor::Deflate(enc) => {
                enc.write_all(data)?;
                enc.flush()?;
                Ok(std::mem::take(enc.get_mut()))
            }
        }
    }

    /// Flush the final bytes (including DEFLATE's closing block).
    fn finish(self) -> std::io::Result<Vec<u8>> {
        match self {
            Compressor::Stored => Ok(Vec::new()),
            Compressor::Deflate(enc) => enc.finish(),
        }
    }
}

struct CurrentEntry {
    name: String,
    plan: EntryPlan,
    hasher: Crc32Hasher,
    uncompressed_count: u64,
    compressed_count: u64,
    compressor: Compressor,
}

/// Streaming ZIP archive writer over any `AsyncWrite` sink.
pub struct GenericAsyncZipWriter<W> {
    output: W,
    config: AsyncWriterConfig,
    bytes_written: u64,
    entries: Vec<WrittenEntry>,
    current: Option<CurrentEntry>,
    buffer: BoundedBuffer,
}

/// The common case: writing an archive straight to a file.
pub type AsyncStreamingZipWriter = GenericAsyncZipWriter<tokio::fs::File>;

impl GenericAsyncZipWriter<tokio::fs::File> {
    /// Create a new archive at `path` with default settings (DEFLATE level
    /// 6, no embedding offset).
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, AsyncWriterConfig::default()).await
    }

    /// Create a new archive at `path` with a specific DEFLATE compression
    /// level.
    pub async fn with_compression<P: AsRef<Path>>(path: P, level: u32) -> Result<Self> {
        Self::with_config(
            path,
            AsyncWriterConfig {
                compression_level: level,
                ..Default::default()
            },
        )
        .await
    }

    /// Create a new archive at `path` with full control over writer
    /// settings.
    pub async fn with_config<P: AsRef<Path>>(path: P, config: AsyncWriterConfig) -> Result<Self> {
        let output = tokio::fs::File::create(path).await?;
        Ok(Self::from_writer_with_config(output, config))
    }
}

impl<W: AsyncWrite + Unpin> GenericAsyncZipWriter<W> {
    /// Wrap an already-open `AsyncWrite` sink (e.g. an in-memory
    /// `Cursor<Vec<u8>>`) with default settings.
    pub fn from_writer(writer: W) -> Self {
        Self::from_writer_with_config(writer, AsyncWriterConfig::default())
    }

    pub fn from_writer_with_compression(writer: W, level: u32) -> Self {
        Self::from_writer_with_config(
            writer,
            AsyncWriterConfig {
                compression_level: level,
                ..Default::default()
            },
        )
    }

    pub fn from_writer_with_config(writer: W, config: AsyncWriterConfig) -> Self {
        let buffer = BoundedBuffer::new(config.high_water_mark);
        Self {
            output: writer,
            config,
            bytes_written: 0,
            entries: Vec::new(),
            current: None,
            buffer,
        }
    }

    async fn write_out(&mut self, bytes: &[u8]) -> Result<()> {
        self.output.write_all(bytes).await?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Push one already-compressed chunk through the bounded buffer: the
    /// buffer is always empty before and after this call, so `write` never
    /// has to suspend waiting for a concurrent reader that doesn't exist —
    /// this task is both producer and consumer, draining exactly what it
    /// just wrote before the next chunk goes in.
    async fn drain_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.buffer.write(chunk).await?;
        let drained = self.buffer.read(chunk.len()).await?;
        self.write_out(&drained).await
    }

    async fn push_compressed(&mut self, data: &[u8]) -> Result<()> {
        let mark = self.config.high_water_mark.max(1);
        for chunk in data.chunks(mark) {
            self.drain_chunk(chunk).await?;
        }
        Ok(())
    }

    /// Start a new entry with default policy (auto UTF-8, auto ZIP64,
    /// DEFLATE, a trailing data descriptor since no sizes are declared).
    /// Closes any entry already open.
    pub async fn start_entry(&mut self, name: &str) -> Result<()> {
        self.start_entry_with_options(name, EntryOptions::default()).await
    }

    /// Start a new entry, resolving the full `addFile` policy against
    /// `opts` before the local header is written. Closes any entry
    /// already open.
    pub async fn start_entry_with_options(&mut self, name: &str, opts: EntryOptions) -> Result<()> {
        self.finish_current_entry().await?;

        let local_header_offset = self.config.starting_offset + self.bytes_written;
        let plan = writer::plan_entry(name, &opts, local_header_offset)?;

        let mut w = ByteWriter::with_capacity(local::FIXED_SIZE);
        plan.header.write(&mut w);
        self.write_out(&w.into_vec()).await?;
        let name_bytes = plan.name_bytes.clone();
        self.write_out(&name_bytes).await?;
        let extra_bytes = plan.extra_bytes.clone();
        self.write_out(&extra_bytes).await?;

        let method = CompressionMethod::try_from(plan.compression_method)?;
        self.current = Some(CurrentEntry {
            name: name.to_string(),
            compressor: Compressor::new(method, self.config.compression_level),
            hasher: Crc32Hasher::new(),
            uncompressed_count: 0,
            compressed_count: 0,
            plan,
        });
        Ok(())
    }

    /// Write more bytes of the currently open entry's uncompressed
    /// payload.
    pub async fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if self.current.is_none() {
            return Err(SZipError::InvalidFormat("no entry is currently open".to_string()));
        }
        let current = self.current.as_mut().unwrap();
        current.hasher.update(data);
        current.uncompressed_count += data.len() as u64;
        let compressed = current.compressor.push(data)?;
        current.compressed_count += compressed.len() as u64;
        self.push_compressed(&compressed).await
    }

    /// Close the current entry (if any), writing its trailing data
    /// descriptor when one is needed and recording it for the central
    /// directory. A no-op when no entry is open.
    async fn finish_current_entry(&mut self) -> Result<()> {
        let Some(current) = self.current.take() else {
            return Ok(());
        };

        let crc32 = current.hasher.clone().finalize();
        let uncompressed_size = current.uncompressed_count;
        let final_bytes = current.compressor.finish()?;
        let compressed_size = current.compressed_count + final_bytes.len() as u64;
        self.push_compressed(&final_bytes).await?;

        let name = current.name.clone();
        let (written, descriptor) =
            writer::finish_entry(current.plan, crc32, uncompressed_size, compressed_size).map_err(|e| {
                if let SZipError::InvalidFormat(msg) = &e {
                    SZipError::InvalidFormat(format!("{name:?}: {msg}"))
                } else {
                    e
                }
            })?;

        if let Some(descriptor) = descriptor {
            let mut w = ByteWriter::new();
            descriptor.write(&mut w);
            self.write_out(&w.into_vec()).await?;
        }

        self.entries.push(written);
        Ok(())
    }

    /// Close the final entry and write the central directory and trailer,
    /// with no archive comment, returning the underlying sink.
    pub async fn finish(mut self) -> Result<W> {
        self.finish_with_comment_impl("").await?;
        Ok(self.output)
    }

    /// Close the final entry and write the central directory and trailer,
    /// with `comment` as the archive-level comment (CP437-encoded),
    /// returning the underlying sink.
    pub async fn finish_with_comment(mut self, comment: &str) -> Result<W> {
        self.finish_with_comment_impl(comment).await?;
        Ok(self.output)
    }

    async fn finish_with_comment_impl(&mut self, comment: &str) -> Result<()> {
        self.finish_current_entry().await?;
        let cd_start_local = self.bytes_written;
        let bytes = writer::build_central_directory_and_trailer(
            &self.entries,
            comment,
            self.config.starting_offset,
            cd_start_local,
        )?;
        self.write_out(&bytes).await?;
        self.output.flush().await?;
        Ok(())
    }
}
