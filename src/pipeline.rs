//! Streaming compress/decompress pipeline: CRC-32 and size accounting
//! layered over the host-supplied codec (`flate2` for DEFLATE, identity
//! for STORED).
//!
//! The reader side wraps the decompressed byte stream in [`VerifyingReader`],
//! which accumulates CRC-32 and byte count as bytes are pulled through it
//! and raises `zip-format` errors ("file size mismatch" / "crc32 mismatch")
//! the moment the stream reports end-of-file, per spec.md §4.10. The
//! teacher's existing readers trust the declared sizes without
//! re-checking; this crate always re-verifies.

use crate::error::SZipError;
use crate::format::{METHOD_DEFLATE, METHOD_STORED};
use crc32fast::Hasher;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

/// The two compression methods this crate understands; anything else is
/// `zip-format`'s "unknown compression method" at the reader boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
}

impl CompressionMethod {
    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Stored => METHOD_STORED,
            CompressionMethod::Deflate => METHOD_DEFLATE,
        }
    }
}

impl TryFrom<u16> for CompressionMethod {
    type Error = SZipError;

    fn try_from(value: u16) -> Result<Self, SZipError> {
        match value {
            METHOD_STORED => Ok(CompressionMethod::Stored),
            METHOD_DEFLATE => Ok(CompressionMethod::Deflate),
            other => Err(SZipError::UnsupportedCompression(other)),
        }
    }
}

/// Wraps a compressed-payload reader with the matching decompression
/// transform, selected by method. Host-supplied methods beyond STORED/
/// DEFLATE are out of this crate's scope (see spec.md §1 Non-goals); an
/// unrecognized method fails at construction via `TryFrom<u16>` above.
pub fn open_decompressor<'a, R: Read + 'a>(
    method: CompressionMethod,
    inner: R,
) -> Box<dyn Read + 'a> {
    match method {
        CompressionMethod::Stored => Box::new(inner),
        CompressionMethod::Deflate => Box::new(DeflateDecoder::new(inner)),
    }
}

/// Wraps a decompressed-data reader so that consuming it to EOF verifies
/// the measured byte count and CRC-32 against the entry's declared values.
/// The first `read` call that returns `Ok(0)` performs the check and, on
/// mismatch, returns that `Ok(0)` replaced with an `io::Error` carrying the
/// `zip-format` failure instead — callers driving this via `read_to_end`
/// see the error surface normally.
pub struct VerifyingReader<R> {
    inner: R,
    hasher: Hasher,
    count: u64,
    expected_crc32: u32,
    expected_size: u64,
    checked: bool,
}

impl<R: Read> VerifyingReader<R> {
    pub fn new(inner: R, expected_crc32: u32, expected_size: u64) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            count: 0,
            expected_crc32,
            expected_size,
            checked: false,
        }
    }

    fn verify(&mut self) -> io::Result<()> {
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

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.verify()?;
            return Ok(0);
        }
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }
}

fn to_io_err(e: SZipError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Tees uncompressed bytes written by the caller into a CRC-32/byte-count
/// accumulator before handing them to the compressor, mirroring the
/// teacher's `CrcCountingWriter` but on the *input* side of compression
/// (the teacher's existing type taps the compressed output instead).
pub struct CrcCountingTee<W> {
    inner: W,
    hasher: Hasher,
    count: u64,
}

impl<W: Write> CrcCountingTee<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            count: 0,
        }
    }

    pub fn crc32(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrcCountingTee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Counts bytes written, used on the compressed-output side of the writer
/// to learn `compressed_size` regardless of method.
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A value the caller may have declared up front, checked against what was
/// actually measured once the stream completes (spec.md §4.10's "supplied
/// but invalid" errors).
pub fn check_declared<T: PartialEq + std::fmt::Display>(
    field: &str,
    declared: Option<T>,
    measured: T,
) -> crate::error::Result<()> {
    if let Some(declared) = declared {
        if declared != measured {
            return Err(SZipError::InvalidFormat(format!(
                "{field} supplied as {declared} but measured {measured}"
            )));
        }
    }
    Ok(())
}

/// Build a DEFLATE encoder at the given level wrapping any `Write`.
pub fn deflate_encoder<W: Write>(inner: W, level: u32) -> DeflateEncoder<W> {
    DeflateEncoder::new(inner, Compression::new(level))
}
