//! The entry facade: directory-entry metadata paired with a single-shot
//! decompressing byte stream (spec.md §3 "Entity: Entry reader", §4.16).

use crate::error::Result;
use std::io::Read;

/// A lazily-materialized handle over one archive member's uncompressed
/// bytes. Single-shot: once drained, the stream is exhausted. Convenience
/// accessors fully buffer or decode it as text.
pub struct EntryReader<'a> {
    body: Box<dyn Read + 'a>,
}

impl<'a> EntryReader<'a> {
    pub fn new(body: Box<dyn Read + 'a>) -> Self {
        Self { body }
    }

    /// Buffer the entire uncompressed payload. Also drives the CRC/size
    /// check inside the underlying [`crate::pipeline::VerifyingReader`],
    /// surfacing `zip-format` errors as an `Err` here.
    pub fn read_to_vec(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Decode the fully-buffered payload as UTF-8.
    pub fn read_to_string(self) -> Result<String> {
        let bytes = self.read_to_vec()?;
        String::from_utf8(bytes).map_err(|e| crate::error::SZipError::Encoding(e.to_string()))
    }

    /// Decode the fully-buffered payload with a caller-supplied decoder,
    /// for text encodings other than UTF-8.
    pub fn read_to_string_with<F>(self, decode: F) -> Result<String>
    where
        F: FnOnce(Vec<u8>) -> Result<String>,
    {
        decode(self.read_to_vec()?)
    }
}

impl<'a> Read for EntryReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.body.read(buf)
    }
}
