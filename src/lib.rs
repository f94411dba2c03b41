//! # zipcask: High-Performance Streaming ZIP Library
//!
//! `zipcask` is a lightweight, high-performance ZIP library focused on streaming operations
//! with minimal memory footprint. Perfect for working with large ZIP files without loading
//! everything into memory.
//!
//! ## Features
//!
//! - **Streaming Read**: Read ZIP entries on-the-fly without loading entire archive
//! - **Streaming Write**: Write ZIP files with on-the-fly compression, no temp files
//! - **Low Memory**: Constant memory usage regardless of ZIP file size
//! - **Fast**: Optimized for performance with minimal allocations
//! - **Simple API**: Easy to use, intuitive interface
//!
//! ## Quick Start
//!
//! ### Reading a ZIP file
//!
//! ```no_run
//! use zipcask::StreamingZipReader;
//!
//! let mut reader = StreamingZipReader::open("archive.zip")?;
//!
//! // List all entries
//! for entry in reader.entries() {
//!     println!("{}: {} bytes", entry.name, entry.uncompressed_size);
//! }
//!
//! // Read a specific file
//! let data = reader.read_entry_by_name("file.txt")?;
//! # Ok::<(), zipcask::SZipError>(())
//! ```
//!
//! ### Writing a ZIP file
//!
//! ```no_run
//! use zipcask::StreamingZipWriter;
//!
//! let mut writer = StreamingZipWriter::new("output.zip")?;
//!
//! writer.start_entry("file1.txt")?;
//! writer.write_data(b"Hello, World!")?;
//!
//! writer.start_entry("file2.txt")?;
//! writer.write_data(b"Another file")?;
//!
//! writer.finish()?;
//! # Ok::<(), zipcask::SZipError>(())
//! ```

pub mod attrs;
pub mod binio;
pub mod bitfield;
#[cfg(feature = "async")]
pub mod bounded_buffer;
pub mod cp437;
pub mod dostime;
pub mod entry;
pub mod error;
pub mod extra;
pub mod flags;
pub mod format;
pub mod pipeline;
pub mod reader;
#[cfg(feature = "async")]
pub mod semaphore;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_reader;
#[cfg(feature = "async")]
pub mod async_writer;

pub use entry::EntryReader;
pub use error::{Result, SZipError};
pub use reader::{StreamingZipReader, Trailer, ZipEntry};
pub use writer::{EntryOptions, StreamingZipWriter, WriterConfig};

#[cfg(feature = "async")]
pub use async_reader::AsyncStreamingZipReader;
#[cfg(feature = "async")]
pub use async_writer::AsyncStreamingZipWriter;
