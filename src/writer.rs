//! Streaming ZIP writer: emits the local header immediately, compresses
//! payload bytes on the fly, and assembles the central directory and
//! trailer once every entry has been written.
//!
//! Layered on the same codecs the reader uses (`format::{local,central,
//! trailer}`, `extra`), plus `pipeline`'s CRC/size accounting on the write
//! side. Every policy decision (UTF-8 vs CP437, ZIP64 opt-in, data
//! descriptor) is resolved once per entry in [`plan_entry`], since the
//! writer — unlike the reader — is the party making the choice rather than
//! discovering it. [`plan_entry`] and [`build_central_directory_and_trailer`]
//! are pure functions shared with `async_writer.rs`, which drives the same
//! policy and record layout over an `AsyncWrite` sink instead of a plain
//! `std::fs::File`.

use crate::attrs::{FileAttributes, Platform, UnixAttributes};
use crate::binio::ByteWriter;
use crate::cp437;
use crate::dostime::DosDateTime;
use crate::error::{Result, SZipError};
use crate::extra::{self, ExtraRecord, Zip64Field, Zip64Presence};
use crate::flags::GeneralPurposeFlags;
use crate::format::{
    self,
    central::{self, CentralHeader},
    local::{self, DataDescriptor, LocalHeader},
    trailer::{self, Eocdr, Zip64Eocdl, Zip64Eocdr},
};
use crate::pipeline::{self, CountingWriter, CrcCountingTee};
use flate2::write::DeflateEncoder;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use std::time::SystemTime;

/// Archive-wide writer settings (spec.md §6).
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// `flate2` compression level, 0 (store-like, fast) through 9 (best).
    pub compression_level: u32,
    /// Byte offset this archive will occupy once embedded in a larger
    /// container (e.g. a self-extracting stub prepended by the caller).
    /// Added to every offset this writer records, so the trailer stays
    /// correct relative to the final file.
    pub starting_offset: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            starting_offset: 0,
        }
    }
}

/// Per-entry overrides for [`StreamingZipWriter::start_entry_with_options`],
/// covering the `addFile` policy knobs from spec.md §4.15.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    /// `Some(true)`/`Some(false)` forces UTF-8 on or off; `None` (default)
    /// picks UTF-8 only when the name or comment isn't CP437-representable.
    pub utf8: Option<bool>,
    /// `Some(true)`/`Some(false)` forces ZIP64 on or off; `None` (default)
    /// enables it only when a declared size or the local header's own
    /// offset overflows 32 bits.
    pub zip64: Option<bool>,
    /// `METHOD_STORED` or `METHOD_DEFLATE`; defaults to DEFLATE.
    pub compression_method: Option<u16>,
    pub platform: Option<Platform>,
    pub attributes: Option<FileAttributes>,
    pub modified: Option<SystemTime>,
    pub comment: String,
    /// Overrides the computed "version made by"; rejected if lower than
    /// the version this entry actually needs.
    pub version_made_by: Option<u16>,
    /// Pre-declared CRC-32. Supplying all three of `crc32`,
    /// `compressed_size`, and `uncompressed_size` skips the trailing data
    /// descriptor; the measured values are still checked against these.
    pub crc32: Option<u32>,
    pub compressed_size: Option<u64>,
    pub uncompressed_size: Option<u64>,
}

/// The write-side half of the compression pipeline: counts compressed
/// bytes regardless of method, so `compressed_size` is known without a
/// second pass.
enum EntrySink {
    Stored(CountingWriter<File>),
    Deflate(DeflateEncoder<CountingWriter<File>>),
}

impl EntrySink {
    fn finish(self) -> Result<u64> {
        match self {
            EntrySink::Stored(w) => Ok(w.count()),
            EntrySink::Deflate(enc) => Ok(enc.finish()?.count()),
        }
    }
}

impl Write for EntrySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            EntrySink::Stored(w) => w.write(buf),
            EntrySink::Deflate(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            EntrySink::Stored(w) => w.flush(),
            EntrySink::Deflate(w) => w.flush(),
        }
    }
}

struct CurrentEntry {
    name: String,
    plan: EntryPlan,
    tee: CrcCountingTee<EntrySink>,
}

/// Every policy decision and header-shaped byte sequence resolved for one
/// entry, before any I/O happens. A pure function of `(name, opts,
/// local_header_offset)`, so both the sync and async writers can call
/// [`plan_entry`] and then drive the actual local-header/name/extra bytes
/// through their own `Write`/`AsyncWrite` sink.
pub(crate) struct EntryPlan {
    pub(crate) header: LocalHeader,
    pub(crate) name_bytes: Vec<u8>,
    pub(crate) extra_bytes: Vec<u8>,
    pub(crate) comment: String,
    pub(crate) local_header_offset: u64,
    pub(crate) utf8: bool,
    pub(crate) zip64_opt: Option<bool>,
    pub(crate) data_descriptor: bool,
    pub(crate) compression_method: u16,
    pub(crate) modified: DosDateTime,
    pub(crate) platform: Platform,
    pub(crate) attributes: FileAttributes,
    pub(crate) version_made_by: u16,
    pub(crate) declared_crc32: Option<u32>,
    pub(crate) declared_compressed_size: Option<u64>,
    pub(crate) declared_uncompressed_size: Option<u64>,
}

/// Resolve the full `addFile` policy of spec.md §4.15 step 1-5 for one
/// entry and build its local header: UTF-8 vs CP437, ZIP64 opt-in/opt-out,
/// the data-descriptor decision, and `version_needed`/`version_made_by`
/// negotiation.
pub(crate) fn plan_entry(name: &str, opts: &EntryOptions, local_header_offset: u64) -> Result<EntryPlan> {
    let name_is_cp437 = cp437::is_cp437_encodable(name);
    let comment_is_cp437 = cp437::is_cp437_encodable(&opts.comment);
    let utf8 = match opts.utf8 {
        Some(true) => true,
        Some(false) => {
            if !name_is_cp437 || !comment_is_cp437 {
                return Err(SZipError::Encoding(format!(
                    "{name:?} is not representable in CP437 but UTF-8 was disabled"
                )));
            }
            false
        }
        None => !(name_is_cp437 && comment_is_cp437),
    };

    let data_descriptor = opts.crc32.is_none()
        || opts.compressed_size.is_none()
        || opts.uncompressed_size.is_none();

    let exceeds_u32 = |v: Option<u64>| v.is_some_and(|x| x > u32::MAX as u64);
    let zip64_local = match opts.zip64 {
        Some(true) => true,
        Some(false) => {
            if local_header_offset > u32::MAX as u64 {
                return Err(SZipError::Range(format!(
                    "local header offset {local_header_offset} exceeds 32 bits but ZIP64 was disabled"
                )));
            }
            if exceeds_u32(opts.compressed_size) || exceeds_u32(opts.uncompressed_size) {
                return Err(SZipError::Range(format!(
                    "declared size for {name:?} exceeds 32 bits but ZIP64 was disabled"
                )));
            }
            false
        }
        None => {
            local_header_offset > u32::MAX as u64
                || exceeds_u32(opts.compressed_size)
                || exceeds_u32(opts.uncompressed_size)
        }
    };

    let version_needed = [
        format::VERSION_DEFLATE,
        if utf8 { format::VERSION_UTF8 } else { 0 },
        if zip64_local { format::VERSION_ZIP64 } else { 0 },
    ]
    .into_iter()
    .max()
    .unwrap();
    let version_made_by = match opts.version_made_by {
        Some(declared) if declared < version_needed => {
            return Err(SZipError::VersionTooLow {
                required: version_needed,
                declared,
            })
        }
        Some(declared) => declared,
        None => version_needed,
    };

    let platform = opts.platform.unwrap_or(Platform::Unix);
    let attributes = opts.attributes.unwrap_or_else(|| {
        if name.ends_with('/') {
            FileAttributes::Unix(UnixAttributes::directory(0o755))
        } else {
            FileAttributes::Unix(UnixAttributes::file(0o644))
        }
    });
    let modified = DosDateTime::from_system_time(opts.modified.unwrap_or_else(SystemTime::now));
    let compression_method = opts.compression_method.unwrap_or(format::METHOD_DEFLATE);

    let mut flags = GeneralPurposeFlags::new(0);
    flags.set_has_data_descriptor(data_descriptor);
    flags.set_utf8(utf8);

    let name_bytes = if utf8 {
        name.as_bytes().to_vec()
    } else {
        cp437::encode(name)
            .ok_or_else(|| SZipError::Encoding(format!("{name:?} is not CP437-encodable")))?
    };

    let plan = format::SizeFieldPlan {
        zip64: zip64_local,
        data_descriptor,
    };
    let header_crc = if data_descriptor { 0 } else { opts.crc32.unwrap() };
    let (header_compressed, header_uncompressed) = if plan.header_slots_are_placeholder() {
        let slot = if zip64_local { 0xFFFF_FFFF } else { 0 };
        (slot, slot)
    } else {
        (
            opts.compressed_size.unwrap() as u32,
            opts.uncompressed_size.unwrap() as u32,
        )
    };

    let mut extra_records = Vec::new();
    if zip64_local {
        let presence = Zip64Presence {
            uncompressed_size: true,
            compressed_size: true,
            local_header_offset: false,
            disk_start_number: false,
        };
        let field = Zip64Field {
            uncompressed_size: Some(if data_descriptor {
                0
            } else {
                opts.uncompressed_size.unwrap()
            }),
            compressed_size: Some(if data_descriptor {
                0
            } else {
                opts.compressed_size.unwrap()
            }),
            local_header_offset: None,
            disk_start_number: None,
        };
        extra_records.push(ExtraRecord {
            tag: extra::TAG_ZIP64,
            payload: field.write(presence),
        });
    }
    let extra_bytes = extra::write_extra_fields(&extra_records);

    let (mod_date, mod_time) = modified.pack()?;
    let header = LocalHeader {
        version_needed,
        flags,
        method: compression_method,
        mod_time,
        mod_date,
        crc32: header_crc,
        compressed_size: header_compressed,
        uncompressed_size: header_uncompressed,
        name_len: name_bytes.len() as u16,
        extra_len: extra_bytes.len() as u16,
    };

    Ok(EntryPlan {
        header,
        name_bytes,
        extra_bytes,
        comment: opts.comment.clone(),
        local_header_offset,
        utf8,
        zip64_opt: opts.zip64,
        data_descriptor,
        compression_method,
        modified,
        platform,
        attributes,
        version_made_by,
        declared_crc32: opts.crc32,
        declared_compressed_size: opts.compressed_size,
        declared_uncompressed_size: opts.uncompressed_size,
    })
}

/// A completed entry, holding everything the central directory needs once
/// sizes are final. ZIP64-ness for the central header and trailing data
/// descriptor is decided fresh from these measured values, independently
/// of whatever the local header reserved.
pub(crate) struct WrittenEntry {
    pub(crate) name_bytes: Vec<u8>,
    pub(crate) comment_bytes: Vec<u8>,
    pub(crate) local_header_offset: u64,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) compression_method: u16,
    pub(crate) utf8: bool,
    pub(crate) data_descriptor: bool,
    pub(crate) zip64_opt: Option<bool>,
    pub(crate) modified: DosDateTime,
    pub(crate) platform: Platform,
    pub(crate) attributes: FileAttributes,
    pub(crate) version_made_by: u16,
}

/// Verify a just-completed entry's measured CRC/sizes against whatever the
/// caller pre-declared, and build its trailing data descriptor (if any) plus
/// its [`WrittenEntry`] bookkeeping record. Pure except for the declared-
/// value checks, which are themselves pure; shared by the sync and async
/// writers' `finish_current_entry`.
pub(crate) fn finish_entry(
    plan: EntryPlan,
    crc32: u32,
    uncompressed_size: u64,
    compressed_size: u64,
) -> Result<(WrittenEntry, Option<DataDescriptor>)> {
    pipeline::check_declared("crc32", plan.declared_crc32, crc32)?;
    pipeline::check_declared(
        "compressed_size",
        plan.declared_compressed_size,
        compressed_size,
    )?;
    pipeline::check_declared(
        "uncompressed_size",
        plan.declared_uncompressed_size,
        uncompressed_size,
    )?;

    if plan.zip64_opt == Some(false)
        && (compressed_size > u32::MAX as u64 || uncompressed_size > u32::MAX as u64)
    {
        return Err(SZipError::Range(format!(
            "entry grew to {uncompressed_size} bytes but ZIP64 was disabled"
        )));
    }

    let descriptor = if plan.data_descriptor {
        let wide = plan.zip64_opt == Some(true)
            || compressed_size > u32::MAX as u64
            || uncompressed_size > u32::MAX as u64;
        Some(if wide {
            DataDescriptor::Wide {
                crc32,
                compressed_size,
                uncompressed_size,
            }
        } else {
            DataDescriptor::Narrow {
                crc32,
                compressed_size: compressed_size as u32,
                uncompressed_size: uncompressed_size as u32,
            }
        })
    } else {
        None
    };

    let comment_bytes = if plan.utf8 {
        plan.comment.as_bytes().to_vec()
    } else {
        cp437::encode(&plan.comment)
            .ok_or_else(|| SZipError::Encoding("entry comment is not CP437-encodable".to_string()))?
    };

    let written = WrittenEntry {
        name_bytes: plan.name_bytes,
        comment_bytes,
        local_header_offset: plan.local_header_offset,
        crc32,
        compressed_size,
        uncompressed_size,
        compression_method: plan.compression_method,
        utf8: plan.utf8,
        data_descriptor: plan.data_descriptor,
        zip64_opt: plan.zip64_opt,
        modified: plan.modified,
        platform: plan.platform,
        attributes: plan.attributes,
        version_made_by: plan.version_made_by,
    };
    Ok((written, descriptor))
}

/// Build the central directory, optional ZIP64 trailer, and base EOCDR
/// (spec.md §4.15's `finalize`) as a single byte sequence, given every
/// entry already written and the absolute offset at which the central
/// directory itself starts. Pure: shared by the sync and async writers,
/// which differ only in how they push the resulting bytes to their sink.
pub(crate) fn build_central_directory_and_trailer(
    entries: &[WrittenEntry],
    comment: &str,
    starting_offset: u64,
    cd_start_local: u64,
) -> Result<Vec<u8>> {
    let cd_offset = starting_offset + cd_start_local;
    let mut out = ByteWriter::new();

    let mut any_entry_zip64 = false;
    let mut max_version_needed = format::VERSION_DEFLATE;

    for entry in entries {
        let zip64_final = entry.zip64_opt == Some(true)
            || entry.compressed_size > u32::MAX as u64
            || entry.uncompressed_size > u32::MAX as u64
            || entry.local_header_offset > u32::MAX as u64;
        any_entry_zip64 |= zip64_final;

        let version_needed = [
            format::VERSION_DEFLATE,
            if entry.utf8 { format::VERSION_UTF8 } else { 0 },
            if zip64_final { format::VERSION_ZIP64 } else { 0 },
        ]
        .into_iter()
        .max()
        .unwrap();
        max_version_needed = max_version_needed.max(version_needed);
        let version_made_by = entry.version_made_by.max(version_needed);

        let presence = Zip64Presence {
            uncompressed_size: zip64_final,
            compressed_size: zip64_final,
            local_header_offset: entry.local_header_offset > u32::MAX as u64,
            disk_start_number: false,
        };

        let mut extra_records = Vec::new();
        if zip64_final {
            let field = Zip64Field {
                uncompressed_size: presence.uncompressed_size.then_some(entry.uncompressed_size),
                compressed_size: presence.compressed_size.then_some(entry.compressed_size),
                local_header_offset: presence
                    .local_header_offset
                    .then_some(entry.local_header_offset),
                disk_start_number: None,
            };
            extra_records.push(ExtraRecord {
                tag: extra::TAG_ZIP64,
                payload: field.write(presence),
            });
        }
        let extra_bytes = extra::write_extra_fields(&extra_records);

        let mut flags = GeneralPurposeFlags::new(0);
        flags.set_utf8(entry.utf8);
        flags.set_has_data_descriptor(entry.data_descriptor);

        let (mod_date, mod_time) = entry.modified.pack()?;
        let header = CentralHeader {
            version_made_by,
            platform: entry.platform as u8,
            version_needed,
            flags,
            method: entry.compression_method,
            mod_time,
            mod_date,
            crc32: entry.crc32,
            compressed_size: if presence.compressed_size {
                0xFFFF_FFFF
            } else {
                entry.compressed_size as u32
            },
            uncompressed_size: if presence.uncompressed_size {
                0xFFFF_FFFF
            } else {
                entry.uncompressed_size as u32
            },
            name_len: entry.name_bytes.len() as u16,
            extra_len: extra_bytes.len() as u16,
            comment_len: entry.comment_bytes.len() as u16,
            disk_number_start: 0,
            internal_attrs: 0,
            external_attrs: entry.attributes.to_external(),
            local_header_offset: if presence.local_header_offset {
                0xFFFF_FFFF
            } else {
                entry.local_header_offset as u32
            },
        };
        header.write(&mut out);
        out.write_bytes(&entry.name_bytes);
        out.write_bytes(&extra_bytes);
        out.write_bytes(&entry.comment_bytes);
    }

    let cd_size = out.len() as u64;

    let comment_bytes = cp437::encode(comment)
        .ok_or_else(|| SZipError::Encoding("archive comment is not CP437-encodable".to_string()))?;
    if comment_bytes.len() > trailer::MAX_COMMENT_LEN {
        return Err(SZipError::Range(format!(
            "archive comment of {} bytes exceeds the 16-bit comment length limit",
            comment_bytes.len()
        )));
    }

    let entry_count = entries.len() as u64;
    let use_zip64_trailer = trailer::requires_zip64_trailer(entry_count, any_entry_zip64, cd_offset);

    if use_zip64_trailer {
        let zip64_eocdr_offset = starting_offset + cd_start_local + cd_size;
        let zip64_eocdr = Zip64Eocdr {
            version_made_by: max_version_needed,
            version_needed: max_version_needed,
            disk_number: 0,
            disk_with_cd_start: 0,
            entries_this_disk: entry_count,
            total_entries: entry_count,
            cd_size,
            cd_offset,
        };
        zip64_eocdr.write(&mut out);

        let locator = Zip64Eocdl {
            disk_with_zip64_eocd: 0,
            zip64_eocd_offset: zip64_eocdr_offset,
            total_disks: 1,
        };
        locator.write(&mut out);
    }

    let eocdr = Eocdr {
        disk_number: 0,
        disk_with_cd_start: 0,
        entries_this_disk: if entry_count > 0xFFFE { 0xFFFF } else { entry_count as u16 },
        total_entries: if entry_count > 0xFFFE { 0xFFFF } else { entry_count as u16 },
        cd_size: if cd_size > u32::MAX as u64 { 0xFFFF_FFFF } else { cd_size as u32 },
        cd_offset: if cd_offset > u32::MAX as u64 { 0xFFFF_FFFF } else { cd_offset as u32 },
        comment: comment_bytes,
    };
    eocdr.write(&mut out);

    Ok(out.into_vec())
}

/// Streaming ZIP archive writer over a plain file.
pub struct StreamingZipWriter {
    output: File,
    config: WriterConfig,
    entries: Vec<WrittenEntry>,
    current: Option<CurrentEntry>,
}

impl StreamingZipWriter {
    /// Create a new archive at `path` with default settings (DEFLATE level
    /// 6, no embedding offset).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, WriterConfig::default())
    }

    /// Create a new archive at `path` with a specific DEFLATE compression
    /// level.
    pub fn with_compression<P: AsRef<Path>>(path: P, level: u32) -> Result<Self> {
        Self::with_config(
            path,
            WriterConfig {
                compression_level: level,
                ..Default::default()
            },
        )
    }

    /// Create a new archive at `path` with full control over writer
    /// settings.
    pub fn with_config<P: AsRef<Path>>(path: P, config: WriterConfig) -> Result<Self> {
        let output = File::create(path)?;
        Ok(Self {
            output,
            config,
            entries: Vec::new(),
            current: None,
        })
    }

    /// Start a new entry with default policy (auto UTF-8, auto ZIP64,
    /// DEFLATE, a trailing data descriptor since no sizes are declared).
    /// Closes any entry already open.
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        self.start_entry_with_options(name, EntryOptions::default())
    }

    /// Start a new entry, resolving the full `addFile` policy against
    /// `opts` before the local header is written. Closes any entry
    /// already open.
    pub fn start_entry_with_options(&mut self, name: &str, opts: EntryOptions) -> Result<()> {
        self.finish_current_entry()?;

        let local_header_offset = self.config.starting_offset + self.output.stream_position()?;
        let plan = plan_entry(name, &opts, local_header_offset)?;

        let mut w = ByteWriter::with_capacity(local::FIXED_SIZE);
        plan.header.write(&mut w);
        self.output.write_all(&w.into_vec())?;
        self.output.write_all(&plan.name_bytes)?;
        self.output.write_all(&plan.extra_bytes)?;

        let counting = CountingWriter::new(self.output.try_clone()?);
        let sink = match pipeline::CompressionMethod::try_from(plan.compression_method)? {
            pipeline::CompressionMethod::Stored => EntrySink::Stored(counting),
            pipeline::CompressionMethod::Deflate => {
                EntrySink::Deflate(pipeline::deflate_encoder(counting, self.config.compression_level))
            }
        };

        self.current = Some(CurrentEntry {
            name: name.to_string(),
            plan,
            tee: CrcCountingTee::new(sink),
        });
        Ok(())
    }

    /// Write more bytes of the currently open entry's uncompressed
    /// payload.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let current = self
            .current
            .as_mut()
            .ok_or_else(|| SZipError::InvalidFormat("no entry is currently open".to_string()))?;
        current.tee.write_all(data)?;
        Ok(())
    }

    /// Close the current entry (if any), writing its trailing data
    /// descriptor when one is needed and recording it for the central
    /// directory. A no-op when no entry is open.
    fn finish_current_entry(&mut self) -> Result<()> {
        let Some(current) = self.current.take() else {
            return Ok(());
        };

        let crc32 = current.tee.crc32();
        let uncompressed_size = current.tee.count();
        let sink = current.tee.into_inner();
        let compressed_size = sink.finish()?;

        let (written, descriptor) =
            finish_entry(current.plan, crc32, uncompressed_size, compressed_size).map_err(|e| {
                if let SZipError::InvalidFormat(msg) = &e {
                    SZipError::InvalidFormat(format!("{:?}: {msg}", current.name))
                } else {
                    e
                }
            })?;

        if let Some(descriptor) = descriptor {
            let mut w = ByteWriter::new();
            descriptor.write(&mut w);
            self.output.write_all(&w.into_vec())?;
        }

        self.entries.push(written);
        Ok(())
    }

    /// Close the final entry and write the central directory and trailer,
    /// with no archive comment.
    pub fn finish(self) -> Result<()> {
        self.finish_with_comment("")
    }

    /// Close the final entry and write the central directory and trailer,
    /// with `comment` as the archive-level comment (CP437-encoded, per
    /// spec.md §4.9).
    pub fn finish_with_comment(mut self, comment: &str) -> Result<()> {
        self.finish_current_entry()?;

        let cd_start_local = self.output.stream_position()?;
        let bytes = build_central_directory_and_trailer(
            &self.entries,
            comment,
            self.config.starting_offset,
            cd_start_local,
        )?;
        self.output.write_all(&bytes)?;
        self.output.flush()?;
        Ok(())
    }
}
