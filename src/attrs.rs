//! File attribute variants carried by the central directory's external
//! attributes field, tagged by the platform that wrote the archive.

use crate::error::{Result, SZipError};

/// The platform byte from "version made by", selecting which attribute
/// variant occupies the external-attributes field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Dos = 0,
    Unix = 3,
}

impl TryFrom<u8> for Platform {
    type Error = SZipError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Platform::Dos),
            3 => Ok(Platform::Unix),
            other => Err(SZipError::InvalidFormat(format!(
                "unsupported platform byte {other} in version-made-by"
            ))),
        }
    }
}

/// Shared read surface over either attribute variant.
pub trait AttributeView {
    fn is_read_only(&self) -> bool;
    /// `None` when the variant cannot express directory-ness at all.
    fn is_directory(&self) -> Option<bool>;
    /// `None` when the variant cannot express file-ness at all.
    fn is_file(&self) -> Option<bool>;
    fn raw_value(&self) -> u32;
}

const DOS_READ_ONLY: u8 = 1 << 0;
const DOS_HIDDEN: u8 = 1 << 1;
const DOS_SYSTEM: u8 = 1 << 2;
const DOS_DIRECTORY: u8 = 1 << 4;

/// DOS/FAT attribute byte, occupying the low byte of the 32-bit external
/// attributes field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosAttributes {
    pub value: u8,
}

impl DosAttributes {
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    pub fn hidden(self) -> bool {
        self.value & DOS_HIDDEN != 0
    }

    pub fn system(self) -> bool {
        self.value & DOS_SYSTEM != 0
    }

    pub fn set_read_only(&mut self, value: bool) {
        if value {
            self.value |= DOS_READ_ONLY;
        } else {
            self.value &= !DOS_READ_ONLY;
        }
    }
}

impl AttributeView for DosAttributes {
    fn is_read_only(&self) -> bool {
        self.value & DOS_READ_ONLY != 0
    }

    fn is_directory(&self) -> Option<bool> {
        Some(self.value & DOS_DIRECTORY != 0)
    }

    fn is_file(&self) -> Option<bool> {
        Some(self.value & DOS_DIRECTORY == 0)
    }

    fn raw_value(&self) -> u32 {
        self.value as u32
    }
}

const UNIX_TYPE_MASK: u32 = 0o170000;
const UNIX_TYPE_FILE: u32 = 0o100000;
const UNIX_TYPE_DIR: u32 = 0o040000;
const UNIX_TYPE_SYMLINK: u32 = 0o120000;
const UNIX_PERM_MASK: u32 = 0o000777;
const UNIX_WRITE_BITS: u32 = 0o000222;

/// UNIX `mode | type`, occupying the high 16 bits of the 32-bit external
/// attributes field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnixAttributes {
    value: u32,
}

impl UnixAttributes {
    /// `value` is the raw 16-bit mode|type. A zero type field (no `S_IF*`
    /// bits set) means the writer never recorded a UNIX type at all — this
    /// is preserved as-is rather than defaulted to a regular file, so
    /// [`AttributeView::is_file`]/[`AttributeView::is_directory`] can report
    /// `None` for it.
    pub fn new(value: u16) -> Self {
        Self {
            value: value as u32,
        }
    }

    pub fn mode(self) -> u16 {
        self.value as u16
    }

    pub fn permissions(self) -> u32 {
        self.value & UNIX_PERM_MASK
    }

    pub fn is_symlink(self) -> bool {
        self.value & UNIX_TYPE_MASK == UNIX_TYPE_SYMLINK
    }

    /// Sets the file/non-file type. `false` (non-file) has no single
    /// well-defined UNIX type, so callers must supply a concrete one and
    /// this always fails with a domain error; use a dedicated constructor
    /// (directory, symlink) instead.
    pub fn set_is_file(&mut self, is_file: bool) -> Result<()> {
        if is_file {
            self.value = (self.value & !UNIX_TYPE_MASK) | UNIX_TYPE_FILE;
            Ok(())
        } else {
            Err(SZipError::InvalidFormat(
                "cannot set is_file=false without a concrete non-file type; \
                 construct a directory or symlink UnixAttributes directly"
                    .to_string(),
            ))
        }
    }

    pub fn set_permissions(&mut self, perms: u32) {
        self.value = (self.value & !UNIX_PERM_MASK) | (perms & UNIX_PERM_MASK);
    }

    /// A regular file with the given permission bits.
    pub fn file(perms: u32) -> Self {
        Self {
            value: UNIX_TYPE_FILE | (perms & UNIX_PERM_MASK),
        }
    }

    /// A directory with the given permission bits.
    pub fn directory(perms: u32) -> Self {
        Self {
            value: UNIX_TYPE_DIR | (perms & UNIX_PERM_MASK),
        }
    }
}

impl AttributeView for UnixAttributes {
    fn is_read_only(&self) -> bool {
        self.value & UNIX_WRITE_BITS == 0
    }

    fn is_directory(&self) -> Option<bool> {
        if self.value & UNIX_TYPE_MASK == 0 {
            return None;
        }
        Some(self.value & UNIX_TYPE_MASK == UNIX_TYPE_DIR)
    }

    fn is_file(&self) -> Option<bool> {
        if self.value & UNIX_TYPE_MASK == 0 {
            return None;
        }
        Some(self.value & UNIX_TYPE_MASK == UNIX_TYPE_FILE)
    }

    fn raw_value(&self) -> u32 {
        self.value << 16
    }
}

/// Either a DOS or UNIX attribute set, dispatched by [`Platform`] at parse
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAttributes {
    Dos(DosAttributes),
    Unix(UnixAttributes),
}

impl FileAttributes {
    /// Decode from the central header's platform byte and 32-bit external
    /// attributes field.
    pub fn from_external(platform: Platform, external_attrs: u32) -> FileAttributes {
        match platform {
            Platform::Dos => FileAttributes::Dos(DosAttributes::new(external_attrs as u8)),
            Platform::Unix => FileAttributes::Unix(UnixAttributes::new((external_attrs >> 16) as u16)),
        }
    }

    pub fn to_external(self) -> u32 {
        match self {
            FileAttributes::Dos(a) => a.raw_value(),
            FileAttributes::Unix(a) => a.raw_value(),
        }
    }
}

impl AttributeView for FileAttributes {
    fn is_read_only(&self) -> bool {
        match self {
            FileAttributes::Dos(a) => a.is_read_only(),
            FileAttributes::Unix(a) => a.is_read_only(),
        }
    }

    fn is_directory(&self) -> Option<bool> {
        match self {
            FileAttributes::Dos(a) => a.is_directory(),
            FileAttributes::Unix(a) => a.is_directory(),
        }
    }

    fn is_file(&self) -> Option<bool> {
        match self {
            FileAttributes::Dos(a) => a.is_file(),
            FileAttributes::Unix(a) => a.is_file(),
        }
    }

    fn raw_value(&self) -> u32 {
        match self {
            FileAttributes::Dos(a) => a.raw_value(),
            FileAttributes::Unix(a) => a.raw_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dos_directory_bit() {
        let a = DosAttributes::new(DOS_DIRECTORY | DOS_READ_ONLY);
        assert_eq!(a.is_directory(), Some(true));
        assert_eq!(a.is_file(), Some(false));
        assert!(a.is_read_only());
    }

    #[test]
    fn unix_zero_type_is_indeterminate() {
        let a = UnixAttributes::new(0);
        assert_eq!(a.is_file(), None);
        assert_eq!(a.is_directory(), None);
    }

    #[test]
    fn unix_read_only_is_no_write_bit_anywhere() {
        let mut a = UnixAttributes::new((UNIX_TYPE_FILE | 0o444) as u16);
        assert!(a.is_read_only());
        a.set_permissions(0o644);
        assert!(!a.is_read_only());
    }

    #[test]
    fn unix_symlink_is_neither_file_nor_directory() {
        let value = (UNIX_TYPE_SYMLINK | 0o777) as u16;
        let a = UnixAttributes::new(value);
        assert_eq!(a.is_file(), Some(false));
        assert_eq!(a.is_directory(), Some(false));
        assert!(a.is_symlink());
    }

    #[test]
    fn unix_set_is_file_false_is_domain_error() {
        let mut a = UnixAttributes::new(0);
        assert!(a.set_is_file(false).is_err());
    }

    #[test]
    fn platform_try_from_rejects_unknown() {
        assert!(Platform::try_from(0).is_ok());
        assert!(Platform::try_from(3).is_ok());
        assert!(Platform::try_from(7).is_err());
    }

    #[test]
    fn external_attrs_round_trip_unix() {
        let attrs = FileAttributes::Unix(UnixAttributes::new((UNIX_TYPE_DIR | 0o755) as u16));
        let external = attrs.to_external();
        let back = FileAttributes::from_external(Platform::Unix, external);
        assert_eq!(back.is_directory(), Some(true));
    }
}
