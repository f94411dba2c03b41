//! Fixed-size record codecs: local file header, central directory header,
//! and end-of-central-directory trailer, per PKZIP APPNOTE §4.3.

pub mod central;
pub mod local;
pub mod trailer;

pub const SIG_LOCAL_HEADER: u32 = 0x0403_4b50;
pub const SIG_DATA_DESCRIPTOR: u32 = 0x0807_4b50;
pub const SIG_CENTRAL_HEADER: u32 = 0x0201_4b50;
pub const SIG_ZIP64_EOCDR: u32 = 0x0606_4b50;
pub const SIG_ZIP64_EOCDL: u32 = 0x0706_4b50;
pub const SIG_EOCDR: u32 = 0x0605_4b50;

pub const VERSION_DEFLATE: u16 = 20;
pub const VERSION_ZIP64: u16 = 45;
pub const VERSION_UTF8: u16 = 63;

pub const PLATFORM_DOS: u8 = 0;
pub const PLATFORM_UNIX: u8 = 3;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

/// How the three size-shaped fields (crc, compressed size, uncompressed
/// size) are laid out in a local or central header, per spec.md §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFieldPlan {
    pub zip64: bool,
    pub data_descriptor: bool,
}

impl SizeFieldPlan {
    /// Whether the fixed header's 32-bit crc/size slots should hold the
    /// real values (`false`) or be zero/sentinel placeholders (`true`).
    pub fn header_slots_are_placeholder(self) -> bool {
        self.zip64 || self.data_descriptor
    }
}

fn check_signature(found: u32, expected: u32) -> crate::error::Result<()> {
    if found != expected {
        Err(crate::error::SZipError::Signature { expected, found })
    } else {
        Ok(())
    }
}

pub(crate) use check_signature as verify_signature;
