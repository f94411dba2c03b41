//! Error types for zipcask.

use std::io;

/// Result type for zipcask operations.
pub type Result<T> = std::result::Result<T, SZipError>;

/// Error types that can occur during ZIP operations.
#[derive(Debug)]
pub enum SZipError {
    /// I/O error.
    Io(io::Error),
    /// Invalid ZIP format or structure.
    InvalidFormat(String),
    /// Entry not found in ZIP archive.
    EntryNotFound(String),
    /// Unsupported compression method.
    UnsupportedCompression(u16),
    /// A signature field didn't match the expected magic bytes.
    Signature { expected: u32, found: u32 },
    /// The archive declares more than one disk; multi-disk archives are out
    /// of scope.
    MultiDisk(u16),
    /// A numeric value (offset, size, index) fell outside its valid range.
    Range(String),
    /// A filename or comment could not be decoded under the bit flag's
    /// declared encoding (CP437 or UTF-8).
    Encoding(String),
    /// A feature requires a higher ZIP "version needed to extract" than the
    /// caller negotiated.
    VersionTooLow { required: u16, declared: u16 },
    /// A bounded buffer's consumer was dropped or cancelled while a producer
    /// was still writing, or vice versa.
    BufferAborted(String),
}

impl std::fmt::Display for SZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SZipError::Io(e) => write!(f, "I/O error: {}", e),
            SZipError::InvalidFormat(msg) => write!(f, "invalid ZIP format: {}", msg),
            SZipError::EntryNotFound(name) => write!(f, "entry not found: {}", name),
            SZipError::UnsupportedCompression(method) => {
                write!(f, "unsupported compression method: {}", method)
            }
            SZipError::Signature { expected, found } => write!(
                f,
                "bad signature: expected {:#010x}, found {:#010x}",
                expected, found
            ),
            SZipError::MultiDisk(count) => {
                write!(f, "multi-disk archives are not supported ({count} disks)")
            }
            SZipError::Range(msg) => write!(f, "value out of range: {}", msg),
            SZipError::Encoding(msg) => write!(f, "encoding error: {}", msg),
            SZipError::VersionTooLow { required, declared } => write!(
                f,
                "version needed to extract ({required}) exceeds declared version ({declared})"
            ),
            SZipError::BufferAborted(msg) => write!(f, "streaming buffer aborted: {}", msg),
        }
    }
}

impl std::error::Error for SZipError {}

impl From<io::Error> for SZipError {
    fn from(err: io::Error) -> Self {
        SZipError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_human_readable() {
        let err = SZipError::Signature {
            expected: 0x0403_4b50,
            found: 0,
        };
        assert!(err.to_string().contains("bad signature"));

        let err = SZipError::VersionTooLow {
            required: 45,
            declared: 20,
        };
        assert!(err.to_string().contains("45"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: SZipError = io_err.into();
        assert!(matches!(err, SZipError::Io(_)));
    }
}
