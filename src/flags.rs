//! General-purpose bit flags, the 16-bit field carried by both the local
//! and central headers.

/// Newtype over the raw 16-bit general-purpose flag field. Opaque bits
/// round-trip unchanged; a handful of named bits get accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneralPurposeFlags(pub u16);

const BIT_ENCRYPTED: u8 = 0;
const BIT_DATA_DESCRIPTOR: u8 = 3;
const BIT_STRONG_ENCRYPTION: u8 = 6;
const BIT_UTF8: u8 = 11;

impl GeneralPurposeFlags {
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Bit 0: the entry payload is encrypted. Read-only: this crate does
    /// not implement encryption, so there is no setter.
    pub fn encrypted(self) -> bool {
        crate::bitfield::bit(self.0 as u32, BIT_ENCRYPTED)
    }

    /// Bit 3: CRC-32 and sizes are zero in the header and follow the
    /// payload as a data descriptor record.
    pub fn has_data_descriptor(self) -> bool {
        crate::bitfield::bit(self.0 as u32, BIT_DATA_DESCRIPTOR)
    }

    pub fn set_has_data_descriptor(&mut self, value: bool) {
        self.0 = crate::bitfield::set_bit(self.0 as u32, BIT_DATA_DESCRIPTOR, value) as u16;
    }

    /// Bit 6: strong encryption is in use (read-only surface; this crate
    /// does not implement it).
    pub fn strong_encryption(self) -> bool {
        crate::bitfield::bit(self.0 as u32, BIT_STRONG_ENCRYPTION)
    }

    /// Bit 11: filename and comment are UTF-8, not CP437.
    pub fn utf8(self) -> bool {
        crate::bitfield::bit(self.0 as u32, BIT_UTF8)
    }

    pub fn set_utf8(&mut self, value: bool) {
        self.0 = crate::bitfield::set_bit(self.0 as u32, BIT_UTF8, value) as u16;
    }
}

impl From<u16> for GeneralPurposeFlags {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<GeneralPurposeFlags> for u16 {
    fn from(flags: GeneralPurposeFlags) -> Self {
        flags.0
    }
}
