//! IBM Code Page 437 codec.
//!
//! APPNOTE.TXT says a filename or comment is CP437 unless the UTF-8 general
//! purpose bit is set (see `flags.rs`). Bytes 0x00-0x7F map straight onto
//! ASCII; the upper half is this fixed 128-entry table.

/// Unicode code points for CP437 bytes 0x80..=0xFF, in order.
const UPPER_HALF: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', 'É', 'æ', 'Æ',
    'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', 'á', 'í', 'ó', 'ú', 'ñ', 'Ñ',
    'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕',
    '╣', '║', '╗', '╝', '╜', '╛', '┐', '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦',
    '╠', '═', '╬', '╧', '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐',
    '▀', 'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', '≡', '±',
    '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{00A0}',
];

/// Decode a CP437-encoded byte string to a `String`. Every byte has a
/// defined mapping, so this never fails.
pub fn decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                UPPER_HALF[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// Encode a string as CP437 if every character is representable, else
/// `None`.
pub fn encode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        if (ch as u32) < 0x80 {
            out.push(ch as u8);
        } else if let Some(pos) = UPPER_HALF.iter().position(|&c| c == ch) {
            out.push(0x80 + pos as u8);
        } else {
            return None;
        }
    }
    Some(out)
}

/// Whether every character in `s` has a CP437 representation.
pub fn is_cp437_encodable(s: &str) -> bool {
    s.chars()
        .all(|ch| (ch as u32) < 0x80 || UPPER_HALF.contains(&ch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trips() {
        let encoded = encode("hello.txt").unwrap();
        assert_eq!(decode(&encoded), "hello.txt");
    }

    #[test]
    fn accented_upper_half_round_trips() {
        let name = "café.txt";
        assert!(is_cp437_encodable(name));
        let encoded = encode(name).unwrap();
        assert_eq!(decode(&encoded), name);
    }

    #[test]
    fn unrepresentable_unicode_rejected() {
        assert!(!is_cp437_encodable("emoji-😀.txt"));
        assert!(encode("emoji-😀.txt").is_none());
    }

    #[test]
    fn box_drawing_byte_decodes() {
        // 0xDB is the solid block.
        assert_eq!(decode(&[0xDB]), "█");
    }
}
