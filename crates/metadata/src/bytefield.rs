//! Fixed-width, null-padded text fields.
//!
//! Field bytes are treated as ISO-8859-1, so every byte maps to one char and
//! every char up to U+00FF maps back to one byte.

/// Removes every null byte, then trims surrounding whitespace.
pub fn strip(field: &[u8]) -> String {
    let text: String = field
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect();
    text.trim().to_string()
}

/// Packs `text` into exactly `width` bytes.
///
/// Text that would fill the field is cut to `width - 1` bytes so the field
/// always ends in a null byte. Absent text packs to all nulls.
pub fn pack(text: Option<&str>, width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width);
    if let Some(text) = text {
        let bytes = latin1_bytes(text);
        let keep = bytes.len().min(width.saturating_sub(1));
        out.extend_from_slice(&bytes[..keep]);
    }
    out.resize(width, 0);
    out
}

/// Encodes `text` as ISO-8859-1, replacing unrepresentable chars with `?`.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

pub fn is_latin1(text: &str) -> bool {
    text.chars().all(|ch| u32::from(ch) <= 0xFF)
}

#[cfg(test)]
mod tests {
    use super::{is_latin1, latin1_bytes, pack, strip};

    #[test]
    fn strip_removes_nulls_and_outer_whitespace() {
        assert_eq!(strip(b"  Help!\0\0\0"), "Help!");
        assert_eq!(strip(b"A\0B"), "AB");
        assert_eq!(strip(b"\0\0\0\0"), "");
    }

    #[test]
    fn strip_keeps_inner_whitespace() {
        assert_eq!(strip(b" Let  It Be \0"), "Let  It Be");
    }

    #[test]
    fn strip_is_idempotent() {
        for input in [&b"  x \0y\0 "[..], b"", b"\0", b"plain", b" a  b "] {
            let once = strip(input);
            assert_eq!(strip(once.as_bytes()), once);
        }
    }

    #[test]
    fn pack_always_fills_width() {
        let long = "x".repeat(100);
        for text in [None, Some(""), Some("abc"), Some(long.as_str())] {
            for width in [1usize, 4, 30] {
                assert_eq!(pack(text, width).len(), width);
            }
        }
        assert!(pack(Some("abc"), 0).is_empty());
    }

    #[test]
    fn pack_truncates_and_terminates() {
        let packed = pack(Some("abcdef"), 4);
        assert_eq!(packed, b"abc\0");
        let packed = pack(Some("abc"), 4);
        assert_eq!(packed, b"abc\0");
        let packed = pack(Some("ab"), 4);
        assert_eq!(packed, b"ab\0\0");
        assert_eq!(pack(None, 3), vec![0, 0, 0]);
    }

    #[test]
    fn latin1_round_trips_through_strip() {
        let bytes = latin1_bytes("Beyoncé");
        assert_eq!(bytes.len(), 7);
        assert_eq!(strip(&bytes), "Beyoncé");
        assert_eq!(latin1_bytes("日本"), b"??");
        assert!(is_latin1("Motörhead"));
        assert!(!is_latin1("日本"));
    }
}
