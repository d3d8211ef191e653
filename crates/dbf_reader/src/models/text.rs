//! xBase text field trimming and decoding

use encoding::all::ISO_8859_1;
use encoding::{DecoderTrap, Encoding};

/// Visual FoxPro non-memo field limit is 254 chars
pub const MAX_TEXT_FIELD_LEN: usize = 254;

/// Whitespace as the C `isspace` predicate sees it.
fn is_padding(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

/// Cap `raw` at `max_len` bytes, end the value at the first NUL, then strip
/// leading and trailing whitespace.
///
/// A field whose first byte is NUL is empty, whatever follows it.
pub fn trim_field(raw: &[u8], max_len: usize) -> &[u8] {
    let capped = &raw[..raw.len().min(max_len)];
    let capped = &capped[..capped.iter().position(|&b| b == 0).unwrap_or(capped.len())];

    let Some(start) = capped.iter().position(|&b| !is_padding(b)) else {
        return &[];
    };
    let end = capped
        .iter()
        .rposition(|&b| !is_padding(b))
        .map_or(start, |i| i + 1);

    &capped[start..end]
}

/// Decode single-byte xBase text. Every byte maps to exactly one char.
pub fn decode_latin1(bytes: &[u8]) -> String {
    ISO_8859_1
        .decode(bytes, DecoderTrap::Replace)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Trim and decode a field the way xBase tools present character data.
pub fn field_text(raw: &[u8], max_len: usize) -> String {
    decode_latin1(trim_field(raw, max_len))
}

/// Decode a NUL-padded descriptor name.
pub fn field_name(raw: &[u8]) -> String {
    field_text(raw, raw.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_padding() {
        assert_eq!(field_text(b"  ABC   \0\0", MAX_TEXT_FIELD_LEN), "ABC");
        assert_eq!(field_text(b"\tA B\r\n", MAX_TEXT_FIELD_LEN), "A B");
        assert_eq!(field_text(b"ALICE               ", MAX_TEXT_FIELD_LEN), "ALICE");
        assert_eq!(field_text(b"X", MAX_TEXT_FIELD_LEN), "X");
    }

    #[test]
    fn test_value_ends_at_first_nul() {
        assert_eq!(field_text(b"AB\0CD     ", MAX_TEXT_FIELD_LEN), "AB");
        assert_eq!(field_text(b"ABC\0  XYZ ", MAX_TEXT_FIELD_LEN), "ABC");
        assert_eq!(field_text(b"  AB \0CD", MAX_TEXT_FIELD_LEN), "AB");
        assert_eq!(trim_field(b"12\0 34", MAX_TEXT_FIELD_LEN), b"12");
    }

    #[test]
    fn test_leading_nul_is_empty() {
        assert_eq!(field_text(b"\0\0ABC", MAX_TEXT_FIELD_LEN), "");
        assert_eq!(field_text(b"\0 XYZ  ", MAX_TEXT_FIELD_LEN), "");
        assert!(!field_text(b"A\0B", MAX_TEXT_FIELD_LEN).contains('\0'));
    }

    #[test]
    fn test_all_padding_is_empty() {
        assert_eq!(field_text(b"", MAX_TEXT_FIELD_LEN), "");
        assert_eq!(field_text(b" ", MAX_TEXT_FIELD_LEN), "");
        assert_eq!(field_text(&[b' '; 200], MAX_TEXT_FIELD_LEN), "");
        assert_eq!(field_text(b"\0\0 \x0B\x0C", MAX_TEXT_FIELD_LEN), "");
    }

    #[test]
    fn test_content_past_254_bytes_is_ignored() {
        let mut raw = vec![b' '; 300];
        raw[10] = b'A';
        raw[260] = b'Z';
        assert_eq!(field_text(&raw, MAX_TEXT_FIELD_LEN), "A");

        let mut raw = vec![b'x'; 300];
        raw[0] = b' ';
        let text = field_text(&raw, MAX_TEXT_FIELD_LEN);
        assert_eq!(text.len(), 253);
    }

    #[test]
    fn test_trim_field_borrows_input() {
        let raw = b"  12.50 ";
        assert_eq!(trim_field(raw, MAX_TEXT_FIELD_LEN), b"12.50");
        assert_eq!(trim_field(raw, 4), b"12");
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"Hello World"), "Hello World");
        assert_eq!(decode_latin1(&[67, 97, 102, 233]), "Caf\u{e9}");
        assert_eq!(field_text(&[b' ', 0xC7, 0xC3, 0x4F, b' '], 254), "\u{c7}\u{c3}O");
    }

    #[test]
    fn test_field_name() {
        assert_eq!(field_name(b"ORDERNO\0\0\0\0"), "ORDERNO");
        assert_eq!(field_name(b"BARCODE_ID\0"), "BARCODE_ID");
        assert_eq!(field_name(b"NAME\0GARBAGE"), "NAME");
        assert_eq!(field_name(b"CUSTVAR_LNG"), "CUSTVAR_LNG");
    }
}
