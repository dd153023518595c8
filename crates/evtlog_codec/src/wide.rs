//! Conversion between the format's UTF-16LE strings and UTF-8.
//!
//! Strings in the record tail are stored as null-terminated UTF-16LE. The
//! decoder is bounded by the slice it is given; a string running past the
//! bound without a terminator does not decode.

/// Decodes a null-terminated UTF-16LE string from the start of `bytes`.
///
/// Returns the decoded string and the number of input bytes consumed,
/// including the terminator. Returns `None` when no terminator occurs within
/// the slice or the code units are not well-formed UTF-16.
#[must_use]
pub fn decode_utf16le(bytes: &[u8]) -> Option<(String, usize)> {
    let mut units = Vec::new();
    let mut consumed = 0;
    loop {
        let pair = bytes.get(consumed..consumed + 2)?;
        consumed += 2;
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    let decoded = String::from_utf16(&units).ok()?;
    Some((decoded, consumed))
}

/// Encodes a string as null-terminated UTF-16LE.
#[must_use]
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity((text.len() + 1) * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trip() {
        let encoded = encode_utf16le("System");
        assert_eq!(encoded.len(), 14);
        assert_eq!(&encoded[..4], &[b'S', 0, b'y', 0]);

        let (decoded, consumed) = decode_utf16le(&encoded).unwrap();
        assert_eq!(decoded, "System");
        assert_eq!(consumed, 14);
    }

    #[test]
    fn empty_string_is_just_the_terminator() {
        let encoded = encode_utf16le("");
        assert_eq!(encoded, [0, 0]);
        assert_eq!(decode_utf16le(&encoded), Some((String::new(), 2)));
    }

    #[test]
    fn surrogate_pairs() {
        let text = "log \u{1F4A1}"; // outside the BMP
        let encoded = encode_utf16le(text);
        let (decoded, _) = decode_utf16le(&encoded).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn unterminated_input_fails() {
        assert_eq!(decode_utf16le(&[b'a', 0, b'b', 0]), None);
        assert_eq!(decode_utf16le(&[b'a']), None);
        assert_eq!(decode_utf16le(&[]), None);
    }

    #[test]
    fn lone_surrogate_fails() {
        // 0xD800 with no low surrogate following
        assert_eq!(decode_utf16le(&[0x00, 0xD8, 0, 0]), None);
    }

    #[test]
    fn decode_stops_at_first_terminator() {
        let mut bytes = encode_utf16le("one");
        bytes.extend_from_slice(&encode_utf16le("two"));
        let (decoded, consumed) = decode_utf16le(&bytes).unwrap();
        assert_eq!(decoded, "one");
        assert_eq!(consumed, 8);

        let (second, _) = decode_utf16le(&bytes[consumed..]).unwrap();
        assert_eq!(second, "two");
    }
}
