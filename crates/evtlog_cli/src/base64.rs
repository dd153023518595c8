//! Resumable streaming base64 transcoding.
//!
//! The event payload travels through CSV as base64 text. Both directions
//! are explicit state machines carrying the pending bits between calls, so
//! arbitrarily large payloads can be processed in chunks and resumed later.
//! The decoder skips bytes outside the alphabet, which makes it tolerant of
//! padding and whitespace; on alphabet input it is injective with the
//! encoder.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_value(value: u8) -> u8 {
    ALPHABET[usize::from(value & 0x3F)]
}

fn decode_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

enum EncodeStep {
    A,
    B,
    C,
}

/// A resumable base64 encoder.
pub struct Base64Encoder {
    step: EncodeStep,
    carry: u8,
}

impl Base64Encoder {
    /// Creates an encoder at the start of a stream.
    pub fn new() -> Self {
        Self {
            step: EncodeStep::A,
            carry: 0,
        }
    }

    /// Encodes one chunk of input, appending text to `output`.
    pub fn update(&mut self, input: &[u8], output: &mut Vec<u8>) {
        for &byte in input {
            match self.step {
                EncodeStep::A => {
                    output.push(encode_value(byte >> 2));
                    self.carry = (byte & 0x03) << 4;
                    self.step = EncodeStep::B;
                }
                EncodeStep::B => {
                    output.push(encode_value(self.carry | (byte >> 4)));
                    self.carry = (byte & 0x0F) << 2;
                    self.step = EncodeStep::C;
                }
                EncodeStep::C => {
                    output.push(encode_value(self.carry | (byte >> 6)));
                    output.push(encode_value(byte & 0x3F));
                    self.step = EncodeStep::A;
                }
            }
        }
    }

    /// Flushes the pending bits and padding, ending the stream.
    pub fn finish(self, output: &mut Vec<u8>) {
        match self.step {
            EncodeStep::A => {}
            EncodeStep::B => {
                output.push(encode_value(self.carry));
                output.extend_from_slice(b"==");
            }
            EncodeStep::C => {
                output.push(encode_value(self.carry));
                output.push(b'=');
            }
        }
    }
}

impl Default for Base64Encoder {
    fn default() -> Self {
        Self::new()
    }
}

enum DecodeStep {
    A,
    B,
    C,
    D,
}

/// A resumable base64 decoder.
pub struct Base64Decoder {
    step: DecodeStep,
    carry: u8,
}

impl Base64Decoder {
    /// Creates a decoder at the start of a stream.
    pub fn new() -> Self {
        Self {
            step: DecodeStep::A,
            carry: 0,
        }
    }

    /// Decodes one chunk of text, appending bytes to `output`.
    ///
    /// Bytes outside the alphabet, padding included, are skipped.
    pub fn update(&mut self, input: &[u8], output: &mut Vec<u8>) {
        for &byte in input {
            let Some(value) = decode_value(byte) else {
                continue;
            };
            match self.step {
                DecodeStep::A => {
                    self.carry = value << 2;
                    self.step = DecodeStep::B;
                }
                DecodeStep::B => {
                    output.push(self.carry | (value >> 4));
                    self.carry = (value & 0x0F) << 4;
                    self.step = DecodeStep::C;
                }
                DecodeStep::C => {
                    output.push(self.carry | (value >> 2));
                    self.carry = (value & 0x03) << 6;
                    self.step = DecodeStep::D;
                }
                DecodeStep::D => {
                    output.push(self.carry | value);
                    self.step = DecodeStep::A;
                }
            }
        }
    }
}

impl Default for Base64Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a whole buffer in one go.
pub fn encode(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(data.len().div_ceil(3) * 4);
    let mut encoder = Base64Encoder::new();
    encoder.update(data, &mut out);
    encoder.finish(&mut out);
    // the alphabet is pure ASCII
    String::from_utf8(out).unwrap_or_default()
}

/// Decodes a whole buffer in one go, skipping non-alphabet bytes.
pub fn decode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() / 4 * 3 + 3);
    let mut decoder = Base64Decoder::new();
    decoder.update(text.as_bytes(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4648_vectors() {
        let vectors = [
            ("", ""),
            ("f", "Zg=="),
            ("fo", "Zm8="),
            ("foo", "Zm9v"),
            ("foob", "Zm9vYg=="),
            ("fooba", "Zm9vYmE="),
            ("foobar", "Zm9vYmFy"),
        ];
        for (plain, encoded) in vectors {
            assert_eq!(encode(plain.as_bytes()), encoded);
            assert_eq!(decode(encoded), plain.as_bytes());
        }
    }

    #[test]
    fn round_trip_all_byte_values() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&data)), data);
    }

    #[test]
    fn chunked_encoding_matches_whole_buffer() {
        let data: Vec<u8> = (0..100).map(|i| (i * 37) as u8).collect();
        let whole = encode(&data);

        for chunk_size in [1, 2, 3, 5, 7] {
            let mut out = Vec::new();
            let mut encoder = Base64Encoder::new();
            for chunk in data.chunks(chunk_size) {
                encoder.update(chunk, &mut out);
            }
            encoder.finish(&mut out);
            assert_eq!(String::from_utf8(out).unwrap(), whole);
        }
    }

    #[test]
    fn chunked_decoding_resumes_mid_quantum() {
        let encoded = encode(b"resumable state");
        for chunk_size in [1, 2, 3, 5] {
            let mut out = Vec::new();
            let mut decoder = Base64Decoder::new();
            for chunk in encoded.as_bytes().chunks(chunk_size) {
                decoder.update(chunk, &mut out);
            }
            assert_eq!(out, b"resumable state");
        }
    }

    #[test]
    fn decode_skips_whitespace_and_padding() {
        assert_eq!(decode("Zm9v\nYmFy"), b"foobar");
        assert_eq!(decode(" Z g = = "), b"f");
        assert_eq!(decode("===="), b"");
    }
}
