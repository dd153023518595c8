//! Transcoding between raw on-disk records and the decoded record form.
//!
//! A raw record is the fixed 56-byte header followed by the variable tail:
//! the source and computer names, an optional dword-aligned SID blob, the
//! message strings back to back, the opaque payload, padding to the dword
//! boundary and a trailing little-endian copy of the total length. The
//! decoded form owns every buffer and is only ever built here, so a record
//! is never partially constructed and never freed twice.

use crate::mask::error_mask;
use crate::sid::Sid;
use crate::types::{RecordHeader, ALIGNMENT, RECORD_HEADER_LENGTH, RECORD_MIN_LENGTH, SIGNATURE};
use crate::wide;
use chrono::{DateTime, Utc};

error_mask! {
    /// Conditions found while decoding a raw record, several may combine.
    DecodeErrors {
        /// The input is shorter than the smallest valid record.
        INVALID = 0x01 => "invalid record",
        /// The source name did not decode.
        SOURCE_NAME_FAILED = 0x02 => "source name",
        /// The computer name did not decode.
        COMPUTER_NAME_FAILED = 0x04 => "computer name",
        /// A message string did not decode.
        STRINGS_FAILED = 0x08 => "strings",
        /// The declared SID range runs outside the record.
        SID_OVERFLOW = 0x10 => "SID overflow",
        /// The SID bytes are not a well-formed SID.
        SID_FAILED = 0x20 => "SID",
        /// The declared payload range runs outside the record.
        DATA_OVERFLOW = 0x40 => "data overflow",
        /// The trailing length copy disagrees with the header.
        LENGTH_MISMATCH = 0x80 => "length mismatch",
    }
}

error_mask! {
    /// Conditions found while encoding record contents.
    EncodeErrors {
        /// The source name is absent.
        SOURCE_NAME_FAILED = 0x01 => "source name",
        /// The computer name is absent.
        COMPUTER_NAME_FAILED = 0x02 => "computer name",
        /// The textual SID did not parse.
        SID_FAILED = 0x04 => "SID",
        /// The message strings cannot be represented.
        STRINGS_FAILED = 0x08 => "strings",
    }
}

/// A record as it sits in the file: the fixed header and the variable tail.
///
/// The tail includes the trailing copy of the record length, so
/// `header.length == RECORD_HEADER_LENGTH + tail.len()` for a well-formed
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// The fixed portion of the record.
    pub header: RecordHeader,
    /// The variable portion, including padding and the trailing length.
    pub tail: Vec<u8>,
}

/// The decoded, owned form of a record.
///
/// This is the only representation application code manipulates; raw
/// records are an encoding detail of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContents {
    /// When the entry was submitted.
    pub time_generated: DateTime<Utc>,
    /// When the entry was written to the log.
    pub time_written: DateTime<Utc>,
    /// Name of the event source.
    pub source_name: Option<String>,
    /// Name of the computer that generated the event.
    pub computer_name: Option<String>,
    /// Security identifier in its textual `S-R-A-S...` form.
    pub user_sid: Option<String>,
    /// The message strings.
    pub strings: Vec<String>,
    /// The opaque event-specific payload.
    pub data: Vec<u8>,
}

impl Default for RecordContents {
    fn default() -> Self {
        Self {
            time_generated: DateTime::UNIX_EPOCH,
            time_written: DateTime::UNIX_EPOCH,
            source_name: None,
            computer_name: None,
            user_sid: None,
            strings: Vec::new(),
            data: Vec::new(),
        }
    }
}

fn timestamp(seconds: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(seconds), 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Decodes a raw record into its owned form.
///
/// The walk is best-effort: every condition the tail exhibits is flagged in
/// the returned mask while the fields that did decode are still returned.
/// Input shorter than the smallest valid record yields a zeroed result and
/// the `INVALID` bit alone.
#[must_use]
pub fn decode_record(raw: &RawRecord) -> (RecordContents, DecodeErrors) {
    let tail = raw.tail.as_slice();
    if tail.len() < (RECORD_MIN_LENGTH - RECORD_HEADER_LENGTH) as usize {
        return (RecordContents::default(), DecodeErrors::INVALID);
    }

    let hdr = &raw.header;
    let mut errors = DecodeErrors::empty();
    let mut contents = RecordContents {
        time_generated: timestamp(hdr.time_generated),
        time_written: timestamp(hdr.time_written),
        ..RecordContents::default()
    };

    // the two names lead the tail, back to back
    match wide::decode_utf16le(tail) {
        Some((name, used)) => {
            contents.source_name = Some(name);
            match wide::decode_utf16le(&tail[used..]) {
                Some((name, _)) => contents.computer_name = Some(name),
                None => errors.insert(DecodeErrors::COMPUTER_NAME_FAILED),
            }
        }
        None => errors.insert(DecodeErrors::SOURCE_NAME_FAILED),
    }

    if hdr.num_strings > 0 {
        match hdr.string_offset.checked_sub(RECORD_HEADER_LENGTH) {
            Some(start) => {
                let mut offset = start as usize;
                for _ in 0..hdr.num_strings {
                    match tail.get(offset..).and_then(wide::decode_utf16le) {
                        Some((string, used)) => {
                            contents.strings.push(string);
                            offset += used;
                        }
                        None => {
                            errors.insert(DecodeErrors::STRINGS_FAILED);
                            break;
                        }
                    }
                }
            }
            None => errors.insert(DecodeErrors::STRINGS_FAILED),
        }
    }

    // blob offsets are record-relative; the usable tail stops before the
    // trailing length copy
    let usable = u64::from(RECORD_HEADER_LENGTH) + tail.len() as u64 - 4;

    let sid_end = u64::from(hdr.user_sid_offset) + u64::from(hdr.user_sid_length);
    if sid_end > usable
        || (hdr.user_sid_length > 0 && hdr.user_sid_offset < RECORD_HEADER_LENGTH)
    {
        errors.insert(DecodeErrors::SID_OVERFLOW);
    } else if hdr.user_sid_length > 0 {
        let start = (hdr.user_sid_offset - RECORD_HEADER_LENGTH) as usize;
        match Sid::from_bytes(&tail[start..start + hdr.user_sid_length as usize]) {
            Some(sid) => contents.user_sid = Some(sid.to_string()),
            None => errors.insert(DecodeErrors::SID_FAILED),
        }
    }

    let data_end = u64::from(hdr.data_offset) + u64::from(hdr.data_length);
    if data_end > usable || (hdr.data_length > 0 && hdr.data_offset < RECORD_HEADER_LENGTH) {
        errors.insert(DecodeErrors::DATA_OVERFLOW);
    } else if hdr.data_length > 0 {
        let start = (hdr.data_offset - RECORD_HEADER_LENGTH) as usize;
        contents.data = tail[start..start + hdr.data_length as usize].to_vec();
    }

    let trailer = &tail[tail.len() - 4..];
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if stored != hdr.length {
        errors.insert(DecodeErrors::LENGTH_MISMATCH);
    }

    (contents, errors)
}

/// Encodes record contents into a raw record.
///
/// The caller supplies the header fields the transcoder does not own
/// (record number, event id, type and category); everything derived from
/// the tail layout is filled in here. Any per-field failure discards the
/// whole record and returns the accumulated mask, since a header with
/// undefined offsets must never be materialized.
///
/// # Errors
///
/// Returns the mask of failed fields: an absent source or computer name, a
/// textual SID that does not parse, or a string count that does not fit the
/// format.
pub fn encode_record(
    contents: &RecordContents,
    mut header: RecordHeader,
) -> Result<RawRecord, EncodeErrors> {
    let mut errors = EncodeErrors::empty();
    let mut tail: Vec<u8> = Vec::new();
    let alignment = ALIGNMENT as usize;

    header.signature = SIGNATURE;
    // seconds since the epoch, truncated to the 32-bit on-disk fields
    header.time_generated = contents.time_generated.timestamp() as u32;
    header.time_written = contents.time_written.timestamp() as u32;

    match &contents.source_name {
        Some(name) => tail.extend_from_slice(&wide::encode_utf16le(name)),
        None => errors.insert(EncodeErrors::SOURCE_NAME_FAILED),
    }
    match &contents.computer_name {
        Some(name) => tail.extend_from_slice(&wide::encode_utf16le(name)),
        None => errors.insert(EncodeErrors::COMPUTER_NAME_FAILED),
    }

    match &contents.user_sid {
        None => {
            header.user_sid_length = 0;
            header.user_sid_offset = 0;
        }
        Some(text) => match text.parse::<Sid>() {
            Ok(sid) => {
                // the SID blob sits on a dword boundary, zero-padded
                while tail.len() % alignment != 0 {
                    tail.push(0);
                }
                let bytes = sid.to_bytes();
                header.user_sid_offset = RECORD_HEADER_LENGTH + tail.len() as u32;
                header.user_sid_length = bytes.len() as u32;
                tail.extend_from_slice(&bytes);
            }
            Err(_) => errors.insert(EncodeErrors::SID_FAILED),
        },
    }

    // a single offset covers all the strings: it names the first one
    header.string_offset = RECORD_HEADER_LENGTH + tail.len() as u32;
    match u16::try_from(contents.strings.len()) {
        Ok(count) => header.num_strings = count,
        Err(_) => errors.insert(EncodeErrors::STRINGS_FAILED),
    }
    for string in &contents.strings {
        tail.extend_from_slice(&wide::encode_utf16le(string));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    header.data_offset = RECORD_HEADER_LENGTH + tail.len() as u32;
    header.data_length = contents.data.len() as u32;
    tail.extend_from_slice(&contents.data);

    // total length counts the trailing copy of itself and rounds up to the
    // dword boundary
    let unpadded = RECORD_HEADER_LENGTH + tail.len() as u32 + 4;
    header.length = unpadded.div_ceil(ALIGNMENT) * ALIGNMENT;
    while tail.len() % alignment != 0 {
        tail.push(0);
    }
    tail.extend_from_slice(&header.length.to_le_bytes());

    Ok(RawRecord { header, tail })
}
