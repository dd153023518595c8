//! # evtlog codec
//!
//! On-disk format types and record transcoding for the legacy Windows Event
//! Log (.evt) circular file layout.
//!
//! Everything on disk is little-endian regardless of host byte order. The
//! crate provides:
//!
//! - the three fixed structures of the format - [`LogHeader`],
//!   [`RecordHeader`] and [`EofRecord`] - marshaled through a reusable
//!   [field table](fields) of width-tagged accessors;
//! - the record transcoder mapping between [`RawRecord`] (fixed header plus
//!   variable tail) and the owned, decoded [`RecordContents`] form;
//! - the textual collaborators the tail encoding needs: UTF-16LE string
//!   conversion ([`wide`]) and security identifiers ([`Sid`]).
//!
//! Per-field encode/decode conditions accumulate in bitmask values
//! ([`DecodeErrors`], [`EncodeErrors`]) so a best-effort reader can still
//! inspect whatever did decode.
//!
//! ## Example
//!
//! ```
//! use evtlog_codec::{decode_record, encode_record, RecordContents, RecordHeader};
//!
//! let contents = RecordContents {
//!     source_name: Some("Service Control Manager".into()),
//!     computer_name: Some("WORKSTATION".into()),
//!     ..RecordContents::default()
//! };
//! let mut header = RecordHeader::default();
//! header.record_number = 1;
//!
//! let raw = encode_record(&contents, header).unwrap();
//! let (decoded, errors) = decode_record(&raw);
//! assert!(errors.is_empty());
//! assert_eq!(decoded, contents);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fields;
mod mask;
mod record;
mod sid;
mod types;
pub mod wide;

pub use record::{
    decode_record, encode_record, DecodeErrors, EncodeErrors, RawRecord, RecordContents,
};
pub use sid::{Sid, SidParseError};
pub use types::{
    EofRecord, EventType, HeaderErrors, LogHeader, RecordHeader, ALIGNMENT, EOF_RECORD_FIELDS,
    EOF_RECORD_LENGTH, HEADER_LENGTH, LOG_HEADER_FIELDS, RECORD_HEADER_FIELDS,
    RECORD_HEADER_LENGTH, RECORD_MIN_LENGTH, SIGNATURE,
};
