//! Fixed structures of the .evt file format.

use crate::fields::{field, read_fields, write_fields, FieldSpec};
use crate::mask::error_mask;
use std::fmt;

/// The format magic, ASCII `eLfL` read as a little-endian dword.
pub const SIGNATURE: u32 = 0x654c_664c;

/// Size of the log header, stored at both of its ends.
pub const HEADER_LENGTH: u32 = 0x30;

/// Size of the fixed part of an event record.
pub const RECORD_HEADER_LENGTH: u32 = 56;

/// Size of the EOF sentinel record.
pub const EOF_RECORD_LENGTH: u32 = 0x28;

/// Smallest length a valid record can declare: the fixed header, two empty
/// name strings and the trailing copy of the length.
pub const RECORD_MIN_LENGTH: u32 = 64;

/// Many values of the format sit on this dword boundary.
pub const ALIGNMENT: u32 = 4;

error_mask! {
    /// Conditions found while validating a log header.
    HeaderErrors {
        /// One of the two size fields is not `HEADER_LENGTH`.
        WRONG_LENGTH = 0x01 => "wrong length",
        /// The magic signature does not match.
        WRONG_SIGNATURE = 0x02 => "wrong signature",
        /// The version is not 1.1.
        WRONG_VERSION = 0x04 => "wrong version",
    }
}

/// The fixed 48-byte structure at the start of every log file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogHeader {
    /// The size of the header structure, always `HEADER_LENGTH`.
    pub header_size: u32,
    /// Always [`SIGNATURE`].
    pub signature: u32,
    /// Major format version, always 1.
    pub major_version: u32,
    /// Minor format version, always 1.
    pub minor_version: u32,
    /// Byte offset of the oldest record.
    pub start_offset: u32,
    /// Byte offset of the EOF sentinel record.
    pub end_offset: u32,
    /// The number the next appended record will carry.
    pub current_record_number: u32,
    /// The number of the oldest record, 0 for an empty log.
    pub oldest_record_number: u32,
    /// Total size of the log file in bytes.
    pub max_size: u32,
    /// Status flags, see the `FLAG_` constants.
    pub flags: u32,
    /// Retention value recorded at creation time.
    pub retention: u32,
    /// The trailing size field, always `HEADER_LENGTH`.
    pub end_header_size: u32,
}

/// Field table for [`LogHeader`].
pub static LOG_HEADER_FIELDS: [FieldSpec<LogHeader>; 12] = [
    field!(LogHeader, header_size: u32),
    field!(LogHeader, signature: u32),
    field!(LogHeader, major_version: u32),
    field!(LogHeader, minor_version: u32),
    field!(LogHeader, start_offset: u32),
    field!(LogHeader, end_offset: u32),
    field!(LogHeader, current_record_number: u32),
    field!(LogHeader, oldest_record_number: u32),
    field!(LogHeader, max_size: u32),
    field!(LogHeader, flags: u32),
    field!(LogHeader, retention: u32),
    field!(LogHeader, end_header_size: u32),
];

impl LogHeader {
    /// Records were written but the file was not closed properly.
    pub const FLAG_DIRTY: u32 = 0x0001;
    /// The records in the log have wrapped around the physical end.
    pub const FLAG_WRAP: u32 = 0x0002;
    /// The most recent write attempt failed for lack of space.
    pub const FLAG_LOGFULL_WRITTEN: u32 = 0x0004;
    /// The archive attribute has been set for the file.
    pub const FLAG_ARCHIVE_SET: u32 = 0x0008;

    /// Synthesizes the header of an empty log of `max_size` bytes.
    #[must_use]
    pub fn new(max_size: u32) -> Self {
        Self {
            header_size: HEADER_LENGTH,
            signature: SIGNATURE,
            major_version: 1,
            minor_version: 1,
            start_offset: HEADER_LENGTH,
            end_offset: HEADER_LENGTH,
            current_record_number: 1,
            oldest_record_number: 0,
            max_size,
            flags: 0,
            retention: 0,
            end_header_size: HEADER_LENGTH,
        }
    }

    /// Checks the size fields, the magic signature and the format version.
    #[must_use]
    pub fn validate(&self) -> HeaderErrors {
        let mut errors = HeaderErrors::empty();
        if self.header_size != HEADER_LENGTH || self.end_header_size != HEADER_LENGTH {
            errors.insert(HeaderErrors::WRONG_LENGTH);
        }
        if self.signature != SIGNATURE {
            errors.insert(HeaderErrors::WRONG_SIGNATURE);
        }
        if self.major_version != 1 || self.minor_version != 1 {
            errors.insert(HeaderErrors::WRONG_VERSION);
        }
        errors
    }

    /// Returns true when the dirty flag is set.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.flags & Self::FLAG_DIRTY != 0
    }

    /// Returns true when the wrap flag is set.
    #[must_use]
    pub const fn is_wrapped(&self) -> bool {
        self.flags & Self::FLAG_WRAP != 0
    }

    /// Decodes the header from its on-disk bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; HEADER_LENGTH as usize]) -> Self {
        let mut header = Self::default();
        read_fields(&mut bytes.as_slice(), &LOG_HEADER_FIELDS, &mut header)
            .expect("field table matches the buffer size");
        header
    }

    /// Encodes the header into its on-disk bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LENGTH as usize] {
        let mut buf = Vec::with_capacity(HEADER_LENGTH as usize);
        write_fields(&mut buf, &LOG_HEADER_FIELDS, self).expect("writing to a Vec cannot fail");
        let mut out = [0u8; HEADER_LENGTH as usize];
        out.copy_from_slice(&buf);
        out
    }
}

/// The fixed 56-byte structure preceding each record's variable tail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordHeader {
    /// Total size of the record in bytes, stored at both ends of the entry.
    /// Includes the variable tail, any pad bytes and the trailing copy.
    pub length: u32,
    /// Always [`SIGNATURE`].
    pub signature: u32,
    /// The number of the record, monotonically increasing and never zero.
    pub record_number: u32,
    /// Seconds since the Unix epoch at which the entry was submitted.
    pub time_generated: u32,
    /// Seconds since the Unix epoch at which the entry was written.
    pub time_written: u32,
    /// Source-specific event identifier.
    pub event_id: u32,
    /// The type of the event, see [`EventType`].
    pub event_type: u16,
    /// Number of message strings at `string_offset`.
    pub num_strings: u16,
    /// Source-specific category for the event.
    pub event_category: u16,
    /// Reserved.
    pub reserved_flags: u16,
    /// Reserved.
    pub closing_record_number: u32,
    /// Offset of the message strings within the record.
    pub string_offset: u32,
    /// Size of the security identifier, zero when none was provided.
    pub user_sid_length: u32,
    /// Offset of the security identifier within the record.
    pub user_sid_offset: u32,
    /// Size of the event-specific data.
    pub data_length: u32,
    /// Offset of the event-specific data within the record.
    pub data_offset: u32,
}

/// Field table for [`RecordHeader`].
pub static RECORD_HEADER_FIELDS: [FieldSpec<RecordHeader>; 16] = [
    field!(RecordHeader, length: u32),
    field!(RecordHeader, signature: u32),
    field!(RecordHeader, record_number: u32),
    field!(RecordHeader, time_generated: u32),
    field!(RecordHeader, time_written: u32),
    field!(RecordHeader, event_id: u32),
    field!(RecordHeader, event_type: u16),
    field!(RecordHeader, num_strings: u16),
    field!(RecordHeader, event_category: u16),
    field!(RecordHeader, reserved_flags: u16),
    field!(RecordHeader, closing_record_number: u32),
    field!(RecordHeader, string_offset: u32),
    field!(RecordHeader, user_sid_length: u32),
    field!(RecordHeader, user_sid_offset: u32),
    field!(RecordHeader, data_length: u32),
    field!(RecordHeader, data_offset: u32),
];

impl RecordHeader {
    /// Decodes the fixed record header from its on-disk bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; RECORD_HEADER_LENGTH as usize]) -> Self {
        let mut header = Self::default();
        read_fields(&mut bytes.as_slice(), &RECORD_HEADER_FIELDS, &mut header)
            .expect("field table matches the buffer size");
        header
    }

    /// Encodes the fixed record header into its on-disk bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_LENGTH as usize] {
        let mut buf = Vec::with_capacity(RECORD_HEADER_LENGTH as usize);
        write_fields(&mut buf, &RECORD_HEADER_FIELDS, self).expect("writing to a Vec cannot fail");
        let mut out = [0u8; RECORD_HEADER_LENGTH as usize];
        out.copy_from_slice(&buf);
        out
    }
}

/// The fixed 40-byte sentinel that follows the newest record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EofRecord {
    /// Leading size of the sentinel, always `EOF_RECORD_LENGTH`.
    pub size_beginning: u32,
    /// Always 0x11111111.
    pub one: u32,
    /// Always 0x22222222.
    pub two: u32,
    /// Always 0x33333333.
    pub three: u32,
    /// Always 0x44444444.
    pub four: u32,
    /// Copy of the header's start offset.
    pub begin_record: u32,
    /// Offset of this sentinel, a copy of the header's end offset.
    pub end_record: u32,
    /// Copy of the header's current record number.
    pub current_record_number: u32,
    /// Copy of the header's oldest record number.
    pub oldest_record_number: u32,
    /// Trailing size of the sentinel, always `EOF_RECORD_LENGTH`.
    pub size_end: u32,
}

/// Field table for [`EofRecord`].
pub static EOF_RECORD_FIELDS: [FieldSpec<EofRecord>; 10] = [
    field!(EofRecord, size_beginning: u32),
    field!(EofRecord, one: u32),
    field!(EofRecord, two: u32),
    field!(EofRecord, three: u32),
    field!(EofRecord, four: u32),
    field!(EofRecord, begin_record: u32),
    field!(EofRecord, end_record: u32),
    field!(EofRecord, current_record_number: u32),
    field!(EofRecord, oldest_record_number: u32),
    field!(EofRecord, size_end: u32),
];

impl EofRecord {
    /// Builds the sentinel mirroring the given header.
    #[must_use]
    pub fn for_header(header: &LogHeader) -> Self {
        Self {
            size_beginning: EOF_RECORD_LENGTH,
            one: 0x1111_1111,
            two: 0x2222_2222,
            three: 0x3333_3333,
            four: 0x4444_4444,
            begin_record: header.start_offset,
            end_record: header.end_offset,
            current_record_number: header.current_record_number,
            oldest_record_number: header.oldest_record_number,
            size_end: EOF_RECORD_LENGTH,
        }
    }

    /// Checks the four magic words and the repeated length.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.one == 0x1111_1111
            && self.two == 0x2222_2222
            && self.three == 0x3333_3333
            && self.four == 0x4444_4444
            && self.size_end == EOF_RECORD_LENGTH
    }

    /// Encodes the sentinel into its on-disk bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; EOF_RECORD_LENGTH as usize] {
        let mut buf = Vec::with_capacity(EOF_RECORD_LENGTH as usize);
        write_fields(&mut buf, &EOF_RECORD_FIELDS, self).expect("writing to a Vec cannot fail");
        let mut out = [0u8; EOF_RECORD_LENGTH as usize];
        out.copy_from_slice(&buf);
        out
    }
}

/// The type of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EventType {
    /// Error event.
    Error = 0x0001,
    /// Warning event.
    Warning = 0x0002,
    /// Information event.
    Information = 0x0004,
    /// Success Audit event.
    AuditSuccess = 0x0008,
    /// Failure Audit event.
    AuditFailure = 0x0010,
}

impl EventType {
    /// Converts the on-disk value to an event type.
    #[must_use]
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Error),
            0x0002 => Some(Self::Warning),
            0x0004 => Some(Self::Information),
            0x0008 => Some(Self::AuditSuccess),
            0x0010 => Some(Self::AuditFailure),
            _ => None,
        }
    }

    /// Returns the on-disk value.
    #[must_use]
    pub const fn as_raw(self) -> u16 {
        self as u16
    }

    /// The display name used by the conversion tools.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Information => "Information",
            Self::AuditSuccess => "Audit Success",
            Self::AuditFailure => "Audit Failure",
        }
    }

    /// Parses a display name back to an event type.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Error" => Some(Self::Error),
            "Warning" => Some(Self::Warning),
            "Information" => Some(Self::Information),
            "Audit Success" => Some(Self::AuditSuccess),
            "Audit Failure" => Some(Self::AuditFailure),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
