//! Generic little-endian field marshaling.
//!
//! Every fixed structure of the format is described by an ordered table of
//! accessors, each pairing a getter/setter with its on-wire width. The same
//! machinery drives the log header, the record header and the EOF sentinel,
//! without relying on memory layout tricks. Fields travel through the stream
//! strictly in table order, so the encoded size of a structure is the sum of
//! its field widths.

use std::io::{Read, Write};

/// On-wire width of a single field.
///
/// Expressing the width as an enum makes an unsupported width impossible to
/// construct, which is what the well-formedness of a table amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// One byte.
    U8,
    /// Two bytes, little-endian.
    U16,
    /// Four bytes, little-endian.
    U32,
    /// Eight bytes, little-endian.
    U64,
}

impl FieldWidth {
    /// Number of bytes the field occupies on the wire.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }
}

/// One entry of a field table: an accessor pair plus the on-wire width.
pub struct FieldSpec<T> {
    /// On-wire width of the field.
    pub width: FieldWidth,
    /// Reads the field out of the structure, widened to u64.
    pub get: fn(&T) -> u64,
    /// Stores a decoded value into the structure's field.
    pub set: fn(&mut T, u64),
}

/// Builds a [`FieldSpec`] for a named structure field.
macro_rules! field {
    ($ty:ty, $field:ident: u16) => {
        $crate::fields::FieldSpec {
            width: $crate::fields::FieldWidth::U16,
            get: |s: &$ty| u64::from(s.$field),
            set: |s: &mut $ty, v| s.$field = v as u16,
        }
    };
    ($ty:ty, $field:ident: u32) => {
        $crate::fields::FieldSpec {
            width: $crate::fields::FieldWidth::U32,
            get: |s: &$ty| u64::from(s.$field),
            set: |s: &mut $ty, v| s.$field = v as u32,
        }
    };
}

pub(crate) use field;

/// Reads every field of the table from the stream into `target`.
///
/// # Errors
///
/// Returns the underlying I/O error when the stream cannot supply the exact
/// byte count of a field.
pub fn read_fields<T, R: Read>(
    reader: &mut R,
    table: &[FieldSpec<T>],
    target: &mut T,
) -> std::io::Result<()> {
    read_fields_range(reader, table, target, 0, table.len())
}

/// Reads a contiguous sub-range of the table from the stream into `target`.
///
/// Used where a structure is consumed in more than one piece, such as
/// verifying an EOF sentinel after its leading length word has already been
/// read. Passing a range outside the table is a programming error and
/// panics.
///
/// # Errors
///
/// Returns the underlying I/O error when the stream cannot supply the exact
/// byte count of a field.
pub fn read_fields_range<T, R: Read>(
    reader: &mut R,
    table: &[FieldSpec<T>],
    target: &mut T,
    first: usize,
    count: usize,
) -> std::io::Result<()> {
    for spec in &table[first..first + count] {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf[..spec.width.bytes()])?;
        (spec.set)(target, u64::from_le_bytes(buf));
    }
    Ok(())
}

/// Writes every field of the table from `source` to the stream.
///
/// # Errors
///
/// Returns the underlying I/O error when the stream cannot accept the exact
/// byte count of a field.
pub fn write_fields<T, W: Write>(
    writer: &mut W,
    table: &[FieldSpec<T>],
    source: &T,
) -> std::io::Result<()> {
    write_fields_range(writer, table, source, 0, table.len())
}

/// Writes a contiguous sub-range of the table from `source` to the stream.
///
/// Passing a range outside the table is a programming error and panics.
///
/// # Errors
///
/// Returns the underlying I/O error when the stream cannot accept the exact
/// byte count of a field.
pub fn write_fields_range<T, W: Write>(
    writer: &mut W,
    table: &[FieldSpec<T>],
    source: &T,
    first: usize,
    count: usize,
) -> std::io::Result<()> {
    for spec in &table[first..first + count] {
        let bytes = (spec.get)(source).to_le_bytes();
        writer.write_all(&bytes[..spec.width.bytes()])?;
    }
    Ok(())
}

/// Sum of the field widths of a table, in bytes.
#[must_use]
pub fn encoded_len<T>(table: &[FieldSpec<T>]) -> usize {
    table.iter().map(|spec| spec.width.bytes()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, PartialEq, Debug)]
    struct Sample {
        a: u32,
        b: u16,
        c: u16,
    }

    static SAMPLE_FIELDS: [FieldSpec<Sample>; 3] = [
        field!(Sample, a: u32),
        field!(Sample, b: u16),
        field!(Sample, c: u16),
    ];

    #[test]
    fn round_trip_is_little_endian() {
        let sample = Sample {
            a: 0x0403_0201,
            b: 0x0605,
            c: 0x0807,
        };

        let mut encoded = Vec::new();
        write_fields(&mut encoded, &SAMPLE_FIELDS, &sample).unwrap();
        assert_eq!(encoded, [1, 2, 3, 4, 5, 6, 7, 8]);

        let mut decoded = Sample::default();
        read_fields(&mut encoded.as_slice(), &SAMPLE_FIELDS, &mut decoded).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn partial_range() {
        let bytes = [5u8, 6, 7, 8];
        let mut decoded = Sample::default();
        read_fields_range(&mut bytes.as_slice(), &SAMPLE_FIELDS, &mut decoded, 1, 2).unwrap();
        assert_eq!(
            decoded,
            Sample {
                a: 0,
                b: 0x0605,
                c: 0x0807
            }
        );

        let mut encoded = Vec::new();
        write_fields_range(&mut encoded, &SAMPLE_FIELDS, &decoded, 1, 2).unwrap();
        assert_eq!(encoded, [5, 6, 7, 8]);
    }

    #[test]
    fn short_stream_is_an_error() {
        let bytes = [1u8, 2, 3];
        let mut decoded = Sample::default();
        let result = read_fields(&mut bytes.as_slice(), &SAMPLE_FIELDS, &mut decoded);
        assert!(result.is_err());
    }

    #[test]
    fn table_length() {
        assert_eq!(encoded_len(&SAMPLE_FIELDS), 8);
    }
}
