//! Streaming CSV reader and writer.
//!
//! Field-at-a-time processing with RFC-4180-style quoting: quoted fields
//! may span lines and contain doubled quotes; CR, CRLF and LF all end a
//! record; end-of-record and end-of-file are distinct events. An empty line
//! scans as a single zero-length field, which the conversion tools filter
//! by their empty-first-field rule.

use std::io::{self, BufRead, ErrorKind, Write};

/// What a single read produced.
#[derive(Debug, PartialEq, Eq)]
pub enum CsvEvent {
    /// A field, possibly empty.
    Field(String),
    /// The record under the cursor ended.
    EndOfRecord,
    /// Nothing further to read.
    EndOfFile,
}

enum ReadState {
    Normal,
    InQuotes,
    EndOfRecord,
    EndOfRecordAtEof,
    AtEof,
}

/// A streaming CSV reader.
pub struct CsvReader<R: BufRead> {
    input: R,
    state: ReadState,
    peeked: Option<u8>,
    line: u64,
}

impl<R: BufRead> CsvReader<R> {
    /// Creates a reader over a buffered input stream.
    pub fn new(input: R) -> Self {
        Self {
            input,
            state: ReadState::Normal,
            peeked: None,
            line: 1,
        }
    }

    /// The 1-based input line the cursor currently sits on.
    pub fn line(&self) -> u64 {
        self.line
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.peeked.take() {
            return Ok(Some(byte));
        }
        let mut buf = [0u8; 1];
        match self.input.read_exact(&mut buf) {
            Ok(()) => {
                if buf[0] == b'\n' {
                    self.line += 1;
                }
                Ok(Some(buf[0]))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn emit(field: Option<Vec<u8>>) -> io::Result<CsvEvent> {
        let text = String::from_utf8(field.unwrap_or_default())
            .map_err(|_| io::Error::new(ErrorKind::InvalidData, "CSV field is not valid UTF-8"))?;
        Ok(CsvEvent::Field(text))
    }

    /// Reads the next field or terminal event.
    ///
    /// # Errors
    ///
    /// Fails on an underlying read error or a field that is not UTF-8.
    pub fn read(&mut self) -> io::Result<CsvEvent> {
        let mut field: Option<Vec<u8>> = None;
        loop {
            match self.state {
                ReadState::Normal => match self.next_byte()? {
                    Some(b',') => return Self::emit(field),
                    Some(b'\r') => {
                        // swallow the LF of a CRLF pair
                        if let Some(byte) = self.next_byte()? {
                            if byte != b'\n' {
                                self.peeked = Some(byte);
                            }
                        }
                        self.state = ReadState::EndOfRecord;
                        return Self::emit(field);
                    }
                    Some(b'\n') => {
                        self.state = ReadState::EndOfRecord;
                        return Self::emit(field);
                    }
                    Some(b'"') => self.state = ReadState::InQuotes,
                    Some(byte) => field.get_or_insert_with(Vec::new).push(byte),
                    None => {
                        // finish the last record before reporting the end
                        self.state = ReadState::EndOfRecordAtEof;
                        return Self::emit(field);
                    }
                },
                ReadState::InQuotes => match self.next_byte()? {
                    Some(b'"') => match self.next_byte()? {
                        Some(b'"') => field.get_or_insert_with(Vec::new).push(b'"'),
                        Some(byte) => {
                            self.peeked = Some(byte);
                            self.state = ReadState::Normal;
                        }
                        None => self.state = ReadState::Normal,
                    },
                    Some(byte) => field.get_or_insert_with(Vec::new).push(byte),
                    None => {
                        self.state = ReadState::EndOfRecordAtEof;
                        return Self::emit(field);
                    }
                },
                ReadState::EndOfRecord => {
                    self.state = ReadState::Normal;
                    return Ok(CsvEvent::EndOfRecord);
                }
                ReadState::EndOfRecordAtEof => {
                    self.state = ReadState::AtEof;
                    return Ok(CsvEvent::EndOfRecord);
                }
                ReadState::AtEof => return Ok(CsvEvent::EndOfFile),
            }
        }
    }
}

/// A streaming CSV writer.
pub struct CsvWriter<W: Write> {
    output: W,
    first_field: bool,
}

impl<W: Write> CsvWriter<W> {
    /// Creates a writer over an output stream.
    pub fn new(output: W) -> Self {
        Self {
            output,
            first_field: true,
        }
    }

    /// Writes one field, quoting it when it contains a comma, a quote, a
    /// line break, or is empty.
    ///
    /// # Errors
    ///
    /// Fails on an underlying write error.
    pub fn write_field(&mut self, field: &str) -> io::Result<()> {
        if !self.first_field {
            self.output.write_all(b",")?;
        }
        self.first_field = false;

        let must_quote = field.is_empty()
            || field
                .bytes()
                .any(|b| matches!(b, b',' | b'"' | b'\r' | b'\n'));
        if must_quote {
            self.output.write_all(b"\"")?;
            self.output
                .write_all(field.replace('"', "\"\"").as_bytes())?;
            self.output.write_all(b"\"")?;
        } else {
            self.output.write_all(field.as_bytes())?;
        }
        Ok(())
    }

    /// Terminates the current record.
    ///
    /// # Errors
    ///
    /// Fails on an underlying write error.
    pub fn end_record(&mut self) -> io::Result<()> {
        self.output.write_all(b"\n")?;
        self.first_field = true;
        Ok(())
    }

    /// Flushes the underlying stream.
    ///
    /// # Errors
    ///
    /// Fails on an underlying write error.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(input: &str) -> Vec<CsvEvent> {
        let mut reader = CsvReader::new(input.as_bytes());
        let mut events = Vec::new();
        loop {
            let event = reader.read().unwrap();
            let done = event == CsvEvent::EndOfFile;
            events.push(event);
            if done {
                return events;
            }
        }
    }

    fn field(s: &str) -> CsvEvent {
        CsvEvent::Field(s.into())
    }

    #[test]
    fn plain_fields() {
        assert_eq!(
            read_all("a,b,c\n"),
            [
                field("a"),
                field("b"),
                field("c"),
                CsvEvent::EndOfRecord,
                field(""),
                CsvEvent::EndOfRecord,
                CsvEvent::EndOfFile,
            ]
        );
    }

    #[test]
    fn file_without_trailing_newline() {
        assert_eq!(
            read_all("a,b"),
            [
                field("a"),
                field("b"),
                CsvEvent::EndOfRecord,
                CsvEvent::EndOfFile,
            ]
        );
    }

    #[test]
    fn line_ending_variants() {
        for input in ["1,2\r\n3,4", "1,2\r3,4", "1,2\n3,4"] {
            assert_eq!(
                read_all(input),
                [
                    field("1"),
                    field("2"),
                    CsvEvent::EndOfRecord,
                    field("3"),
                    field("4"),
                    CsvEvent::EndOfRecord,
                    CsvEvent::EndOfFile,
                ],
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn quoted_fields() {
        assert_eq!(
            read_all("\"a,b\",\"say \"\"hi\"\"\",\"multi\nline\""),
            [
                field("a,b"),
                field("say \"hi\""),
                field("multi\nline"),
                CsvEvent::EndOfRecord,
                CsvEvent::EndOfFile,
            ]
        );
    }

    #[test]
    fn empty_line_is_one_empty_field() {
        assert_eq!(
            read_all("\n"),
            [
                field(""),
                CsvEvent::EndOfRecord,
                field(""),
                CsvEvent::EndOfRecord,
                CsvEvent::EndOfFile,
            ]
        );
    }

    #[test]
    fn line_tracking() {
        let mut reader = CsvReader::new("a\nb\nc".as_bytes());
        assert_eq!(reader.line(), 1);
        reader.read().unwrap(); // a
        reader.read().unwrap(); // EOR
        assert_eq!(reader.line(), 2);
        reader.read().unwrap(); // b
        reader.read().unwrap(); // EOR
        assert_eq!(reader.line(), 3);
    }

    #[test]
    fn writer_quotes_what_it_must() {
        let mut out = Vec::new();
        let mut writer = CsvWriter::new(&mut out);
        writer.write_field("plain").unwrap();
        writer.write_field("with,comma").unwrap();
        writer.write_field("say \"hi\"").unwrap();
        writer.write_field("").unwrap();
        writer.write_field("two\nlines").unwrap();
        writer.end_record().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "plain,\"with,comma\",\"say \"\"hi\"\"\",\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn writer_reader_round_trip() {
        let fields = ["record", "a,b", "\"quoted\"", "", "new\nline"];
        let mut encoded = Vec::new();
        let mut writer = CsvWriter::new(&mut encoded);
        for f in fields {
            writer.write_field(f).unwrap();
        }
        writer.end_record().unwrap();

        let mut reader = CsvReader::new(encoded.as_slice());
        for f in fields {
            assert_eq!(reader.read().unwrap(), field(f));
        }
        assert_eq!(reader.read().unwrap(), CsvEvent::EndOfRecord);
    }
}
