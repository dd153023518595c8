//! Export command: .evt log to CSV event listing.

use crate::base64;
use crate::csv::CsvWriter;
use crate::strings::join_strings;
use evtlog_codec::{decode_record, EventType, RawRecord, RecordContents};
use evtlog_core::EventLog;
use evtlog_storage::FileVolume;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::warn;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runs the export command.
pub fn run(
    input: &Path,
    output: Option<&Path>,
    append: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut log = EventLog::open(Box::new(FileVolume::open(input)?))?;

    let out: Box<dyn Write> = match output {
        Some(path) if path != Path::new("-") => Box::new(
            OpenOptions::new()
                .write(true)
                .create(true)
                .append(append)
                .truncate(!append)
                .open(path)?,
        ),
        _ => Box::new(io::stdout()),
    };
    let mut writer = CsvWriter::new(BufWriter::new(out));

    // a leading single-field record carries the log size, the one
    // non-record value needed to reconstruct the file
    if !append {
        writer.write_field(&log.header().max_size.to_string())?;
        writer.end_record()?;
    }

    // per-record decode failures are skipped with a diagnostic; failures on
    // the log itself abort the run
    while let Some(raw) = log.read_record()? {
        let (contents, errors) = decode_record(&raw);
        if !errors.is_empty() {
            warn!(
                "record {}: decoding failed ({errors}), skipping it",
                raw.header.record_number
            );
            continue;
        }
        write_record(&mut writer, &raw, &contents)?;
    }

    writer.flush()?;
    log.close()?;
    Ok(())
}

fn write_record<W: Write>(
    writer: &mut CsvWriter<W>,
    raw: &RawRecord,
    contents: &RecordContents,
) -> io::Result<()> {
    writer.write_field(&raw.header.record_number.to_string())?;
    writer.write_field(&contents.time_generated.format(TIME_FORMAT).to_string())?;
    writer.write_field(&contents.time_written.format(TIME_FORMAT).to_string())?;
    writer.write_field(&raw.header.event_id.to_string())?;

    // unknown types are expressed numerically
    match EventType::from_raw(raw.header.event_type) {
        Some(ty) => writer.write_field(ty.name())?,
        None => writer.write_field(&raw.header.event_type.to_string())?,
    }

    writer.write_field(&raw.header.event_category.to_string())?;
    writer.write_field(contents.source_name.as_deref().unwrap_or(""))?;
    writer.write_field(contents.computer_name.as_deref().unwrap_or(""))?;
    writer.write_field(contents.user_sid.as_deref().unwrap_or(""))?;
    writer.write_field(&join_strings(&contents.strings))?;
    writer.write_field(&base64::encode(&contents.data))?;
    writer.end_record()
}
