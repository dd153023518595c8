//! Import command: CSV event listing to .evt log.

use crate::base64;
use crate::csv::{CsvEvent, CsvReader};
use crate::strings::split_strings;
use chrono::{DateTime, NaiveDateTime, Utc};
use evtlog_codec::{encode_record, EventType, RecordContents, RecordHeader};
use evtlog_core::{CoreError, EventLog};
use evtlog_storage::FileVolume;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Fields of one CSV event record, in order.
const FIELD_COUNT: usize = 11;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

struct ImportState {
    log: EventLog,
    renumber: bool,
    no_overwrite: bool,
    /// Switched on by the first full log, sticky for the rest of the run.
    overwrite: bool,
    first_written: bool,
}

/// Runs the import command.
pub fn run(
    input: Option<&Path>,
    output: &Path,
    renumber: bool,
    append: bool,
    no_overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) if path != Path::new("-") => Box::new(BufReader::new(File::open(path)?)),
        _ => Box::new(BufReader::new(io::stdin())),
    };
    let mut csv = CsvReader::new(reader);

    // the listing leads with a single-field record carrying the log size
    let size = read_size_record(&mut csv)?;

    let log = if append {
        EventLog::open(Box::new(FileVolume::open(output)?))?
    } else {
        EventLog::create(Box::new(FileVolume::create(output)?), size)?
    };

    let mut state = ImportState {
        log,
        // appending to unknown numbering would produce garbage
        renumber: renumber || append,
        no_overwrite,
        overwrite: false,
        first_written: false,
    };

    let mut fields: Vec<String> = Vec::new();
    let mut line = csv.line();
    loop {
        match csv.read()? {
            CsvEvent::Field(field) => fields.push(field),
            CsvEvent::EndOfRecord => {
                process_record(&mut state, &fields, line)?;
                fields.clear();
                line = csv.line();
            }
            CsvEvent::EndOfFile => break,
        }
    }

    state.log.close()?;
    Ok(())
}

fn read_size_record<R: BufRead>(csv: &mut CsvReader<R>) -> Result<u32, Box<dyn std::error::Error>> {
    let size = match csv.read()? {
        CsvEvent::Field(field) => field
            .parse::<u32>()
            .map_err(|_| format!("failed to parse the filesize record: {field:?}"))?,
        _ => return Err("failed to read the filesize record".into()),
    };
    // skip whatever else the record carries
    while let CsvEvent::Field(_) = csv.read()? {}
    Ok(size)
}

fn parse_time(field: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(field, TIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

fn parse_event_type(field: &str) -> Option<u16> {
    match EventType::from_name(field) {
        Some(ty) => Some(ty.as_raw()),
        None => field.parse::<u32>().ok().map(|n| n as u16),
    }
}

/// Validates one CSV record and appends it to the log.
///
/// Bad records are skipped with a diagnostic naming the input line; only
/// log-level failures abort the run.
fn process_record(
    state: &mut ImportState,
    fields: &[String],
    line: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // empty lines scan as a single zero-length field
    if fields.len() == 1 && fields[0].is_empty() {
        return Ok(());
    }
    if fields[0].is_empty() {
        warn!("line {line}: record without a record number, skipping it");
        return Ok(());
    }
    if fields.len() < FIELD_COUNT {
        warn!("line {line}: incomplete record, skipping it");
        return Ok(());
    }
    if fields.len() > FIELD_COUNT {
        warn!("line {line}: extraneous fields in a record");
    }

    let current = state.log.header().current_record_number;
    let parsed_number = match fields[0].parse::<u32>() {
        Ok(0) => {
            if !state.renumber {
                warn!("line {line}: record numbers cannot be zero, skipping it");
                return Ok(());
            }
            warn!("line {line}: record numbers cannot be zero");
            None
        }
        Ok(number) => Some(number),
        Err(_) => {
            if !state.renumber {
                warn!("line {line}: invalid record number, skipping it");
                return Ok(());
            }
            warn!("line {line}: invalid record number");
            None
        }
    };
    let number = if state.renumber {
        current
    } else {
        // parsed_number is always present here
        let number = parsed_number.unwrap_or(current);
        if state.first_written {
            if number < current {
                warn!(
                    "line {line}: a record with a number not above the previous record, \
                     skipping it"
                );
                return Ok(());
            }
            if number > current {
                warn!("line {line}: discontiguous record numbers");
            }
        }
        number
    };

    let Some(time_generated) = parse_time(&fields[1]) else {
        warn!("line {line}: failed to parse generation time, skipping the record");
        return Ok(());
    };
    let Some(time_written) = parse_time(&fields[2]) else {
        warn!("line {line}: failed to parse written time, skipping the record");
        return Ok(());
    };
    let Ok(event_id) = fields[3].parse::<u32>() else {
        warn!("line {line}: failed to parse the event ID, skipping the record");
        return Ok(());
    };
    let Some(event_type) = parse_event_type(&fields[4]) else {
        warn!("line {line}: failed to parse the event type, skipping the record");
        return Ok(());
    };
    let Ok(event_category) = fields[5].parse::<u16>() else {
        warn!("line {line}: failed to parse the event category, skipping the record");
        return Ok(());
    };

    let contents = RecordContents {
        time_generated,
        time_written,
        source_name: Some(fields[6].clone()),
        computer_name: Some(fields[7].clone()),
        user_sid: (!fields[8].is_empty()).then(|| fields[8].clone()),
        strings: split_strings(&fields[9]),
        data: base64::decode(&fields[10]),
    };
    let header = RecordHeader {
        record_number: number,
        event_id,
        event_type,
        event_category,
        ..RecordHeader::default()
    };

    let raw = match encode_record(&contents, header) {
        Ok(raw) => raw,
        Err(errors) => {
            warn!("line {line}: data conversion failed ({errors}), skipping the record");
            return Ok(());
        }
    };

    match state.log.append_record(&raw, state.overwrite) {
        Ok(()) => {}
        Err(CoreError::LogFull) => {
            if state.no_overwrite {
                return Err("the log is full".into());
            }
            warn!("the log is full, removing old records");
            state.overwrite = true;
            state.log.append_record(&raw, true)?;
        }
        Err(e) => return Err(e.into()),
    }
    state.first_written = true;
    Ok(())
}
