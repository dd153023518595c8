//! Inspect command: show the header of a log file.

use evtlog_codec::{LogHeader, HEADER_LENGTH};
use evtlog_core::{scan, ScanKind};
use evtlog_storage::{FileVolume, Volume};
use serde::Serialize;
use std::path::Path;

/// How far the recovery scan looks when the header does not validate.
const SCAN_BUDGET: u64 = 1 << 20;

/// Inspection result for one log file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    /// Path of the examined file.
    pub path: String,
    /// Actual file size in bytes.
    pub file_size: u64,
    /// The size the header declares.
    pub max_size: u32,
    /// Format version as `major.minor`.
    pub version: String,
    /// Offset of the oldest record.
    pub start_offset: u32,
    /// Offset of the EOF sentinel record.
    pub end_offset: u32,
    /// The number the next record will carry.
    pub current_record_number: u32,
    /// The number of the oldest record, 0 when empty.
    pub oldest_record_number: u32,
    /// Records currently in the log.
    pub record_count: u32,
    /// Names of the set status flags.
    pub flags: Vec<&'static str>,
    /// Retention value recorded at creation.
    pub retention: u32,
    /// Validation failures, empty for a healthy header.
    pub header_errors: Vec<String>,
    /// Where a recovery scan found the first recognizable structure, when
    /// the header did not validate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<RecoveredStructure>,
}

/// A structure located by the recovery scan.
#[derive(Debug, Serialize)]
pub struct RecoveredStructure {
    /// `header` or `record`.
    pub kind: &'static str,
    /// Absolute offset of the structure.
    pub offset: u64,
}

fn flag_names(flags: u32) -> Vec<&'static str> {
    let mut names = Vec::new();
    if flags & LogHeader::FLAG_DIRTY != 0 {
        names.push("dirty");
    }
    if flags & LogHeader::FLAG_WRAP != 0 {
        names.push("wrapped");
    }
    if flags & LogHeader::FLAG_LOGFULL_WRITTEN != 0 {
        names.push("logfull-written");
    }
    if flags & LogHeader::FLAG_ARCHIVE_SET != 0 {
        names.push("archive-set");
    }
    names
}

/// Runs the inspect command.
pub fn run(input: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut volume = FileVolume::open(input)?;
    let file_size = volume.size()?;
    if file_size < u64::from(HEADER_LENGTH) {
        return Err(format!("{}: file too short for a log header", input.display()).into());
    }

    let mut bytes = [0u8; HEADER_LENGTH as usize];
    volume.read_at(0, &mut bytes)?;
    let header = LogHeader::from_bytes(&bytes);
    let errors = header.validate();

    let record_count = if header.oldest_record_number == 0 {
        0
    } else {
        header
            .current_record_number
            .saturating_sub(header.oldest_record_number)
    };

    let mut report = InspectReport {
        path: input.display().to_string(),
        file_size,
        max_size: header.max_size,
        version: format!("{}.{}", header.major_version, header.minor_version),
        start_offset: header.start_offset,
        end_offset: header.end_offset,
        current_record_number: header.current_record_number,
        oldest_record_number: header.oldest_record_number,
        record_count,
        flags: flag_names(header.flags),
        retention: header.retention,
        header_errors: if errors.is_empty() {
            Vec::new()
        } else {
            vec![errors.to_string()]
        },
        recovered: None,
    };

    if !errors.is_empty() {
        // the offsets cannot be trusted: look for the first recognizable
        // structure instead
        let budget = file_size.min(SCAN_BUDGET);
        if let Some(hit) = scan(&mut volume, 0, budget)? {
            report.recovered = Some(RecoveredStructure {
                kind: match hit.kind {
                    ScanKind::Header => "header",
                    ScanKind::Record => "record",
                },
                offset: hit.offset,
            });
        }
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }
    Ok(())
}

fn print_text(report: &InspectReport) {
    println!("Event log: {}", report.path);
    println!();
    println!("File size:        {} bytes", report.file_size);
    println!("Declared size:    {} bytes", report.max_size);
    println!("Format version:   {}", report.version);
    println!("Start offset:     {:#x}", report.start_offset);
    println!("End offset:       {:#x}", report.end_offset);
    println!("Current record:   {}", report.current_record_number);
    println!("Oldest record:    {}", report.oldest_record_number);
    println!("Record count:     {}", report.record_count);
    println!("Retention:        {}", report.retention);
    if report.flags.is_empty() {
        println!("Flags:            none");
    } else {
        println!("Flags:            {}", report.flags.join(", "));
    }
    for error in &report.header_errors {
        println!("Header errors:    {error}");
    }
    if let Some(recovered) = &report.recovered {
        println!(
            "First {} found by scanning at offset {:#x}",
            recovered.kind, recovered.offset
        );
    }
}
