//! Ring behavior of the log engine: wraparound, eviction, capacity.

use evtlog_codec::{
    decode_record, encode_record, EventType, LogHeader, RawRecord, RecordContents, RecordHeader,
    HEADER_LENGTH,
};
use evtlog_core::{CoreError, EventLog};
use evtlog_storage::{FileVolume, MemoryVolume, Volume};

/// Encodes a record with the given number and payload size.
///
/// With the fixed names used here the total record length comes out as
/// `76 + data_len` rounded up to the dword boundary; a 52-byte payload
/// makes exactly 128 bytes.
fn record(number: u32, data_len: usize) -> RawRecord {
    let contents = RecordContents {
        source_name: Some("App".into()),
        computer_name: Some("Box".into()),
        data: vec![number as u8; data_len],
        ..RecordContents::default()
    };
    let header = RecordHeader {
        record_number: number,
        event_id: 1000 + number,
        event_type: EventType::Information.as_raw(),
        ..RecordHeader::default()
    };
    encode_record(&contents, header).unwrap()
}

fn read_numbers(log: &mut EventLog) -> Vec<u32> {
    let mut numbers = Vec::new();
    log.rewind();
    while let Some(raw) = log.read_record().unwrap() {
        numbers.push(raw.header.record_number);
    }
    numbers
}

#[test]
fn fifty_records_round_trip_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fifty.evt");

    let mut log = EventLog::create(Box::new(FileVolume::create(&path).unwrap()), 0x20000).unwrap();
    let mut written = Vec::new();
    for number in 1..=50u32 {
        let raw = record(number, (number as usize * 7) % 96);
        log.append_record(&raw, false).unwrap();
        written.push(raw);
    }

    log.rewind();
    for expected in &written {
        let raw = log.read_record().unwrap().expect("record missing");
        assert_eq!(&raw, expected);
        let (_, errors) = decode_record(&raw);
        assert!(errors.is_empty());
    }
    assert!(log.read_record().unwrap().is_none());
    log.close().unwrap();

    let log = EventLog::open(Box::new(FileVolume::open(&path).unwrap())).unwrap();
    assert_eq!(log.header().current_record_number, 51);
    assert_eq!(log.header().oldest_record_number, 1);
    assert!(!log.header().is_dirty());
}

#[test]
fn overwrite_evicts_the_oldest_records() {
    // sized so that records 3..5 and the EOF sentinel survive five appends
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 488).unwrap();
    for number in 1..=5u32 {
        let raw = record(number, 52);
        assert_eq!(raw.header.length, 128);
        log.append_record(&raw, true).unwrap();
    }

    assert_eq!(read_numbers(&mut log), [3, 4, 5]);
    assert_eq!(log.header().oldest_record_number, 3);
    assert!(log.header().is_wrapped());

    let volume = log.close().unwrap();
    let mut log = EventLog::open(volume).unwrap();
    assert_eq!(log.header().current_record_number, 6);
    assert_eq!(log.header().oldest_record_number, 3);
    assert_eq!(read_numbers(&mut log), [3, 4, 5]);
}

#[test]
fn wrapped_tail_reads_back_identically() {
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 408).unwrap();
    log.append_record(&record(1, 52), true).unwrap();
    log.append_record(&record(2, 96), true).unwrap();

    // the third record's header fits before the physical end and its tail
    // splits across it
    let third = record(3, 96);
    assert_eq!(third.header.length, 172);
    log.append_record(&third, true).unwrap();
    assert!(log.header().is_wrapped());

    log.rewind();
    let second = log.read_record().unwrap().unwrap();
    assert_eq!(second.header.record_number, 2);
    let read_back = log.read_record().unwrap().unwrap();
    assert_eq!(read_back.tail, third.tail);
    assert_eq!(read_back, third);
    let (contents, errors) = decode_record(&read_back);
    assert!(errors.is_empty());
    assert_eq!(contents.data, vec![3u8; 96]);
    assert!(log.read_record().unwrap().is_none());

    // closing needs room for the sentinel and evicts record 2 for it
    let volume = log.close().unwrap();
    let mut log = EventLog::open(volume).unwrap();
    assert_eq!(log.header().oldest_record_number, 3);
    assert_eq!(read_numbers(&mut log), [3]);
}

#[test]
fn eviction_reclaims_a_stub_behind_the_wrap_fill() {
    // 472 = header + three 128-byte records + the 40-byte sentinel; the
    // fourth append stamps the sentinel's span with fill, so closing has to
    // evict down to record 4 and snap the start offset past the header
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 472).unwrap();
    for number in 1..=5u32 {
        log.append_record(&record(number, 52), true).unwrap();
    }
    assert_eq!(log.header().oldest_record_number, 3);

    let volume = log.close().unwrap();
    let mut log = EventLog::open(volume).unwrap();
    assert_eq!(log.header().oldest_record_number, 4);
    assert_eq!(log.header().start_offset, HEADER_LENGTH);
    assert_eq!(read_numbers(&mut log), [4, 5]);
}

#[test]
fn log_full_without_overwrite_mutates_nothing() {
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 512).unwrap();
    for number in 1..=3u32 {
        log.append_record(&record(number, 52), false).unwrap();
    }
    let before = log.header().clone();

    let result = log.append_record(&record(4, 52), false);
    assert!(matches!(result, Err(CoreError::LogFull)));
    assert_eq!(log.header().start_offset, before.start_offset);
    assert_eq!(log.header().end_offset, before.end_offset);
    assert_eq!(log.header().oldest_record_number, before.oldest_record_number);
    assert_ne!(log.header().flags & LogHeader::FLAG_LOGFULL_WRITTEN, 0);
    assert_eq!(read_numbers(&mut log), [1, 2, 3]);

    // the caller may escalate to overwriting; the failure marker clears
    log.append_record(&record(4, 52), true).unwrap();
    assert_eq!(log.header().flags & LogHeader::FLAG_LOGFULL_WRITTEN, 0);
    assert_eq!(log.header().oldest_record_number, 2);
}

#[test]
fn capacity_invariant_under_overwrite() {
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 600).unwrap();
    for number in 1..=30u32 {
        let raw = record(number, (number as usize * 12) % 72 + 4);
        log.append_record(&raw, true).unwrap();
    }

    let volume = log.close().unwrap();
    let mut log = EventLog::open(volume).unwrap();
    let numbers = read_numbers(&mut log);
    assert_eq!(*numbers.last().unwrap(), 30);
    assert_eq!(numbers.first().copied(), Some(log.header().oldest_record_number));
    // numbers stay contiguous up to the newest record
    for pair in numbers.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
}

#[test]
fn eviction_can_empty_the_log_entirely() {
    // room for one record but not for record plus sentinel
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 200).unwrap();
    assert!(matches!(
        log.append_record(&record(1, 52), false),
        Err(CoreError::LogFull)
    ));
    log.append_record(&record(1, 52), true).unwrap();

    // the sentinel cannot fit next to the record, so closing evicts it
    let volume = log.close().unwrap();
    let mut log = EventLog::open(volume).unwrap();
    assert_eq!(log.header().oldest_record_number, 0);
    assert_eq!(log.header().current_record_number, 2);
    assert_eq!(read_numbers(&mut log), Vec::<u32>::new());
}

#[test]
fn a_record_larger_than_the_file_is_log_full() {
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 256).unwrap();
    let result = log.append_record(&record(1, 400), true);
    assert!(matches!(result, Err(CoreError::LogFull)));
}

#[test]
fn empty_log_close_and_reopen() {
    let log = EventLog::create(Box::new(MemoryVolume::new()), 0x1000).unwrap();
    let volume = log.close().unwrap();

    let mut log = EventLog::open(volume).unwrap();
    let header = log.header().clone();
    assert_eq!(header.current_record_number, 1);
    assert_eq!(header.oldest_record_number, 0);
    assert_eq!(header.start_offset, HEADER_LENGTH);
    assert_eq!(header.end_offset, HEADER_LENGTH);
    assert!(!header.is_dirty());
    // the sentinel sits right past the header
    assert!(log.read_record().unwrap().is_none());
}

#[test]
fn close_without_changes_leaves_the_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idle.evt");

    let mut log = EventLog::create(Box::new(FileVolume::create(&path).unwrap()), 0x1000).unwrap();
    log.append_record(&record(1, 52), false).unwrap();
    log.close().unwrap();
    let image = std::fs::read(&path).unwrap();

    let mut log = EventLog::open(Box::new(FileVolume::open(&path).unwrap())).unwrap();
    assert_eq!(read_numbers(&mut log), [1]);
    log.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), image);
}

#[test]
fn abandoned_log_stays_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crashed.evt");

    let mut log = EventLog::create(Box::new(FileVolume::create(&path).unwrap()), 0x1000).unwrap();
    log.append_record(&record(1, 52), false).unwrap();
    drop(log); // no close: simulates a crash

    let log = EventLog::open(Box::new(FileVolume::open(&path).unwrap())).unwrap();
    assert!(log.header().is_dirty());
    // the header was never rewritten after creation
    assert_eq!(log.header().current_record_number, 1);
}

#[test]
fn invalid_records_are_rejected() {
    let mut log = EventLog::create(Box::new(MemoryVolume::new()), 0x1000).unwrap();

    let mut zero_number = record(1, 52);
    zero_number.header.record_number = 0;
    assert!(matches!(
        log.append_record(&zero_number, false),
        Err(CoreError::InvalidRecord)
    ));

    let mut last_number = record(1, 52);
    last_number.header.record_number = u32::MAX;
    assert!(matches!(
        log.append_record(&last_number, false),
        Err(CoreError::RecordNumberExhausted)
    ));

    let mut bad_length = record(1, 52);
    bad_length.header.length += 8;
    assert!(matches!(
        log.append_record(&bad_length, false),
        Err(CoreError::InvalidRecord)
    ));
}

#[test]
fn opening_garbage_fails_with_header_errors() {
    let mut volume = MemoryVolume::new();
    volume.set_len(0x1000).unwrap();
    volume.write_at(0, &[0xFFu8; 64]).unwrap();
    let result = EventLog::open(Box::new(volume));
    assert!(matches!(result, Err(CoreError::InvalidHeader { .. })));

    let short = MemoryVolume::from_bytes(vec![0u8; 16]);
    assert!(matches!(
        EventLog::open(Box::new(short)),
        Err(CoreError::Corrupt { .. })
    ));
}

#[test]
fn create_rejects_impossible_sizes() {
    let result = EventLog::create(Box::new(MemoryVolume::new()), 16);
    assert!(matches!(result, Err(CoreError::InvalidSize { .. })));
}
