//! The stateful log engine.

use crate::error::{CoreError, CoreResult};
use evtlog_codec::{
    fields, EofRecord, LogHeader, RawRecord, RecordHeader, EOF_RECORD_FIELDS, EOF_RECORD_LENGTH,
    HEADER_LENGTH, RECORD_HEADER_FIELDS, RECORD_HEADER_LENGTH, RECORD_MIN_LENGTH,
};
use evtlog_storage::Volume;
use tracing::{debug, warn};

const HEADER_LEN: u64 = HEADER_LENGTH as u64;
const RECORD_HEADER_LEN: u64 = RECORD_HEADER_LENGTH as u64;
const EOF_LEN: u64 = EOF_RECORD_LENGTH as u64;

/// The repeating pattern stamped over the unusable span before the physical
/// end of the file when a write wraps.
const WRAP_FILL: [u8; 4] = [0x27, 0x00, 0x00, 0x00];

/// What a single write will do to the ring.
///
/// A plan is pure arithmetic over hypothetical offsets; the same code path
/// therefore serves both the simulated space check and the real write.
struct WritePlan {
    /// Where the fixed part of the structure lands.
    start: u64,
    /// Pattern bytes to stamp at `fill_at` before wrapping, 0 when none.
    fill: u64,
    /// Position of the fill span.
    fill_at: u64,
    /// Tail bytes written before the physical end; equals the tail length
    /// when the tail does not split.
    tail_first: u64,
    /// Position just past the written structure.
    end_pos: u64,
    /// Bytes of ring space the write consumes, fill span included.
    consumed: u64,
    /// Whether the write touches the wrap point.
    wraps: bool,
}

/// An open circular log file.
///
/// The engine exclusively owns the header in memory and its own read
/// cursor. Header mutations are staged in memory and only persisted by
/// [`close`](Self::close); a crash in between leaves the dirty flag set in
/// the file as a signal to the next opener.
///
/// Not safe for concurrent use; the format assumes exclusive access to the
/// file, which [`FileVolume`](evtlog_storage::FileVolume) enforces with an
/// advisory lock.
pub struct EventLog {
    volume: Box<dyn Volume>,
    header: LogHeader,
    cursor: u64,
    changed: bool,
    oldest_length: Option<u32>,
}

impl EventLog {
    /// Opens an existing log, validating its header.
    ///
    /// The read cursor starts at the oldest record.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot hold a header, the header does not
    /// validate, or the volume errors.
    pub fn open(mut volume: Box<dyn Volume>) -> CoreResult<Self> {
        let size = volume.size()?;
        if size < HEADER_LEN {
            return Err(CoreError::corrupt("file too short for a log header"));
        }
        let mut bytes = [0u8; HEADER_LENGTH as usize];
        volume.read_at(0, &mut bytes)?;
        let header = LogHeader::from_bytes(&bytes);
        let errors = header.validate();
        if !errors.is_empty() {
            return Err(CoreError::InvalidHeader { errors });
        }
        if header.is_dirty() {
            warn!("log file is marked dirty; it was not closed properly");
        }
        let cursor = u64::from(header.start_offset);
        Ok(Self {
            volume,
            header,
            cursor,
            changed: false,
            oldest_length: None,
        })
    }

    /// Creates an empty log of `size` bytes, truncating or extending the
    /// volume and persisting a fresh dirty header immediately.
    ///
    /// # Errors
    ///
    /// Fails when `size` cannot hold the header or the volume errors.
    pub fn create(mut volume: Box<dyn Volume>, size: u32) -> CoreResult<Self> {
        if size < HEADER_LENGTH {
            return Err(CoreError::InvalidSize { requested: size });
        }
        volume.set_len(u64::from(size))?;
        let mut header = LogHeader::new(size);
        header.flags = LogHeader::FLAG_DIRTY;
        let mut log = Self {
            volume,
            header,
            cursor: HEADER_LEN,
            changed: true,
            oldest_length: None,
        };
        log.write_header()?;
        Ok(log)
    }

    /// The log header as the engine currently sees it.
    #[must_use]
    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Moves the read cursor back to the oldest record.
    pub fn rewind(&mut self) {
        self.cursor = u64::from(self.header.start_offset);
    }

    /// Reads the record at the cursor and advances past it.
    ///
    /// Returns `Ok(None)` at the end of the log: either the cursor reached
    /// the logical end offset or a valid EOF sentinel sits at it. End of
    /// log is a normal terminal condition, not an error.
    ///
    /// # Errors
    ///
    /// Fails on volume errors and on structural damage: an implausible
    /// record length, a sentinel with wrong magic words, or a tail crossing
    /// the physical end of a log that never wrapped.
    pub fn read_record(&mut self) -> CoreResult<Option<RawRecord>> {
        let file_len = self.volume.size()?;
        // too close to the physical end to hold a record header: wrap
        if file_len.saturating_sub(self.cursor) < RECORD_HEADER_LEN {
            self.cursor = HEADER_LEN;
        }
        if self.cursor == u64::from(self.header.end_offset) {
            return Ok(None);
        }

        let start = self.cursor;
        let mut length_bytes = [0u8; 4];
        self.volume.read_at(start, &mut length_bytes)?;
        let length = u32::from_le_bytes(length_bytes);

        if u64::from(length) == EOF_LEN {
            // looks like the EOF sentinel, verify the rest of it
            let mut rest = [0u8; EOF_RECORD_LENGTH as usize - 4];
            self.volume.read_at(start + 4, &mut rest)?;
            let mut eof = EofRecord {
                size_beginning: length,
                ..EofRecord::default()
            };
            fields::read_fields_range(
                &mut rest.as_slice(),
                &EOF_RECORD_FIELDS,
                &mut eof,
                1,
                EOF_RECORD_FIELDS.len() - 1,
            )?;
            return if eof.is_valid() {
                Ok(None)
            } else {
                Err(CoreError::corrupt("EOF record magic mismatch"))
            };
        }
        if length < RECORD_MIN_LENGTH {
            return Err(CoreError::corrupt(format!(
                "record length {length} below the minimum"
            )));
        }
        if u64::from(length) > file_len.saturating_sub(HEADER_LEN) {
            return Err(CoreError::corrupt(format!(
                "record length {length} exceeds the log"
            )));
        }

        let mut header_rest = [0u8; RECORD_HEADER_LENGTH as usize - 4];
        self.volume.read_at(start + 4, &mut header_rest)?;
        let mut header = RecordHeader {
            length,
            ..RecordHeader::default()
        };
        fields::read_fields_range(
            &mut header_rest.as_slice(),
            &RECORD_HEADER_FIELDS,
            &mut header,
            1,
            RECORD_HEADER_FIELDS.len() - 1,
        )?;

        let tail_len = u64::from(length) - RECORD_HEADER_LEN;
        let mut tail = vec![0u8; tail_len as usize];
        let tail_pos = start + RECORD_HEADER_LEN;
        if tail_pos + tail_len > file_len {
            if !self.header.is_wrapped() {
                return Err(CoreError::corrupt(
                    "record tail crosses the file end in an unwrapped log",
                ));
            }
            // the tail wraps around the physical end of the file
            let first = (file_len - tail_pos) as usize;
            self.volume.read_at(tail_pos, &mut tail[..first])?;
            self.volume.read_at(HEADER_LEN, &mut tail[first..])?;
            self.cursor = HEADER_LEN + (tail_len - first as u64);
        } else {
            self.volume.read_at(tail_pos, &mut tail)?;
            self.cursor = tail_pos + tail_len;
        }

        if start == u64::from(self.header.start_offset) {
            // cache the oldest record's length for eviction accounting
            self.oldest_length = Some(length);
        }
        Ok(Some(RawRecord { header, tail }))
    }

    /// Appends a record after the logical end of the log.
    ///
    /// The record carries its own number; the engine advances the header's
    /// current record number past it. When `overwrite` is false the record
    /// plus the trailing EOF sentinel must fit in the free region as it
    /// stands, otherwise the append fails with [`CoreError::LogFull`] and
    /// marks the failed attempt in the header flags. With `overwrite` the
    /// oldest records are evicted until the record fits.
    ///
    /// # Errors
    ///
    /// Fails on volume errors, an inconsistent record, a full log, or an
    /// exhausted record counter.
    pub fn append_record(&mut self, record: &RawRecord, overwrite: bool) -> CoreResult<()> {
        if record.header.record_number == 0
            || u64::from(record.header.length) != RECORD_HEADER_LEN + record.tail.len() as u64
        {
            return Err(CoreError::InvalidRecord);
        }
        let next_number = record
            .header
            .record_number
            .checked_add(1)
            .ok_or(CoreError::RecordNumberExhausted)?;

        if self.header.flags & LogHeader::FLAG_LOGFULL_WRITTEN != 0 {
            self.header.flags &= !LogHeader::FLAG_LOGFULL_WRITTEN;
            self.changed = true;
        }

        let tail_len = record.tail.len() as u64;
        let plan = self.plan_write(
            u64::from(self.header.end_offset),
            RECORD_HEADER_LEN,
            tail_len,
        );

        if !overwrite {
            // the record must leave room for the trailing EOF sentinel
            let eof_plan = self.plan_write(plan.end_pos, EOF_LEN, 0);
            if self.free_space() < plan.consumed + eof_plan.consumed {
                self.header.flags |= LogHeader::FLAG_LOGFULL_WRITTEN;
                self.changed = true;
                return Err(CoreError::LogFull);
            }
        }

        self.prepare_for_write(&plan)?;

        self.volume.write_at(plan.start, &record.header.to_bytes())?;
        let split = plan.tail_first as usize;
        self.volume
            .write_at(plan.start + RECORD_HEADER_LEN, &record.tail[..split])?;
        if split < record.tail.len() {
            self.volume.write_at(HEADER_LEN, &record.tail[split..])?;
        }

        if self.header.oldest_record_number == 0 {
            self.header.oldest_record_number = record.header.record_number;
            self.header.start_offset = plan.start as u32;
            self.oldest_length = Some(record.header.length);
        }
        self.header.current_record_number = next_number;
        self.header.end_offset = plan.end_pos as u32;
        self.changed = true;
        debug!(
            number = record.header.record_number,
            length = record.header.length,
            "appended record"
        );
        Ok(())
    }

    /// Closes the log.
    ///
    /// When anything changed since open, writes the EOF sentinel after the
    /// newest record, clears the dirty flag and persists the header. The
    /// underlying volume is handed back to the caller, who owns closing it.
    ///
    /// # Errors
    ///
    /// Fails when the sentinel or header cannot be written; the engine is
    /// consumed either way.
    pub fn close(mut self) -> CoreResult<Box<dyn Volume>> {
        if self.changed {
            let plan = self.plan_write(u64::from(self.header.end_offset), EOF_LEN, 0);
            self.prepare_for_write(&plan)?;
            self.header.end_offset = plan.start as u32;
            if self.header.oldest_record_number == 0 {
                // an empty log points its start offset at the sentinel
                self.header.start_offset = self.header.end_offset;
            }
            let eof = EofRecord::for_header(&self.header);
            self.volume.write_at(plan.start, &eof.to_bytes())?;
            self.header.flags &= !LogHeader::FLAG_DIRTY;
            self.write_header()?;
            self.volume.sync()?;
        }
        Ok(self.volume)
    }

    fn write_header(&mut self) -> CoreResult<()> {
        self.volume.write_at(0, &self.header.to_bytes())?;
        Ok(())
    }

    /// Free bytes between the logical end and the oldest record, following
    /// the ring around the physical end of the file.
    fn free_space(&self) -> u64 {
        let max = u64::from(self.header.max_size);
        let start = u64::from(self.header.start_offset);
        let end = u64::from(self.header.end_offset);
        if self.header.oldest_record_number == 0 {
            max - HEADER_LEN
        } else if end < start {
            start - end
        } else if end > start {
            (max - end) + (start - HEADER_LEN)
        } else {
            0
        }
    }

    /// Plans a write of a fixed structure plus an optional splittable tail
    /// at `pos`, without touching anything.
    ///
    /// The fixed part never splits: when fewer than `RECORD_HEADER_LEN`
    /// bytes remain before the physical end - the same threshold at which
    /// the reader repositions - the span is treated as consumed fill and
    /// the structure moves past the file header. The tail may split across
    /// the wrap point.
    fn plan_write(&self, pos: u64, fixed_len: u64, tail_len: u64) -> WritePlan {
        let max = u64::from(self.header.max_size);
        let fill_at = pos;
        let mut pos = pos;
        let mut fill = 0;
        let mut consumed = 0;
        let mut wraps = false;

        let end_space = max.saturating_sub(pos);
        if end_space < RECORD_HEADER_LEN {
            fill = end_space;
            consumed += end_space;
            wraps = true;
            pos = HEADER_LEN;
        }
        let start = pos;
        consumed += fixed_len;
        pos += fixed_len;

        let mut tail_first = tail_len;
        if tail_len > 0 {
            let end_space = max.saturating_sub(pos);
            if end_space < tail_len {
                tail_first = end_space;
                wraps = true;
                pos = HEADER_LEN + (tail_len - end_space);
            } else {
                pos += tail_len;
            }
            consumed += tail_len;
        }

        WritePlan {
            start,
            fill,
            fill_at,
            tail_first,
            end_pos: pos,
            consumed,
            wraps,
        }
    }

    /// Makes room for a planned write: evicts oldest records until the
    /// consumed span fits, collapses the ring onto the write point when the
    /// log empties, and stamps the fill pattern when the write wraps.
    fn prepare_for_write(&mut self, plan: &WritePlan) -> CoreResult<()> {
        while self.free_space() < plan.consumed {
            self.evict_oldest(plan.start)?;
        }
        if self.header.oldest_record_number == 0 {
            self.header.start_offset = plan.start as u32;
            self.header.end_offset = plan.start as u32;
            self.header.flags &= !LogHeader::FLAG_WRAP;
            self.changed = true;
        }
        if plan.wraps {
            self.header.flags |= LogHeader::FLAG_WRAP;
            self.changed = true;
        }
        if plan.fill > 0 {
            let mut pattern = Vec::with_capacity(plan.fill as usize);
            for i in 0..plan.fill {
                pattern.push(WRAP_FILL[(i % 4) as usize]);
            }
            self.volume.write_at(plan.fill_at, &pattern)?;
            debug!(at = plan.fill_at, len = plan.fill, "stamped wrap fill");
        }
        Ok(())
    }

    /// Frees the oldest record by advancing the start offset past it.
    ///
    /// Evicting the newest remaining record empties the log; the start
    /// offset then collapses to `write_at`. Otherwise the next record's
    /// header is read back to refresh the cached oldest length and number.
    fn evict_oldest(&mut self, write_at: u64) -> CoreResult<()> {
        if self.header.oldest_record_number == 0 {
            // nothing left to reclaim: the write cannot fit at all
            return Err(CoreError::LogFull);
        }
        let oldest_len = match self.oldest_length {
            Some(length) => u64::from(length),
            None => {
                let header = self.record_header_at(u64::from(self.header.start_offset))?;
                self.oldest_length = Some(header.length);
                u64::from(header.length)
            }
        };

        let emptied = self
            .header
            .oldest_record_number
            .checked_add(1)
            .is_none_or(|next| next >= self.header.current_record_number);
        if emptied {
            debug!("log emptied by eviction");
            self.header.oldest_record_number = 0;
            self.oldest_length = None;
            self.header.start_offset = write_at as u32;
            self.changed = true;
            return Ok(());
        }

        let max = u64::from(self.header.max_size);
        let start = u64::from(self.header.start_offset);
        let next = start + oldest_len;
        let new_start = if next > max {
            // the freed record wrapped around the physical end
            HEADER_LEN + (next - max)
        } else if max - next < RECORD_HEADER_LEN {
            // the stub behind it cannot hold another record: reclaim it too
            HEADER_LEN
        } else {
            next
        };

        let header = self.record_header_at(new_start)?;
        debug!(
            evicted = self.header.oldest_record_number,
            next_oldest = header.record_number,
            "evicted oldest record"
        );
        self.header.start_offset = new_start as u32;
        self.oldest_length = Some(header.length);
        self.header.oldest_record_number = header.record_number;
        self.changed = true;
        Ok(())
    }

    /// Reads a record header straight from the volume, with a plausibility
    /// check on its length so a damaged ring cannot wedge the eviction loop.
    fn record_header_at(&mut self, offset: u64) -> CoreResult<RecordHeader> {
        let mut bytes = [0u8; RECORD_HEADER_LENGTH as usize];
        self.volume.read_at(offset, &mut bytes)?;
        let header = RecordHeader::from_bytes(&bytes);
        if header.length < RECORD_MIN_LENGTH
            || u64::from(header.length) > u64::from(self.header.max_size).saturating_sub(HEADER_LEN)
        {
            return Err(CoreError::corrupt(format!(
                "record at offset {offset} has implausible length {}",
                header.length
            )));
        }
        Ok(header)
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("header", &self.header)
            .field("cursor", &self.cursor)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}
