//! # evtlog core
//!
//! The circular log engine for the legacy Windows Event Log (.evt) file
//! layout.
//!
//! An [`EventLog`] owns a [`Volume`](evtlog_storage::Volume) and maintains
//! the log header, a sequential read cursor and the space accounting the
//! ring needs: appends go after the logical end, old records are evicted
//! from the logical start when space runs out, and the active region may
//! wrap around the physical end of the file. The EOF sentinel record marks
//! the logical end of written data and the header's dirty flag records an
//! abnormal close.
//!
//! The [`scan`] routine locates a header or record boundary by signature
//! and plausible length when the file's internal offsets cannot be trusted.
//!
//! ## Example
//!
//! ```
//! use evtlog_codec::{encode_record, RecordContents, RecordHeader};
//! use evtlog_core::EventLog;
//! use evtlog_storage::MemoryVolume;
//!
//! let mut log = EventLog::create(Box::new(MemoryVolume::new()), 0x8000).unwrap();
//!
//! let contents = RecordContents {
//!     source_name: Some("Service".into()),
//!     computer_name: Some("HOST".into()),
//!     ..RecordContents::default()
//! };
//! let mut header = RecordHeader::default();
//! header.record_number = log.header().current_record_number;
//! let raw = encode_record(&contents, header).unwrap();
//!
//! log.append_record(&raw, false).unwrap();
//! log.rewind();
//! assert!(log.read_record().unwrap().is_some());
//! assert!(log.read_record().unwrap().is_none());
//! log.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod scan;

pub use engine::EventLog;
pub use error::{CoreError, CoreResult};
pub use scan::{scan, ScanHit, ScanKind};
