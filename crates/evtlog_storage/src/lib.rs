//! # evtlog storage
//!
//! Byte-store abstraction for the evtlog circular log engine.
//!
//! This crate provides the lowest-level storage abstraction used by the log
//! engine. Volumes are **opaque byte stores** addressed by absolute offset -
//! they do not interpret the data they hold. The engine owns the log format
//! and its own notion of a cursor; a volume only has to honor exact
//! positioned reads and writes.
//!
//! ## Available volumes
//!
//! - [`FileVolume`] - persistent storage over OS file APIs, with an advisory
//!   exclusive lock so only one process works on a log at a time
//! - [`MemoryVolume`] - for testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use evtlog_storage::{MemoryVolume, Volume};
//!
//! let mut volume = MemoryVolume::new();
//! volume.set_len(16).unwrap();
//! volume.write_at(4, b"ring").unwrap();
//! let mut buf = [0u8; 4];
//! volume.read_at(4, &mut buf).unwrap();
//! assert_eq!(&buf, b"ring");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod volume;

pub use error::{StorageError, StorageResult};
pub use file::FileVolume;
pub use memory::MemoryVolume;
pub use volume::Volume;
