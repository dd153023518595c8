//! Error types for the log engine.

use evtlog_codec::HeaderErrors;
use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while working on a log file.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage volume error.
    #[error("storage error: {0}")]
    Storage(#[from] evtlog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file's structure is damaged.
    ///
    /// Fatal to the current read; the engine stays usable at the caller's
    /// discretion.
    #[error("log corrupted: {message}")]
    Corrupt {
        /// Description of the damage.
        message: String,
    },

    /// The log header did not validate.
    #[error("invalid log header: {errors}")]
    InvalidHeader {
        /// Which checks failed.
        errors: HeaderErrors,
    },

    /// No space for the record and overwriting old records is not allowed.
    ///
    /// A normal, expected condition: the caller may retry with overwriting
    /// enabled or recreate the log with a larger size.
    #[error("the log is full")]
    LogFull,

    /// The record to append is not internally consistent.
    #[error("record header disagrees with its tail")]
    InvalidRecord,

    /// The 32-bit record counter reached its maximum.
    #[error("record numbers exhausted")]
    RecordNumberExhausted,

    /// The requested log size cannot hold the fixed header.
    #[error("requested log size {requested:#x} cannot hold the header")]
    InvalidSize {
        /// The size passed to create.
        requested: u32,
    },
}

impl CoreError {
    /// Creates a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}
