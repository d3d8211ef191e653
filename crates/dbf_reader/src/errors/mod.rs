use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`DbfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be opened, read or positioned.
    Io,
    /// The header or field descriptor table is inconsistent; the file cannot be read at all.
    Format,
    /// The descriptor table or batch buffer could not be allocated.
    Allocation,
    /// The caller used the reader incorrectly (closed reader, bad field index).
    Precondition,
}

/// Centralized error type for the DBF reader
#[derive(Error, Debug)]
pub enum DbfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to open DBF file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read an entire record: expected {expected} records in batch, found {found}")]
    Truncated { expected: u32, found: u32 },

    #[error("Header length {header_length} is too short for the header, container and terminator ({minimum} bytes)")]
    HeaderTooShort { header_length: u16, minimum: usize },

    #[error("The field array size {size} is not an even multiple of the database field size")]
    FieldArraySize { size: usize },

    #[error("Invalid terminator byte {found:#04x}")]
    BadTerminator { found: u8 },

    #[error("At an unexpected offset in the DBF file: expected {expected}, found {actual}")]
    OffsetMismatch { expected: u64, actual: u64 },

    #[error("Invalid record length {0}")]
    InvalidRecordLength(u16),

    #[error("Field {name} ends at byte {end}, past the record length {record_length}")]
    FieldOutsideRecord {
        name: String,
        end: usize,
        record_length: u16,
    },

    #[error("Unable to allocate {bytes} bytes")]
    Allocation { bytes: usize },

    #[error("DBF file is not loaded")]
    NotOpen,

    #[error("No current record; call next() first")]
    NoCurrentRecord,

    #[error("Field number {index} out of bound ({count} fields)")]
    FieldIndexOutOfRange { index: usize, count: usize },
}

impl DbfError {
    pub fn open_error<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Open { .. } | Self::Truncated { .. } => ErrorKind::Io,
            Self::HeaderTooShort { .. }
            | Self::FieldArraySize { .. }
            | Self::BadTerminator { .. }
            | Self::OffsetMismatch { .. }
            | Self::InvalidRecordLength(_)
            | Self::FieldOutsideRecord { .. } => ErrorKind::Format,
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::NotOpen | Self::NoCurrentRecord | Self::FieldIndexOutOfRange { .. } => {
                ErrorKind::Precondition
            }
        }
    }

    /// True for a malformed header or descriptor table.
    pub fn is_format_error(&self) -> bool {
        self.kind() == ErrorKind::Format
    }
}

/// Alias for fallible operations in the DBF reader
pub type DbfResult<T> = Result<T, DbfError>;
