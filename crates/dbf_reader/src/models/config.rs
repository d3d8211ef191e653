use std::env;

use crate::models::text::MAX_TEXT_FIELD_LEN;

/// Attempt to read approximately this many bytes from the .dbf file at once.
pub const DEFAULT_BATCH_TARGET_BYTES: usize = 16 * 1024 * 1024;

/// Upper bound on the buffered file reader's capacity; batches are read straight past it.
pub const MAX_FILE_BUFFER_BYTES: usize = 64 * 1024;

/// Environment variable overriding [`DEFAULT_BATCH_TARGET_BYTES`].
pub const BATCH_TARGET_ENV_VAR: &str = "DBF_BATCH_TARGET_BYTES";

/// Configuration for reading DBF files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfReaderConfig {
    /// Approximate size of one batch read; a batch always holds at least one record
    pub batch_target_bytes: usize,
    /// Maximum number of bytes of a text field considered before trimming
    pub max_text_len: usize,
}

impl Default for DbfReaderConfig {
    fn default() -> Self {
        Self {
            batch_target_bytes: DEFAULT_BATCH_TARGET_BYTES,
            max_text_len: MAX_TEXT_FIELD_LEN,
        }
    }
}

impl DbfReaderConfig {
    /// Default configuration with the batch target taken from `DBF_BATCH_TARGET_BYTES`.
    pub fn from_env() -> Self {
        Self::default().with_batch_target_value(env::var(BATCH_TARGET_ENV_VAR).ok().as_deref())
    }

    /// Apply a textual batch target; unparsable or zero values keep the current target.
    pub fn with_batch_target_value(self, value: Option<&str>) -> Self {
        match value.map(|v| v.trim().parse::<usize>()) {
            Some(Ok(bytes)) if bytes > 0 => self.with_batch_target_bytes(bytes),
            Some(_) => {
                log::warn!("Ignoring invalid {BATCH_TARGET_ENV_VAR} value {value:?}");
                self
            }
            None => self,
        }
    }

    pub fn with_batch_target_bytes(mut self, bytes: usize) -> Self {
        self.batch_target_bytes = bytes;
        self
    }

    /// Size batches to hold exactly `records` records of `record_length` bytes.
    pub fn with_batch_records(self, records: usize, record_length: u16) -> Self {
        self.with_batch_target_bytes(records.max(1) * usize::from(record_length))
    }

    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    /// Records per batch for a given record length; never zero.
    pub fn batch_size(&self, record_length: u16) -> usize {
        (self.batch_target_bytes / usize::from(record_length).max(1)).max(1)
    }

    /// Capacity of the buffered reader wrapped around an opened file.
    pub fn file_buffer_capacity(&self) -> usize {
        self.batch_target_bytes.min(MAX_FILE_BUFFER_BYTES)
    }
}
