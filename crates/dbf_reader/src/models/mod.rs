pub mod codec;
pub mod config;
pub mod fields;
pub mod header;
pub mod stream;
pub mod text;

#[cfg(test)]
mod fixtures;

pub use config::{DbfReaderConfig, DEFAULT_BATCH_TARGET_BYTES};
pub use fields::{FieldDescriptor, FieldTable, FieldType, parse_fields};
pub use header::{Dialect, FileHeader};
pub use stream::{DbfFileReader, DbfReader, Row};
pub use text::MAX_TEXT_FIELD_LEN;
