//! Field descriptor table parsing
//!
//! The descriptor table sits between the 32-byte header and the first record:
//!
//! ```text
//! header (32) | descriptors (32 * n) | 0x0D | [stray 0x0D] | [container (263)] | records...
//! ```
//!
//! The number of descriptors is not stored anywhere; it is derived from the
//! declared header length, which is then cross-checked against the position
//! the parser actually ends up at.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{DbfError, DbfResult};
use crate::models::codec::{FieldOrder, read_i16, read_i32};
use crate::models::header::{FileHeader, HEADER_SIZE};
use crate::models::text::field_name;

/// Size of one field descriptor in bytes.
pub const FIELD_DESCRIPTOR_SIZE: usize = 32;

/// Maximum length of a field name, defined by the xBase format.
pub const FIELD_NAME_SIZE: usize = 11;

/// Byte that ends the descriptor table.
pub const HEADER_TERMINATOR: u8 = 13;

/// Column type code of a field descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Date,
    Logical,
    Memo,
    Integer,
    Currency,
    Double,
    DateTime,
    General,
    Unknown(u8),
}

impl FieldType {
    pub fn from_code(code: u8) -> Self {
        match code {
            b'C' => FieldType::Character,
            b'N' => FieldType::Numeric,
            b'F' => FieldType::Float,
            b'D' => FieldType::Date,
            b'L' => FieldType::Logical,
            b'M' => FieldType::Memo,
            b'I' => FieldType::Integer,
            b'Y' => FieldType::Currency,
            b'B' => FieldType::Double,
            b'T' => FieldType::DateTime,
            b'G' => FieldType::General,
            other => FieldType::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Date => b'D',
            FieldType::Logical => b'L',
            FieldType::Memo => b'M',
            FieldType::Integer => b'I',
            FieldType::Currency => b'Y',
            FieldType::Double => b'B',
            FieldType::DateTime => b'T',
            FieldType::General => b'G',
            FieldType::Unknown(code) => code,
        }
    }

    /// True for types whose content lives in a separate memo file.
    pub fn is_memo(self) -> bool {
        matches!(self, FieldType::Memo | FieldType::General)
    }
}

/// One column of a DBF table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, trimmed at the first NUL
    pub name: String,
    pub raw_name: [u8; FIELD_NAME_SIZE],
    pub field_type: FieldType,
    pub memory_address: i32,
    pub length: u8,
    pub decimals: u8,
    pub flags: i16,
    pub work_area_id: u8,
    pub set_fields: u8,
    pub index_field: u8,
    /// Offset of the field inside a record; byte 0 is the deletion flag
    pub byte_offset: usize,
}

impl FieldDescriptor {
    pub fn decode(bytes: &[u8; FIELD_DESCRIPTOR_SIZE], byte_offset: usize) -> Self {
        let mut raw_name = [0u8; FIELD_NAME_SIZE];
        raw_name.copy_from_slice(&bytes[..FIELD_NAME_SIZE]);

        Self {
            name: field_name(&raw_name),
            raw_name,
            field_type: FieldType::from_code(bytes[11]),
            memory_address: read_i32::<FieldOrder>(&bytes[12..16]),
            length: bytes[16],
            decimals: bytes[17],
            flags: read_i16::<FieldOrder>(&bytes[18..20]),
            work_area_id: bytes[20],
            set_fields: bytes[23],
            index_field: bytes[31],
            byte_offset,
        }
    }

    /// One past the last byte of this field inside a record.
    pub fn end_offset(&self) -> usize {
        self.byte_offset + usize::from(self.length)
    }

    /// ASCII case-insensitive, exact length name comparison.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Descriptors of a file plus the bytes skipped between the terminator and the records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTable {
    pub fields: Vec<FieldDescriptor>,
    /// Container bytes, plus one if the file carries a stray terminator
    pub total_skip: usize,
}

/// Split the descriptor area into a field count and the final skip, detecting
/// the dBASE III stray terminator.
pub fn descriptor_layout(header_length: u16, skip_bytes: usize) -> DbfResult<(usize, usize)> {
    let minimum = HEADER_SIZE + skip_bytes + 1;
    let mut array_size = usize::from(header_length)
        .checked_sub(minimum)
        .ok_or(DbfError::HeaderTooShort {
            header_length,
            minimum,
        })?;
    let mut skip = skip_bytes;

    match array_size % FIELD_DESCRIPTOR_SIZE {
        0 => {}
        1 => {
            // Some dBASE III files include an extra terminator byte after the
            // field descriptor array
            warn!("Header length is one byte off; assuming a stray terminator byte");
            skip += 1;
            array_size -= 1;
        }
        _ => return Err(DbfError::FieldArraySize { size: array_size }),
    }

    Ok((array_size / FIELD_DESCRIPTOR_SIZE, skip))
}

/// Read the descriptor table. `reader` must be positioned right after the header.
pub fn parse_fields<R: Read + Seek>(
    reader: &mut R,
    header: &FileHeader,
    skip_bytes: usize,
) -> DbfResult<FieldTable> {
    let (field_count, total_skip) = descriptor_layout(header.header_length, skip_bytes)?;

    let mut fields = Vec::new();
    fields
        .try_reserve_exact(field_count)
        .map_err(|_| DbfError::Allocation {
            bytes: field_count * std::mem::size_of::<FieldDescriptor>(),
        })?;

    let mut byte_offset = 1;
    let mut descriptor = [0u8; FIELD_DESCRIPTOR_SIZE];
    for _ in 0..field_count {
        reader.read_exact(&mut descriptor)?;
        let field = FieldDescriptor::decode(&descriptor, byte_offset);
        byte_offset = field.end_offset();
        fields.push(field);
    }

    let mut terminator = [0u8; 1];
    reader.read_exact(&mut terminator)?;
    if terminator[0] != HEADER_TERMINATOR {
        return Err(DbfError::BadTerminator {
            found: terminator[0],
        });
    }

    // Skip the database container and any stray terminator
    let position = reader.seek(SeekFrom::Current(total_skip as i64))?;
    let expected = u64::from(header.header_length);
    if position != expected {
        return Err(DbfError::OffsetMismatch {
            expected,
            actual: position,
        });
    }

    debug!(
        "Parsed {} field descriptors, skipped {} bytes before records",
        fields.len(),
        total_skip
    );

    Ok(FieldTable { fields, total_skip })
}

/// Check that every field fits inside the declared record length.
pub fn validate_record_layout(fields: &[FieldDescriptor], record_length: u16) -> DbfResult<()> {
    if record_length == 0 {
        return Err(DbfError::InvalidRecordLength(record_length));
    }

    match fields
        .iter()
        .find(|field| field.end_offset() > usize::from(record_length))
    {
        Some(field) => Err(DbfError::FieldOutsideRecord {
            name: field.name.clone(),
            end: field.end_offset(),
            record_length,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) fn encode_descriptor(name: &str, field_type: u8, length: u8) -> [u8; FIELD_DESCRIPTOR_SIZE] {
    let mut bytes = [0u8; FIELD_DESCRIPTOR_SIZE];
    bytes[..name.len()].copy_from_slice(name.as_bytes());
    bytes[11] = field_type;
    bytes[16] = length;
    bytes
}
