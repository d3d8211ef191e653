//! In-memory DBF images for tests

use crate::models::fields::{HEADER_TERMINATOR, encode_descriptor};
use crate::models::header::{HEADER_SIZE, VISUAL_FOXPRO_CONTAINER_SIZE, VISUAL_FOXPRO_SIGNATURE, encode_header};

/// Builds the bytes of a DBF file record by record.
#[derive(Debug, Clone)]
pub struct DbfImage {
    signature: u8,
    fields: Vec<(String, u8, u8)>,
    records: Vec<Vec<u8>>,
    stray_terminator: bool,
    declared_count: Option<u32>,
    end_of_file_marker: bool,
}

impl DbfImage {
    pub fn new(signature: u8) -> Self {
        Self {
            signature,
            fields: Vec::new(),
            records: Vec::new(),
            stray_terminator: false,
            declared_count: None,
            end_of_file_marker: false,
        }
    }

    pub fn visual_foxpro() -> Self {
        Self::new(VISUAL_FOXPRO_SIGNATURE)
    }

    pub fn character(mut self, name: &str, length: u8) -> Self {
        self.fields.push((name.to_string(), b'C', length));
        self
    }

    pub fn numeric(mut self, name: &str, length: u8) -> Self {
        self.fields.push((name.to_string(), b'N', length));
        self
    }

    pub fn stray_terminator(mut self) -> Self {
        self.stray_terminator = true;
        self
    }

    /// Record count written to the header instead of the real one.
    pub fn declared_count(mut self, count: u32) -> Self {
        self.declared_count = Some(count);
        self
    }

    /// Append the 0x1A end-of-file byte written by most xBase tools.
    pub fn end_of_file_marker(mut self) -> Self {
        self.end_of_file_marker = true;
        self
    }

    pub fn record_length(&self) -> u16 {
        1 + self.fields.iter().map(|f| u16::from(f.2)).sum::<u16>()
    }

    /// Add a record; values are space padded (or cut) to their field length.
    pub fn record(mut self, deleted: bool, values: &[&[u8]]) -> Self {
        let mut record = vec![if deleted { b'*' } else { b' ' }];
        for (i, (_, _, length)) in self.fields.iter().enumerate() {
            let mut value = values.get(i).copied().unwrap_or(b"").to_vec();
            value.resize(usize::from(*length), b' ');
            record.extend_from_slice(&value);
        }
        self.records.push(record);
        self
    }

    /// Add a record from its exact bytes, deletion flag included.
    pub fn raw_record(mut self, record: Vec<u8>) -> Self {
        assert_eq!(record.len(), usize::from(self.record_length()));
        self.records.push(record);
        self
    }

    pub fn header_length(&self) -> u16 {
        let mut length = HEADER_SIZE + self.fields.len() * 32 + 1;
        if self.signature == VISUAL_FOXPRO_SIGNATURE {
            length += VISUAL_FOXPRO_CONTAINER_SIZE;
        }
        if self.stray_terminator {
            length += 1;
        }
        length as u16
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self
            .declared_count
            .unwrap_or(self.records.len() as u32);
        let mut bytes = encode_header(self.signature, count, self.header_length(), self.record_length()).to_vec();

        for (name, field_type, length) in &self.fields {
            bytes.extend_from_slice(&encode_descriptor(name, *field_type, *length));
        }
        bytes.push(HEADER_TERMINATOR);
        if self.stray_terminator {
            bytes.push(HEADER_TERMINATOR);
        }
        if self.signature == VISUAL_FOXPRO_SIGNATURE {
            bytes.extend_from_slice(&[0u8; VISUAL_FOXPRO_CONTAINER_SIZE]);
        }
        for record in &self.records {
            bytes.extend_from_slice(record);
        }
        if self.end_of_file_marker {
            bytes.push(0x1A);
        }
        bytes
    }
}
