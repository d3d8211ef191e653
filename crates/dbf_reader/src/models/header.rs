//! DBF file header decoding and dialect classification

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::codec::{FieldOrder, read_u16, read_u32};

/// Size of the fixed file header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Signature byte of Visual FoxPro tables that carry a database container block.
pub const VISUAL_FOXPRO_SIGNATURE: u8 = 0x30;

/// Size of the database container block following a Visual FoxPro header.
pub const VISUAL_FOXPRO_CONTAINER_SIZE: usize = 263;

/// dBase dates count years from 1900
pub const DBASE_DATE_BASE_YEAR: i32 = 1900;

/// Structural dialect of a DBF file, as far as the header layout is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// dBASE III/IV, FoxBase and FoxPro tables: descriptors follow the header directly.
    Standard,
    /// Visual FoxPro table with a 263-byte container block before the records.
    VisualFoxPro,
}

impl Dialect {
    pub fn from_signature(signature: u8) -> Self {
        if signature == VISUAL_FOXPRO_SIGNATURE {
            Dialect::VisualFoxPro
        } else {
            Dialect::Standard
        }
    }

    /// Number of container bytes between the descriptor table and the records.
    pub fn skip_bytes(self) -> usize {
        match self {
            Dialect::Standard => 0,
            Dialect::VisualFoxPro => VISUAL_FOXPRO_CONTAINER_SIZE,
        }
    }
}

/// The 32-byte DBF file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub signature: u8,
    /// Year (offset from 1900), month and day, exactly as stored
    pub last_modified: [u8; 3],
    pub record_count: u32,
    /// Byte offset of the first record
    pub header_length: u16,
    /// Width of one record, deletion flag included
    pub record_length: u16,
    pub incomplete: u8,
    pub encrypted: u8,
    pub mdx: u8,
    pub language: u8,
    pub reserved: [u8; 16],
}

impl FileHeader {
    /// Decode a header from its on-disk bytes. Never fails.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut reserved = [0u8; 16];
        reserved[..2].copy_from_slice(&bytes[12..14]);
        reserved[2..14].copy_from_slice(&bytes[16..28]);
        reserved[14..].copy_from_slice(&bytes[30..32]);

        Self {
            signature: bytes[0],
            last_modified: [bytes[1], bytes[2], bytes[3]],
            record_count: read_u32::<FieldOrder>(&bytes[4..8]),
            header_length: read_u16::<FieldOrder>(&bytes[8..10]),
            record_length: read_u16::<FieldOrder>(&bytes[10..12]),
            incomplete: bytes[14],
            encrypted: bytes[15],
            mdx: bytes[28],
            language: bytes[29],
            reserved,
        }
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from_signature(self.signature)
    }

    /// Container bytes to skip before the records, derived from the signature.
    pub fn skip_bytes(&self) -> usize {
        self.dialect().skip_bytes()
    }

    /// The last-modified date, if the stored bytes form a valid calendar date.
    pub fn last_modified_date(&self) -> Option<NaiveDate> {
        let [year, month, day] = self.last_modified;
        NaiveDate::from_ymd_opt(
            DBASE_DATE_BASE_YEAR + i32::from(year),
            u32::from(month),
            u32::from(day),
        )
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted != 0
    }
}

#[cfg(test)]
pub(crate) fn encode_header(
    signature: u8,
    record_count: u32,
    header_length: u16,
    record_length: u16,
) -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0] = signature;
    bytes[1..4].copy_from_slice(&[124, 10, 19]);
    bytes[4..8].copy_from_slice(&record_count.to_le_bytes());
    bytes[8..10].copy_from_slice(&header_length.to_le_bytes());
    bytes[10..12].copy_from_slice(&record_length.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_recovers_counts_and_lengths() {
        let cases = [
            (0x03, 0u32, 65u16, 1u16),
            (0x30, 2500, 296 + 32, 100),
            (0x83, 0x0102_0304, 0xA0B0, 0xFFFF),
            (0xF5, u32::MAX, u16::MAX, 21),
        ];

        for (signature, count, header_length, record_length) in cases {
            let header =
                FileHeader::decode(&encode_header(signature, count, header_length, record_length));
            assert_eq!(header.signature, signature);
            assert_eq!(header.record_count, count);
            assert_eq!(header.header_length, header_length);
            assert_eq!(header.record_length, record_length);
        }
    }

    #[test]
    fn test_decode_is_little_endian_byte_exact() {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[4..8].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        bytes[8..10].copy_from_slice(&[0x61, 0x01]);
        bytes[10..12].copy_from_slice(&[0x15, 0x00]);

        let header = FileHeader::decode(&bytes);
        assert_eq!(header.record_count, 0x0403_0201);
        assert_eq!(header.header_length, 0x0161);
        assert_eq!(header.record_length, 21);
    }

    #[test]
    fn test_flag_bytes() {
        let mut bytes = encode_header(0x03, 1, 65, 10);
        bytes[14] = 1;
        bytes[15] = 1;
        bytes[28] = 1;
        bytes[29] = 0x57;
        bytes[12] = 0xAA;
        bytes[31] = 0xBB;

        let header = FileHeader::decode(&bytes);
        assert_eq!(header.incomplete, 1);
        assert!(header.is_encrypted());
        assert_eq!(header.mdx, 1);
        assert_eq!(header.language, 0x57);
        assert_eq!(header.reserved[0], 0xAA);
        assert_eq!(header.reserved[15], 0xBB);
    }

    #[test]
    fn test_only_0x30_selects_container_skip() {
        assert_eq!(Dialect::from_signature(0x30), Dialect::VisualFoxPro);
        assert_eq!(Dialect::from_signature(0x30).skip_bytes(), 263);

        for signature in [0x02u8, 0x03, 0x31, 0x32, 0x83, 0x8B, 0xF5] {
            assert_eq!(Dialect::from_signature(signature), Dialect::Standard);
            assert_eq!(Dialect::from_signature(signature).skip_bytes(), 0);
        }
    }

    #[test]
    fn test_header_serializes() {
        let header = FileHeader::decode(&encode_header(0x30, 3, 328, 21));
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["signature"], 0x30);
        assert_eq!(json["record_count"], 3);
        assert_eq!(json["header_length"], 328);
        assert_eq!(json["record_length"], 21);
    }

    #[test]
    fn test_last_modified_date() {
        let header = FileHeader::decode(&encode_header(0x03, 0, 65, 1));
        assert_eq!(header.last_modified, [124, 10, 19]);
        assert_eq!(
            header.last_modified_date(),
            NaiveDate::from_ymd_opt(2024, 10, 19)
        );

        let mut bytes = encode_header(0x03, 0, 65, 1);
        bytes[2] = 13;
        assert_eq!(FileHeader::decode(&bytes).last_modified_date(), None);
    }
}
