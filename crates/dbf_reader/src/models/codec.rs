//! Fixed-width integer and float decoding in an explicit byte order
//!
//! DBF multi-byte values are little-endian on every platform. The byte order is
//! chosen per call site through a type parameter, never by the host.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order of multi-byte values stored in a DBF file.
pub type FieldOrder = LittleEndian;

/// A [`ByteOrder`] that knows whether it is little-endian.
pub trait OrderKind: ByteOrder {
    const IS_LITTLE: bool;

    /// True when this order matches the host's native order.
    fn is_native() -> bool {
        Self::IS_LITTLE == cfg!(target_endian = "little")
    }
}

impl OrderKind for LittleEndian {
    const IS_LITTLE: bool = true;
}

impl OrderKind for BigEndian {
    const IS_LITTLE: bool = false;
}

/// Byte reversal of a fixed-width value.
pub trait Swap: Copy {
    fn swapped(self) -> Self;
}

macro_rules! impl_swap {
    ($($t:ty),*) => {
        $(impl Swap for $t {
            fn swapped(self) -> Self {
                self.swap_bytes()
            }
        })*
    };
}

impl_swap!(i16, u16, i32, u32, i64, u64);

impl Swap for f64 {
    fn swapped(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

/// Reinterpret a value that was loaded in host order but stored in order `B`.
pub fn reorder<B: OrderKind, T: Swap>(value: T) -> T {
    if B::is_native() { value } else { value.swapped() }
}

pub fn read_i16<B: ByteOrder>(buf: &[u8]) -> i16 {
    debug_assert_eq!(buf.len(), 2);
    B::read_i16(buf)
}

pub fn read_u16<B: ByteOrder>(buf: &[u8]) -> u16 {
    debug_assert_eq!(buf.len(), 2);
    B::read_u16(buf)
}

pub fn read_i32<B: ByteOrder>(buf: &[u8]) -> i32 {
    debug_assert_eq!(buf.len(), 4);
    B::read_i32(buf)
}

pub fn read_u32<B: ByteOrder>(buf: &[u8]) -> u32 {
    debug_assert_eq!(buf.len(), 4);
    B::read_u32(buf)
}

pub fn read_i64<B: ByteOrder>(buf: &[u8]) -> i64 {
    debug_assert_eq!(buf.len(), 8);
    B::read_i64(buf)
}

pub fn read_u64<B: ByteOrder>(buf: &[u8]) -> u64 {
    debug_assert_eq!(buf.len(), 8);
    B::read_u64(buf)
}

/// IEEE-754 double stored in order `B`.
pub fn read_f64<B: ByteOrder>(buf: &[u8]) -> f64 {
    debug_assert_eq!(buf.len(), 8);
    B::read_f64(buf)
}
