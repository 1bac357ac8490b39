//! Little-endian primitive writers for the binary STL wire format.
//!
//! Every value goes through shifts and masks on its bit pattern, so the bytes
//! on the wire do not depend on the host byte order.

use std::io::{self, Write};

/// Size of the free-form header.
pub const HEADER_LEN: usize = 80;

/// Size of the header plus the triangle count.
pub const PREAMBLE_LEN: usize = HEADER_LEN + 4;

/// Size of one triangle record: 12 floats and a 16-bit attribute word.
pub const RECORD_LEN: usize = 50;

/// Encode a `u32` low byte first.
pub fn encode_u32(value: u32) -> [u8; 4] {
    [
        (value & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        ((value >> 16) & 0xff) as u8,
        ((value >> 24) & 0xff) as u8,
    ]
}

/// Encode a value as an IEEE-754 single, low byte first.
pub fn encode_f32(value: f64) -> [u8; 4] {
    encode_u32((value as f32).to_bits())
}

/// Write a `u32` as 4 little-endian bytes.
pub fn write_u32<W: Write + ?Sized>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&encode_u32(value))
}

/// Narrow to `f32` and write 4 little-endian bytes.
pub fn write_f32<W: Write + ?Sized>(out: &mut W, value: f64) -> io::Result<()> {
    out.write_all(&encode_f32(value))
}

/// Write a `u16` as 2 little-endian bytes.
pub fn write_u16<W: Write + ?Sized>(out: &mut W, value: u16) -> io::Result<()> {
    out.write_all(&[(value & 0xff) as u8, ((value >> 8) & 0xff) as u8])
}

/// Total byte length of a binary STL holding `triangles` records.
pub fn stl_len(triangles: u32) -> u64 {
    PREAMBLE_LEN as u64 + RECORD_LEN as u64 * u64::from(triangles)
}
