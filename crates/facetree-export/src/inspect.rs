//! Reading back a binary STL produced by the exporter.

use facetree_core::ExportError;

use crate::binary::{HEADER_LEN, PREAMBLE_LEN, RECORD_LEN};

/// One decoded triangle record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StlTriangle {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
    pub attribute: u16,
}

/// The decoded contents of a binary STL.
#[derive(Debug, Clone, PartialEq)]
pub struct StlSummary {
    pub header: [u8; HEADER_LEN],
    /// Triangle count declared after the header.
    pub count: u32,
    pub triangles: Vec<StlTriangle>,
}

impl StlSummary {
    /// Decode `data`, requiring exactly `84 + 50 * count` bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ExportError> {
        if data.len() < PREAMBLE_LEN {
            return Err(invalid(format!(
                "{} bytes is too small for header and triangle count",
                data.len()
            )));
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&data[..HEADER_LEN]);
        let count = read_u32(data, HEADER_LEN);

        let expected = PREAMBLE_LEN as u64 + RECORD_LEN as u64 * u64::from(count);
        if data.len() as u64 != expected {
            return Err(invalid(format!(
                "expected {expected} bytes for {count} triangles, got {}",
                data.len()
            )));
        }

        let triangles = data[PREAMBLE_LEN..]
            .chunks_exact(RECORD_LEN)
            .map(read_triangle)
            .collect();

        Ok(Self {
            header,
            count,
            triangles,
        })
    }

    /// Header text up to the first zero byte.
    pub fn header_text(&self) -> String {
        let end = self.header.iter().position(|&b| b == 0).unwrap_or(HEADER_LEN);
        String::from_utf8_lossy(&self.header[..end]).into_owned()
    }
}

fn invalid(reason: String) -> ExportError {
    ExportError::InvalidStl { reason }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from(data[offset])
        | u32::from(data[offset + 1]) << 8
        | u32::from(data[offset + 2]) << 16
        | u32::from(data[offset + 3]) << 24
}

fn read_vec3(record: &[u8], offset: usize) -> [f32; 3] {
    [
        f32::from_bits(read_u32(record, offset)),
        f32::from_bits(read_u32(record, offset + 4)),
        f32::from_bits(read_u32(record, offset + 8)),
    ]
}

fn read_triangle(record: &[u8]) -> StlTriangle {
    StlTriangle {
        normal: read_vec3(record, 0),
        vertices: [read_vec3(record, 12), read_vec3(record, 24), read_vec3(record, 36)],
        attribute: u16::from(record[48]) | u16::from(record[49]) << 8,
    }
}
