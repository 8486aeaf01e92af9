use tracing::debug;

use crate::error::PppError;

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// pHYs unit specifier: pixels per metre.
const UNIT_METRE: u8 = 1;

/// Largest pixels-per-metre value a PNG four-byte integer may hold (2^31 - 1).
pub(crate) const MAX_PIXELS_PER_METRE: u32 = i32::MAX as u32;

/// Declare the physical pixel density of a PNG stream.
///
/// Inserts a `pHYs` chunk (pixels per metre on both axes) directly before the
/// first `IDAT` chunk, dropping any `pHYs` chunk already present. Pixel data is
/// copied through untouched.
///
/// Fails with [`PppError::FormatError`] if the data is not a PNG stream, a
/// chunk runs past the end of the data, or no `IDAT` chunk is found. A
/// resolution that rounds to zero or above 2^31 - 1 pixels per metre is a
/// [`PppError::ConfigError`].
pub fn set_png_resolution(data: &[u8], resolution_ppmm: f64) -> Result<Vec<u8>, PppError> {
    if !resolution_ppmm.is_finite() || resolution_ppmm <= 0.0 {
        return Err(PppError::ConfigError(format!(
            "resolution must be a positive number, got {resolution_ppmm}"
        )));
    }
    let pixels_per_metre = (resolution_ppmm * 1000.0).round();
    if !(1.0..=f64::from(MAX_PIXELS_PER_METRE)).contains(&pixels_per_metre) {
        return Err(PppError::ConfigError(format!(
            "resolution of {resolution_ppmm} px/mm is outside the PNG pHYs range"
        )));
    }
    let pixels_per_metre = pixels_per_metre as u32;
    if data.len() < PNG_SIGNATURE.len() || &data[..PNG_SIGNATURE.len()] != PNG_SIGNATURE {
        return Err(PppError::FormatError("missing PNG signature".into()));
    }

    let phys = phys_chunk(pixels_per_metre);

    let mut result = Vec::with_capacity(data.len() + phys.len());
    result.extend_from_slice(PNG_SIGNATURE);

    let mut offset = PNG_SIGNATURE.len();
    while offset + 8 <= data.len() {
        let chunk_len = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        let chunk_type = &data[offset + 4..offset + 8];
        // length + type + payload + CRC
        let chunk_end = offset + 12 + chunk_len;
        if chunk_end > data.len() {
            return Err(PppError::FormatError(format!(
                "chunk {} at offset {offset} is truncated",
                String::from_utf8_lossy(chunk_type)
            )));
        }

        match chunk_type {
            b"IDAT" => {
                result.extend_from_slice(&phys);
                result.extend_from_slice(&data[offset..]);
                debug!(pixels_per_metre, offset, "inserted pHYs chunk");
                return Ok(result);
            }
            b"pHYs" => {}
            _ => result.extend_from_slice(&data[offset..chunk_end]),
        }

        offset = chunk_end;
    }

    Err(PppError::FormatError("no IDAT chunk found".into()))
}

/// Serialize a complete `pHYs` chunk: length, type, payload and CRC.
fn phys_chunk(pixels_per_metre: u32) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(21);
    chunk.extend_from_slice(&9u32.to_be_bytes());
    chunk.extend_from_slice(b"pHYs");
    chunk.extend_from_slice(&pixels_per_metre.to_be_bytes());
    chunk.extend_from_slice(&pixels_per_metre.to_be_bytes());
    chunk.push(UNIT_METRE);

    let crc = crc32fast::hash(&chunk[4..]);
    chunk.extend_from_slice(&crc.to_be_bytes());
    chunk
}
