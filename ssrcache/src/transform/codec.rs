//! Brotli framing for stored artifacts.

use std::io::{Read, Write};

use super::TransformError;

/// Compression quality used for artifacts (brotli maximum).
pub const BROTLI_QUALITY: u32 = 11;

/// Window size exponent.
const BROTLI_LGWIN: u32 = 22;

const BUFFER_SIZE: usize = 4096;

/// Brotli-compresses `html`.
pub fn encode(html: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(html.len() / 4);
    {
        let mut writer =
            brotli::CompressorWriter::new(&mut out, BUFFER_SIZE, BROTLI_QUALITY, BROTLI_LGWIN);
        // Writes into a Vec cannot fail.
        let _ = writer.write_all(html.as_bytes());
        let _ = writer.flush();
    }
    out
}

/// Decodes a brotli stream into UTF-8 text.
pub fn decode(bytes: &[u8]) -> Result<String, TransformError> {
    let mut decoded = Vec::with_capacity(bytes.len() * 4);
    brotli::Decompressor::new(bytes, BUFFER_SIZE)
        .read_to_end(&mut decoded)
        .map_err(TransformError::Decode)?;
    Ok(String::from_utf8(decoded)?)
}
