//! Single-shot Brotli wrapper: quality 11, window bits 24, generic mode.
//! Used for every non-`.br` `Content` payload; `.br` files are stored
//! verbatim and never pass through here.

use crate::ArchiverError;
use brotli::enc::BrotliEncoderParams;
use brotli::{CompressorWriter, Decompressor};
use std::io::{Read, Write};

const QUALITY: i32 = 11;
const LGWIN: i32 = 24;
const BUFFER_SIZE: usize = 4096;

/// Compresses `data` in one shot with the archive's fixed Brotli settings.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, ArchiverError> {
    let params = BrotliEncoderParams {
        quality: QUALITY,
        lgwin: LGWIN,
        ..Default::default()
    };
    let mut out = Vec::with_capacity(data.len() / 2 + 64);
    {
        let mut writer = CompressorWriter::with_params(&mut out, BUFFER_SIZE, &params);
        writer
            .write_all(data)
            .map_err(|e| ArchiverError::Decompression(format!("brotli encode failed: {e}")))?;
        writer
            .flush()
            .map_err(|e| ArchiverError::Decompression(format!("brotli encode flush failed: {e}")))?;
    }
    Ok(out)
}

/// Decompresses a single Brotli frame produced by `compress`.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, ArchiverError> {
    let mut decoder = Decompressor::new(data, BUFFER_SIZE);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ArchiverError::Decompression(format!("brotli decode failed: {e}")))?;
    Ok(out)
}
