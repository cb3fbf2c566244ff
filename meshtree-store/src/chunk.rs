use crate::error::{StoreError, StoreResult};
use crate::format::Compression;
use ruzstd::decoding::StreamingDecoder;
use ruzstd::encoding::{CompressionLevel, compress_to_vec};
use std::io::Read;

/// Rows of `row_bytes` each that fit in a chunk of roughly `chunk_bytes`.
pub fn rows_per_chunk(row_bytes: usize, chunk_bytes: usize) -> u64 {
    if row_bytes == 0 {
        return 1;
    }
    (chunk_bytes / row_bytes).max(1) as u64
}

pub fn encode(raw: &[u8], compression: Compression) -> Vec<u8> {
    match compression {
        Compression::None => raw.to_vec(),
        Compression::Zstd => compress_to_vec(raw, CompressionLevel::Fastest),
    }
}

pub fn decode(stored: &[u8], compression: Compression, raw_len: usize) -> StoreResult<Vec<u8>> {
    let raw = match compression {
        Compression::None => stored.to_vec(),
        Compression::Zstd => {
            let mut decoder = StreamingDecoder::new(stored)
                .map_err(|e| StoreError::Compression(e.to_string()))?;
            let mut raw = Vec::with_capacity(raw_len);
            decoder
                .read_to_end(&mut raw)
                .map_err(|e| StoreError::Compression(e.to_string()))?;
            raw
        }
    };
    if raw.len() != raw_len {
        return Err(StoreError::Compression(format!(
            "chunk decoded to {} bytes, expected {}",
            raw.len(),
            raw_len
        )));
    }
    Ok(raw)
}
